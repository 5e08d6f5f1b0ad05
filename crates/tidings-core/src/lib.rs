//! tidings-core
//!
//! プロセス内の publish/subscribe registry です。
//! 購読者は弱参照でしか保持しないので、購読したまま破棄しても
//! 配送対象から外れ、次の cleanup でリストから消えます。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（NotificationType, MethodId, Token, SubscriptionId, errors, stats）
//! - **typed**: 型付き handler API（Notification trait, Handler, WeakHandle）
//! - **index**: exact / polymorphic の二つの partition
//! - **ports**: 抽象化レイヤー（IdleScheduler）
//! - **impls**: 実装（InlineScheduler, ManualScheduler, TokioIdleScheduler）
//! - **app**: Aggregator 本体（builder, subscribe, publish, cleanup, 既定インスタンス）
//!
//! # 使用例
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use tidings_core::{Aggregator, InlineScheduler, PartitionKind, NotificationType};
//!
//! #[derive(Default)]
//! struct Ledger {
//!     balance: AtomicI64,
//! }
//!
//! impl Ledger {
//!     fn on_deposit(&self, amount: &i64) {
//!         self.balance.fetch_add(*amount, Ordering::SeqCst);
//!     }
//! }
//!
//! let bus = Aggregator::builder()
//!     .scheduler(Arc::new(InlineScheduler::new()))
//!     .build();
//! let ledger = Arc::new(Ledger::default());
//! bus.subscribe_method(&ledger, Ledger::on_deposit)?;
//!
//! assert_eq!(bus.publish(42_i64)?, 1);
//! assert_eq!(ledger.balance.load(Ordering::SeqCst), 42);
//!
//! drop(ledger);
//! assert_eq!(bus.publish(43_i64)?, 0);
//! assert_eq!(bus.subscription_count(PartitionKind::Exact, NotificationType::of::<i64>()), 0);
//! # Ok::<(), tidings_core::BusError>(())
//! ```

pub mod app;
pub mod domain;
pub mod impls;
pub mod index;
pub mod ports;
pub mod typed;

pub use app::{
    Aggregator, AggregatorBuilder, Subscription, default_aggregator, override_default,
    reset_default,
};
pub use domain::{
    BoxError, BusError, BusStats, HandlerError, InvalidHandlerError, MethodId, NotificationType,
    SubscriptionId, Token,
};
pub use impls::{InlineScheduler, ManualScheduler, TokioIdleScheduler};
pub use index::{PartitionKind, Sweep};
pub use ports::{IdleScheduler, IdleTask};
pub use typed::{Handler, HandlerResult, Notification, WeakHandle};
