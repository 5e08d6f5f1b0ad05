//! App - アプリケーション層
//!
//! index と ports を組み合わせて Aggregator を実装します。
//!
//! # 主要コンポーネント
//! - **Aggregator**: subscribe / unsubscribe / cleanup（`aggregator.rs`）と publish（`publish.rs`）
//! - **AggregatorBuilder**: 名前とスケジューラのワイヤリング
//! - **Subscription**: subscribe 要求の組み立て
//! - **default**: プロセス全体で共有する既定インスタンス

pub mod aggregator;
pub mod builder;
pub mod default;
mod publish;
pub mod subscription;

// 主要な型を再エクスポート
pub use self::aggregator::Aggregator;
pub use self::builder::AggregatorBuilder;
pub use self::default::{default_aggregator, override_default, reset_default};
pub use self::subscription::Subscription;
