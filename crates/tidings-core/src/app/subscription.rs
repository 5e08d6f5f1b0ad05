//! Subscription - subscribe 要求の組み立て
//!
//! # 使用例
//! ```
//! use std::sync::Arc;
//! use tidings_core::{Aggregator, Subscription};
//!
//! struct Dashboard;
//!
//! impl Dashboard {
//!     fn on_reading(&self, _celsius: &f64) {}
//! }
//!
//! let bus = Aggregator::new();
//! let dashboard = Arc::new(Dashboard);
//!
//! bus.subscribe(
//!     Subscription::<f64>::new()
//!         .method(&dashboard, Dashboard::on_reading)
//!         .token("greenhouse"),
//! )?;
//! # Ok::<(), tidings_core::BusError>(())
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::domain::Token;
use crate::index::PartitionKind;
use crate::typed::{Handler, HandlerResult, WeakInstance};

/// Subscription は subscribe の引数をまとめたもの
///
/// handler を設定せずに subscribe すると `InvalidHandlerError` になります。
pub struct Subscription<N: ?Sized> {
    pub(crate) owner: Option<WeakInstance>,
    pub(crate) handler: Option<Handler<N>>,
    pub(crate) token: Option<Token>,
    pub(crate) accept_subtypes: bool,
}

impl<N: ?Sized + 'static> Subscription<N> {
    pub fn new() -> Self {
        Self {
            owner: None,
            handler: None,
            token: None,
            accept_subtypes: false,
        }
    }

    /// 寿命を管理する owner（`unsubscribe(&owner)` の照合にも使う）
    pub fn owner<O: Any + Send + Sync>(mut self, owner: &Arc<O>) -> Self {
        let weak = Arc::downgrade(owner);
        let weak: WeakInstance = weak;
        self.owner = Some(weak);
        self
    }

    /// `target` のメソッドを handler にする（owner 未設定なら `target` が owner）
    pub fn method<S, F, R>(mut self, target: &Arc<S>, method: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&S, &N) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.handler = Some(Handler::method(target, method));
        self
    }

    /// インスタンスを持たない関数を handler にする
    pub fn function<F, R>(mut self, function: F) -> Self
    where
        F: Fn(&N) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.handler = Some(Handler::function(function));
        self
    }

    pub fn handler(mut self, handler: Handler<N>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn token(mut self, token: impl Into<Token>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// `N` をカテゴリとして宣言した通知も受け取る
    pub fn accept_subtypes(mut self) -> Self {
        self.accept_subtypes = true;
        self
    }

    pub fn partition(&self) -> PartitionKind {
        PartitionKind::for_subtypes(self.accept_subtypes)
    }
}

impl<N: ?Sized + 'static> Default for Subscription<N> {
    fn default() -> Self {
        Self::new()
    }
}
