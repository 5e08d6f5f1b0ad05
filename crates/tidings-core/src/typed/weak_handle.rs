//! WeakHandle - 購読者を延命しない handler 参照
//!
//! # 生存判定
//! - 非 static（メソッド）: 束縛インスタンスと owner の両方が解決できれば生存
//! - static + owner なし: マークされるまで常に生存
//! - static + owner あり: owner が解決できれば生存
//!
//! `mark_dead()` で全ての参照を捨てると、以後は永久に死亡状態になり
//! `invoke()` は何もしません。

use std::any::{Any, TypeId};
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::{HandlerError, InvalidHandlerError, MethodId, NotificationType};

use super::handler::{ErasedInvoker, Handler, WeakInstance};

/// 生存中だけ保持する参照
struct Refs {
    owner: Option<WeakInstance>,
    target: Option<WeakInstance>,
    invoker: Arc<ErasedInvoker>,
}

impl Refs {
    fn is_alive(&self, is_static: bool) -> bool {
        let owner_alive = self
            .owner
            .as_ref()
            .is_none_or(|owner| owner.strong_count() > 0);
        if is_static {
            return owner_alive;
        }
        let target_alive = self
            .target
            .as_ref()
            .is_some_and(|target| target.strong_count() > 0);
        owner_alive && target_alive
    }
}

/// `WeakHandle::detach` が取り外した参照
#[must_use]
pub(crate) struct Detached(Option<Refs>);

impl Detached {
    /// 既に死亡状態だった
    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Non-owning reference to a handler and the instance it is bound to.
pub struct WeakHandle {
    notification: NotificationType,
    method: MethodId,
    is_static: bool,
    refs: RwLock<Option<Refs>>,
}

impl WeakHandle {
    /// `owner` の寿命に従う handle を作る
    ///
    /// メソッド handler で `owner` が省略された場合は、束縛インスタンスを owner とします。
    pub fn new<N: ?Sized + 'static>(
        owner: Option<WeakInstance>,
        handler: Option<Handler<N>>,
    ) -> Result<Self, InvalidHandlerError> {
        let notification = NotificationType::of::<N>();
        let Some(handler) = handler else {
            return Err(InvalidHandlerError { notification });
        };

        let is_static = handler.is_static();
        let owner = match owner {
            Some(owner) => Some(owner),
            None if !is_static => handler.target.clone(),
            None => None,
        };

        Ok(Self {
            notification,
            method: handler.method,
            is_static,
            refs: RwLock::new(Some(Refs {
                owner,
                target: handler.target,
                invoker: handler.invoker,
            })),
        })
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification
    }

    pub fn method_id(&self) -> MethodId {
        self.method
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_alive(&self) -> bool {
        self.read(|refs| refs.is_alive(self.is_static))
            .unwrap_or(false)
    }

    pub fn is_marked(&self) -> bool {
        self.read(|_| ()).is_none()
    }

    /// 生存中の owner を返す（static かつ owner なしの場合は None）
    pub fn owner(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.read(|refs| refs.owner.as_ref().and_then(|owner| owner.upgrade()))
            .flatten()
    }

    /// owner の具象型が `target` と一致するか
    pub fn owner_is(&self, target: TypeId) -> bool {
        self.owner().is_some_and(|owner| (*owner).type_id() == target)
    }

    /// owner が `subscriber` と同一インスタンスか（アドレス比較）
    ///
    /// owner を upgrade しないので、partition のロック中に呼んでも
    /// owner の `Drop` が走ることはありません。
    pub fn is_owned_by(&self, subscriber: *const ()) -> bool {
        self.read(|refs| {
            refs.owner.as_ref().is_some_and(|owner| {
                owner.strong_count() > 0 && owner.as_ptr() as *const () == subscriber
            })
        })
        .unwrap_or(false)
    }

    /// 型消去されたペイロードで handler を呼ぶ
    ///
    /// 死んでいる handle への配送はエラーではなく `Ok(false)` です。
    /// invoker はロックの外で実行するので、handler 内から同じ handle を
    /// `mark_dead()` してもデッドロックしません。
    pub fn invoke(&self, payload: &dyn Any) -> Result<bool, HandlerError> {
        let invoker = self
            .read(|refs| refs.is_alive(self.is_static).then(|| Arc::clone(&refs.invoker)))
            .flatten();
        match invoker {
            Some(invoker) => invoker(payload),
            None => Ok(false),
        }
    }

    /// 全ての参照を捨てる（冪等）
    pub fn mark_dead(&self) {
        drop(self.detach());
    }

    /// 死亡状態にして、取り外した参照を返す
    ///
    /// handler のキャプチャは返り値が drop されるまで生きています。
    /// 呼び出し側のロックを外してから drop すること。
    pub(crate) fn detach(&self) -> Detached {
        let mut refs = self.refs.write().unwrap_or_else(PoisonError::into_inner);
        Detached(refs.take())
    }

    fn read<T>(&self, f: impl FnOnce(&Refs) -> T) -> Option<T> {
        let refs = self.refs.read().unwrap_or_else(PoisonError::into_inner);
        refs.as_ref().map(f)
    }
}

impl std::fmt::Debug for WeakHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakHandle")
            .field("notification", &self.notification)
            .field("method", &self.method)
            .field("is_static", &self.is_static)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Listener {
        hits: AtomicUsize,
    }

    impl Listener {
        fn on_value(&self, _value: &i32) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Lifetime;

    fn erase<S: Any + Send + Sync>(instance: &Arc<S>) -> WeakInstance {
        let weak = Arc::downgrade(instance);
        let weak: WeakInstance = weak;
        weak
    }

    fn method_handle(listener: &Arc<Listener>) -> WeakHandle {
        WeakHandle::new(None, Some(Handler::<i32>::method(listener, Listener::on_value))).unwrap()
    }

    #[test]
    fn missing_handler_is_rejected() {
        let err = WeakHandle::new::<i32>(None, None).unwrap_err();
        assert_eq!(err.notification, NotificationType::of::<i32>());
    }

    #[test]
    fn method_handle_follows_instance_lifetime() {
        let listener = Arc::new(Listener::default());
        let handle = method_handle(&listener);

        assert!(handle.is_alive());
        assert!(handle.invoke(&Arc::new(1_i32)).unwrap());
        assert_eq!(listener.hits.load(Ordering::SeqCst), 1);

        drop(listener);
        assert!(!handle.is_alive());
        assert!(!handle.invoke(&Arc::new(1_i32)).unwrap());
    }

    #[test]
    fn handle_does_not_keep_subscriber_alive() {
        let listener = Arc::new(Listener::default());
        let _handle = method_handle(&listener);

        assert_eq!(Arc::strong_count(&listener), 1);
    }

    #[test]
    fn static_handle_without_owner_is_always_alive() {
        let handle =
            WeakHandle::new(None, Some(Handler::<i32>::function(|_value: &i32| {}))).unwrap();

        assert!(handle.is_static());
        assert!(handle.is_alive());
        assert!(handle.owner().is_none());
    }

    #[test]
    fn static_handle_follows_owner() {
        let owner = Arc::new(Lifetime);
        let handle = WeakHandle::new(
            Some(erase(&owner)),
            Some(Handler::<i32>::function(|_value: &i32| {})),
        )
        .unwrap();

        assert!(handle.is_alive());
        assert!(handle.owner_is(TypeId::of::<Lifetime>()));

        drop(owner);
        assert!(!handle.is_alive());
    }

    #[test]
    fn method_handle_requires_owner_and_instance() {
        let owner = Arc::new(Lifetime);
        let listener = Arc::new(Listener::default());
        let handle = WeakHandle::new(
            Some(erase(&owner)),
            Some(Handler::<i32>::method(&listener, Listener::on_value)),
        )
        .unwrap();
        assert!(handle.is_alive());

        drop(owner);
        assert!(!handle.is_alive());
        assert!(!handle.invoke(&Arc::new(1_i32)).unwrap());
        assert_eq!(listener.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mark_dead_is_permanent_and_idempotent() {
        let listener = Arc::new(Listener::default());
        let handle = method_handle(&listener);

        handle.mark_dead();
        handle.mark_dead();

        assert!(handle.is_marked());
        assert!(!handle.is_alive());
        assert!(!handle.invoke(&Arc::new(1_i32)).unwrap());
        assert!(!handle.is_owned_by(Arc::as_ptr(&listener) as *const ()));
        assert_eq!(listener.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detach_hands_back_captures() {
        let capture = Arc::new(());
        let held = Arc::clone(&capture);
        let handle = WeakHandle::new(
            None,
            Some(Handler::<i32>::function(move |_value: &i32| {
                let _ = &held;
            })),
        )
        .unwrap();

        let detached = handle.detach();
        assert!(!detached.is_empty());
        assert!(handle.is_marked());
        assert_eq!(Arc::strong_count(&capture), 2);

        drop(detached);
        assert_eq!(Arc::strong_count(&capture), 1);
        assert!(handle.detach().is_empty());
    }

    #[test]
    fn ownership_compares_instances() {
        let listener = Arc::new(Listener::default());
        let other = Arc::new(Listener::default());
        let handle = method_handle(&listener);

        assert!(handle.is_owned_by(Arc::as_ptr(&listener) as *const ()));
        assert!(!handle.is_owned_by(Arc::as_ptr(&other) as *const ()));
        assert!(handle.owner_is(TypeId::of::<Listener>()));
    }
}
