//! Handler - 通知を受け取る関数の定義
//!
//! # 二層構造
//! - **表層（Typed）**: `Handler<N>`: `Fn(&S, &N)` / `Fn(&N)` を型付きで受け取る
//! - **内部（Dyn）**: `ErasedInvoker`: `&dyn Any` を受け取る型消去された呼び出し口
//!
//! registry の配送ループは `ErasedInvoker` しか知りません。
//! ペイロードは常に `Arc<N>` として渡され、invoker 側で downcast します。

use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::domain::{BoxError, HandlerError, MethodId, NotificationType};

/// 型消去された呼び出し口
///
/// - `Ok(true)`: handler を実行した
/// - `Ok(false)`: 何もしなかった（対象インスタンスが消えた、ペイロードの型が違う）
/// - `Err(_)`: handler 自身がエラーを返した
pub type ErasedInvoker = dyn Fn(&dyn Any) -> Result<bool, HandlerError> + Send + Sync;

/// Weak reference to any subscriber instance.
pub type WeakInstance = Weak<dyn Any + Send + Sync>;

/// handler の戻り値として使える型
///
/// `()` と `Result<(), E>` を受け付けるので、
/// 失敗しない handler は何も返さずに書けます。
pub trait HandlerResult {
    fn into_result(self) -> Result<(), HandlerError>;
}

impl HandlerResult for () {
    fn into_result(self) -> Result<(), HandlerError> {
        Ok(())
    }
}

impl<E> HandlerResult for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_result(self) -> Result<(), HandlerError> {
        self.map_err(HandlerError::new)
    }
}

/// Handler はどのインスタンスのどの関数を呼ぶかを表す
///
/// - `Handler::method`: インスタンスに束縛されたメソッド（非 static）
/// - `Handler::function`: インスタンスを持たない関数（static）
///
/// どちらも購読者を強参照しません。
pub struct Handler<N: ?Sized> {
    pub(crate) target: Option<WeakInstance>,
    pub(crate) method: MethodId,
    pub(crate) invoker: Arc<ErasedInvoker>,
    _marker: PhantomData<fn(&N)>,
}

impl<N: ?Sized + 'static> Handler<N> {
    /// `target` に束縛されたメソッドを handler にする
    ///
    /// # 使用例
    /// ```
    /// use std::sync::Arc;
    /// use tidings_core::Handler;
    ///
    /// struct Listener;
    ///
    /// impl Listener {
    ///     fn on_tick(&self, _tick: &u64) {}
    /// }
    ///
    /// let listener = Arc::new(Listener);
    /// let handler = Handler::<u64>::method(&listener, Listener::on_tick);
    /// assert!(!handler.is_static());
    /// ```
    pub fn method<S, F, R>(target: &Arc<S>, method: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&S, &N) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        let method_id = MethodId::of::<F>();
        let instance = Arc::downgrade(target);
        let erased: WeakInstance = instance.clone();

        let invoker = move |payload: &dyn Any| -> Result<bool, HandlerError> {
            let Some(view) = payload.downcast_ref::<Arc<N>>() else {
                return Ok(false);
            };
            let Some(instance) = instance.upgrade() else {
                return Ok(false);
            };
            method(&*instance, &**view).into_result()?;
            Ok(true)
        };

        Self {
            target: Some(erased),
            method: method_id,
            invoker: Arc::new(invoker),
            _marker: PhantomData,
        }
    }

    /// インスタンスを持たない関数を handler にする
    pub fn function<F, R>(function: F) -> Self
    where
        F: Fn(&N) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        let method_id = MethodId::of::<F>();

        let invoker = move |payload: &dyn Any| -> Result<bool, HandlerError> {
            let Some(view) = payload.downcast_ref::<Arc<N>>() else {
                return Ok(false);
            };
            function(&**view).into_result()?;
            Ok(true)
        };

        Self {
            target: None,
            method: method_id,
            invoker: Arc::new(invoker),
            _marker: PhantomData,
        }
    }

    pub fn is_static(&self) -> bool {
        self.target.is_none()
    }

    pub fn method_id(&self) -> MethodId {
        self.method
    }

    pub fn notification_type(&self) -> NotificationType {
        NotificationType::of::<N>()
    }
}
