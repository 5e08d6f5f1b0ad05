//! Typed - 型付き handler API と型消去された呼び出し口
//!
//! # 二層構造
//! - **表層（Typed）**: `Notification` trait, `Handler<N>`: 型安全
//! - **内部（Dyn）**: `WeakHandle`: `invoke(&dyn Any)` だけを公開する

pub mod handler;
pub mod notification;
pub mod weak_handle;

pub use self::handler::{ErasedInvoker, Handler, HandlerResult, WeakInstance};
pub use self::notification::{ErasedView, Notification};
pub use self::weak_handle::WeakHandle;
