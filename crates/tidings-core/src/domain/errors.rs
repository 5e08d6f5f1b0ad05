//! Errors - エラー型
//!
//! # 分類
//! - `InvalidHandlerError`: subscribe 時に handler が未設定（呼び出し側のバグ）
//! - `HandlerError`: handler 自身が返したエラー
//! - `BusError`: 公開 API が返すエラーの総称
//!
//! 購読者の消滅・型不一致・トークン不一致・購読者ゼロはエラーではありません。
//! 弱参照ベースのバスでは定常的に起こるため、配送をスキップするだけです。

use thiserror::Error;

use super::type_key::{MethodId, NotificationType};

/// Boxed error accepted from handler bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// handler が設定されていない subscribe 要求
#[derive(Debug, Clone, Error)]
#[error("no handler was supplied for notification type {notification}")]
pub struct InvalidHandlerError {
    pub notification: NotificationType,
}

/// handler の実行中に発生したエラー
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HandlerError(#[from] BoxError);

impl HandlerError {
    pub fn new<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self(error.into())
    }

    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    InvalidHandler(#[from] InvalidHandlerError),

    /// handler が失敗したため、同じ publish の残りの配送は中断された
    #[error("handler {method} failed while handling {notification}")]
    Handler {
        notification: NotificationType,
        method: MethodId,
        #[source]
        source: HandlerError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn invalid_handler_names_the_notification() {
        let err = BusError::from(InvalidHandlerError {
            notification: NotificationType::of::<u8>(),
        });
        assert!(err.to_string().contains("u8"));
    }

    #[test]
    fn handler_error_keeps_its_source() {
        let err = BusError::Handler {
            notification: NotificationType::of::<u8>(),
            method: MethodId::of::<fn(&u8)>(),
            source: HandlerError::new("disk full"),
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk full"));
    }
}
