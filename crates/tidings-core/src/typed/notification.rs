//! Notification trait - publish できる型と、その上位カテゴリ
//!
//! Rust にはクラス継承がないため、「サブタイプも受け取る」購読は
//! カテゴリ（`dyn Alert` のような trait object 型）で表現します。
//! 通知型は自分が満たすカテゴリを宣言し、`Arc<Self>` を
//! `Arc<dyn Category>` にアップキャストする方法を提供します。
//!
//! # 使用例
//! ```
//! use tidings_core::notification;
//!
//! trait Alert {
//!     fn severity(&self) -> u8;
//! }
//!
//! struct DiskFull;
//!
//! impl Alert for DiskFull {
//!     fn severity(&self) -> u8 {
//!         9
//!     }
//! }
//!
//! notification!(DiskFull: dyn Alert);
//! ```

use std::any::{Any, TypeId};
use std::sync::Arc;

/// Type-erased view handed to a handle: always an `Arc<K>` for the key `K`.
pub type ErasedView = Box<dyn Any>;

/// Notification は publish 可能な型
///
/// - `is_category`: 宣言済みカテゴリかどうか（ロック中に呼ばれるので軽量であること）
/// - `upcast`: `Arc<Self>` をカテゴリの `Arc<K>` に変換して型消去する
///
/// 型そのものとの一致は registry 側で判定するので、
/// カテゴリを持たない型は空の impl で十分です。
pub trait Notification: Any {
    fn is_category(category: TypeId) -> bool
    where
        Self: Sized,
    {
        let _ = category;
        false
    }

    fn upcast(self: Arc<Self>, category: TypeId) -> Option<ErasedView>
    where
        Self: Sized,
    {
        let _ = category;
        None
    }
}

/// 通知型に `Notification` を実装する
///
/// - `notification!(Foo)`: カテゴリなし
/// - `notification!(Foo: dyn Alert, dyn Audit)`: `Foo` はそれぞれの trait を実装していること
#[macro_export]
macro_rules! notification {
    ($ty:ty) => {
        impl $crate::Notification for $ty {}
    };
    ($ty:ty : $($category:ty),+ $(,)?) => {
        impl $crate::Notification for $ty {
            fn is_category(category: ::std::any::TypeId) -> bool {
                $( category == ::std::any::TypeId::of::<$category>() )||+
            }

            fn upcast(
                self: ::std::sync::Arc<Self>,
                category: ::std::any::TypeId,
            ) -> ::std::option::Option<$crate::typed::ErasedView> {
                $(
                    if category == ::std::any::TypeId::of::<$category>() {
                        let view: ::std::sync::Arc<$category> = self;
                        let erased: $crate::typed::ErasedView = ::std::boxed::Box::new(view);
                        return ::std::option::Option::Some(erased);
                    }
                )+
                ::std::option::Option::None
            }
        }
    };
}

macro_rules! plain_notifications {
    ($($ty:ty),* $(,)?) => {
        $( impl Notification for $ty {} )*
    };
}

plain_notifications!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    String, &'static str, (),
);

#[cfg(test)]
mod tests {
    use super::*;

    trait Alert {
        fn severity(&self) -> u8;
    }

    trait Audit {
        fn actor(&self) -> &str;
    }

    struct DiskFull {
        actor: String,
    }

    impl Alert for DiskFull {
        fn severity(&self) -> u8 {
            9
        }
    }

    impl Audit for DiskFull {
        fn actor(&self) -> &str {
            &self.actor
        }
    }

    notification!(DiskFull: dyn Alert, dyn Audit);

    #[test]
    fn declared_categories_are_recognised() {
        assert!(DiskFull::is_category(TypeId::of::<dyn Alert>()));
        assert!(DiskFull::is_category(TypeId::of::<dyn Audit>()));
        assert!(!DiskFull::is_category(TypeId::of::<DiskFull>()));
        assert!(!i32::is_category(TypeId::of::<dyn Alert>()));
    }

    #[test]
    fn upcast_produces_category_view() {
        let payload = Arc::new(DiskFull {
            actor: "cron".into(),
        });

        let alert = Arc::clone(&payload)
            .upcast(TypeId::of::<dyn Alert>())
            .unwrap();
        let alert = alert.downcast_ref::<Arc<dyn Alert>>().unwrap();
        assert_eq!(alert.severity(), 9);

        let audit = payload.upcast(TypeId::of::<dyn Audit>()).unwrap();
        let audit = audit.downcast_ref::<Arc<dyn Audit>>().unwrap();
        assert_eq!(audit.actor(), "cron");
    }

    #[test]
    fn upcast_to_unknown_category_is_none() {
        assert!(Arc::new(5_i32).upcast(TypeId::of::<dyn Alert>()).is_none());
    }
}
