//! Type identity keys.
//!
//! `NotificationType` keys the subscription index, `MethodId` identifies the
//! callable bound into a handle. Both compare by `TypeId` only; the captured
//! type name exists for logs and error messages.

use std::any::{self, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identifier of a notification type (or of a category such as `dyn Alert`).
#[derive(Clone, Copy)]
pub struct NotificationType {
    id: TypeId,
    name: &'static str,
}

impl NotificationType {
    pub fn of<N: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<N>(),
            name: any::type_name::<N>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for NotificationType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NotificationType {}

impl Hash for NotificationType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NotificationType").field(&self.name).finish()
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity of a bound handler.
///
/// Every `fn` item and every closure expression has its own type, so the
/// callable's `TypeId` tells handlers apart the way a method name would.
#[derive(Clone, Copy)]
pub struct MethodId {
    id: TypeId,
    name: &'static str,
}

impl MethodId {
    pub fn of<F: 'static>() -> Self {
        Self {
            id: TypeId::of::<F>(),
            name: any::type_name::<F>(),
        }
    }

    pub fn of_val<F: 'static>(_handler: &F) -> Self {
        Self::of::<F>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for MethodId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MethodId {}

impl Hash for MethodId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodId").field(&self.name).finish()
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Alert {}

    struct Listener;

    impl Listener {
        fn on_a(&self, _value: &i32) {}
        fn on_b(&self, _value: &i32) {}
    }

    #[test]
    fn notification_types_compare_by_type() {
        assert_eq!(NotificationType::of::<i32>(), NotificationType::of::<i32>());
        assert_ne!(NotificationType::of::<i32>(), NotificationType::of::<i64>());
        assert_ne!(
            NotificationType::of::<dyn Alert>(),
            NotificationType::of::<Listener>()
        );
    }

    #[test]
    fn method_ids_distinguish_methods() {
        let a = MethodId::of_val(&Listener::on_a);
        let b = MethodId::of_val(&Listener::on_b);

        assert_eq!(a, MethodId::of_val(&Listener::on_a));
        assert_ne!(a, b);
        assert!(a.name().contains("on_a"));
    }
}
