//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + Phantom type
//! subscribe が返す受領 ID は ULID で表現します。
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として
//! コンパイル時の型安全性を提供します。
//!
//! ## ULID を使う理由
//! - 時刻でソート可能なので、ログ上で subscribe の順序を追いやすい
//! - 調整なしで複数スレッドから生成できる

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"sub-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// 新しい ID を生成
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Subscription のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subscription {}

impl IdMarker for Subscription {
    fn prefix() -> &'static str {
        "sub-"
    }
}

/// Identifier of one subscription entry (one subscribe call).
pub type SubscriptionId = Id<Subscription>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_ids_are_unique_and_prefixed() {
        let id1 = SubscriptionId::generate();
        let id2 = SubscriptionId::generate();

        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("sub-"));
    }

    #[test]
    fn subscription_ids_are_sortable() {
        let id1 = SubscriptionId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = SubscriptionId::generate();

        assert!(id1 < id2);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<SubscriptionId>(), size_of::<Ulid>());
    }
}
