//! Publish - 通知の配送
//!
//! # 配送の順序
//! 1. polymorphic partition: 通知型そのもの、または通知が宣言するカテゴリのキー
//! 2. exact partition: 通知型と完全に一致するキー
//!
//! 各キーのリストはロック中にコピーし、handler はロックの外で呼びます。
//! handler がエラーを返すとその場で配送を打ち切ります（残りの購読者には届きません）。
//! 成否に関わらず publish の最後に cleanup を予約します。

use std::any::Any;
use std::sync::Arc;

use tracing::trace;

use super::aggregator::Aggregator;
use crate::domain::{BusError, NotificationType, Token};
use crate::index::{PartitionKind, SubscriptionEntry};
use crate::typed::{ErasedView, Notification};

/// publish ごとの配送条件
struct DeliveryFilter<'a> {
    target: Option<NotificationType>,
    token: Option<&'a Token>,
}

impl DeliveryFilter<'_> {
    /// 配送しない理由（配送するなら None）
    fn skip_reason(&self, entry: &SubscriptionEntry) -> Option<&'static str> {
        if !entry.handle.is_alive() {
            return Some("dead");
        }
        if let Some(target) = self.target
            && !entry.handle.owner_is(target.id())
        {
            return Some("target");
        }
        if !entry.matches_token(self.token) {
            return Some("token");
        }
        None
    }
}

impl Aggregator {
    /// 全ての該当購読者に配送し、実際に呼び出した handler の数を返す
    pub fn publish<N: Notification>(&self, notification: N) -> Result<usize, BusError> {
        self.dispatch(notification, None, None)
    }

    /// 同じトークンで購読した購読者にだけ配送する
    pub fn publish_with_token<N: Notification>(
        &self,
        notification: N,
        token: impl Into<Token>,
    ) -> Result<usize, BusError> {
        let token = token.into();
        self.dispatch(notification, None, Some(&token))
    }

    /// owner の具象型が `T` の購読者にだけ配送する
    ///
    /// owner を持たない static handler には届きません。
    pub fn publish_to<N: Notification, T: Any>(&self, notification: N) -> Result<usize, BusError> {
        self.dispatch(notification, Some(NotificationType::of::<T>()), None)
    }

    pub fn publish_to_with_token<N: Notification, T: Any>(
        &self,
        notification: N,
        token: impl Into<Token>,
    ) -> Result<usize, BusError> {
        let token = token.into();
        self.dispatch(notification, Some(NotificationType::of::<T>()), Some(&token))
    }

    fn dispatch<N: Notification>(
        &self,
        notification: N,
        target: Option<NotificationType>,
        token: Option<&Token>,
    ) -> Result<usize, BusError> {
        let filter = DeliveryFilter { target, token };
        let result = self.deliver_all(Arc::new(notification), &filter);
        self.request_cleanup();
        result
    }

    fn deliver_all<N: Notification>(
        &self,
        payload: Arc<N>,
        filter: &DeliveryFilter<'_>,
    ) -> Result<usize, BusError> {
        let notification = NotificationType::of::<N>();
        let mut delivered = 0;

        if let Some(index) = self.partition(PartitionKind::Polymorphic) {
            let lists =
                index.snapshot_where(|key| key == notification || N::is_category(key.id()));
            for (key, entries) in lists {
                let view: ErasedView = if key == notification {
                    Box::new(Arc::clone(&payload))
                } else {
                    match Arc::clone(&payload).upcast(key.id()) {
                        Some(view) => view,
                        None => continue,
                    }
                };
                delivered += self.deliver(notification, key, &entries, &*view, filter)?;
            }
        }

        if let Some(index) = self.partition(PartitionKind::Exact)
            && let Some(entries) = index.snapshot(notification)
        {
            delivered += self.deliver(notification, notification, &entries, &payload, filter)?;
        }

        Ok(delivered)
    }

    fn deliver(
        &self,
        notification: NotificationType,
        key: NotificationType,
        entries: &[Arc<SubscriptionEntry>],
        view: &dyn Any,
        filter: &DeliveryFilter<'_>,
    ) -> Result<usize, BusError> {
        let mut delivered = 0;
        for entry in entries {
            if let Some(reason) = filter.skip_reason(entry) {
                trace!(bus = %self.name(), subscription = %entry.id, %key, reason, "skipped");
                continue;
            }

            match entry.handle.invoke(view) {
                Ok(true) => {
                    trace!(bus = %self.name(), subscription = %entry.id, %notification, %key, "delivered");
                    delivered += 1;
                }
                // 判定と呼び出しの間に死んだ
                Ok(false) => {}
                Err(source) => {
                    return Err(BusError::Handler {
                        notification,
                        method: entry.handle.method_id(),
                        source,
                    });
                }
            }
        }
        Ok(delivered)
    }
}
