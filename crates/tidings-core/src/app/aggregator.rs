//! Aggregator - 購読の登録・解除と cleanup
//!
//! publish 側の実装は `publish.rs` にあります。
//!
//! # ロックの構成
//! - exact / polymorphic の各 partition がそれぞれ独自の Mutex を持つ
//! - partition 自体は初回 subscribe 時に `OnceLock` で一度だけ生成される
//! - handler はロックを一切保持していない状態で実行される

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use tracing::debug;

use super::builder::AggregatorBuilder;
use super::subscription::Subscription;
use crate::domain::{BusError, BusStats, MethodId, NotificationType, SubscriptionId, Token};
use crate::index::{PartitionKind, SubscriptionEntry, SubscriptionIndex, Sweep};
use crate::ports::IdleScheduler;
use crate::typed::{HandlerResult, WeakHandle};

pub(crate) struct AggregatorInner {
    name: Cow<'static, str>,
    exact: OnceLock<SubscriptionIndex>,
    polymorphic: OnceLock<SubscriptionIndex>,
    cleanup_pending: AtomicBool,
    scheduler: Arc<dyn IdleScheduler>,
}

/// スケジューラに渡す cleanup
///
/// スケジューラが実行せずに捨てた場合（終了済みの Tokio ランタイムなど）は
/// drop 時にその場で cleanup し、pending フラグを下ろします。
/// registry が先に破棄されていれば何もしません。
struct ScheduledCleanup {
    registry: Weak<AggregatorInner>,
    done: bool,
}

impl ScheduledCleanup {
    fn run(mut self) {
        self.done = true;
        if let Some(inner) = self.registry.upgrade() {
            Aggregator { inner }.cleanup();
        }
    }
}

impl Drop for ScheduledCleanup {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            let bus = Aggregator { inner };
            debug!(bus = %bus.name(), "scheduled cleanup was dropped, sweeping in place");
            bus.cleanup();
        }
    }
}

/// Aggregator は通知の購読と配送を仲介する
///
/// `Clone` は同じ registry を共有するハンドルを作ります。
/// 購読者は弱参照でしか保持しないので、subscribe しても寿命は延びません。
///
/// # 使用例
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use tidings_core::Aggregator;
///
/// #[derive(Default)]
/// struct Totals {
///     sum: AtomicU64,
/// }
///
/// impl Totals {
///     fn on_amount(&self, amount: &u64) {
///         self.sum.fetch_add(*amount, Ordering::SeqCst);
///     }
/// }
///
/// let bus = Aggregator::new();
/// let totals = Arc::new(Totals::default());
/// bus.subscribe_method(&totals, Totals::on_amount)?;
///
/// assert_eq!(bus.publish(40_u64)?, 1);
/// assert_eq!(totals.sum.load(Ordering::SeqCst), 40);
/// # Ok::<(), tidings_core::BusError>(())
/// ```
#[derive(Clone)]
pub struct Aggregator {
    pub(crate) inner: Arc<AggregatorInner>,
}

impl Aggregator {
    /// 既定設定で作成（スケジューラは `AggregatorBuilder::build` を参照）
    pub fn new() -> Self {
        AggregatorBuilder::new().build()
    }

    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::new()
    }

    pub(crate) fn from_parts(name: Cow<'static, str>, scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            inner: Arc::new(AggregatorInner {
                name,
                exact: OnceLock::new(),
                polymorphic: OnceLock::new(),
                cleanup_pending: AtomicBool::new(false),
                scheduler,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // ────────────────────────────────────────────────────────────────────────
    // Subscribe
    // ────────────────────────────────────────────────────────────────────────

    /// 購読を登録する
    ///
    /// 同じ購読者・handler・トークンの組み合わせでも重複登録され、
    /// それぞれが独立に配送を受けます。
    pub fn subscribe<N: ?Sized + 'static>(
        &self,
        subscription: Subscription<N>,
    ) -> Result<SubscriptionId, BusError> {
        let kind = subscription.partition();
        let Subscription {
            owner,
            handler,
            token,
            ..
        } = subscription;

        let handle = WeakHandle::new(owner, handler)?;
        let notification = handle.notification_type();
        let entry = Arc::new(SubscriptionEntry::new(handle, token));
        let id = entry.id;

        debug!(
            bus = %self.name(),
            subscription = %id,
            %notification,
            partition = kind.as_str(),
            token = ?entry.token,
            "subscribed"
        );
        self.partition_or_init(kind).insert(notification, entry);

        self.request_cleanup();
        Ok(id)
    }

    /// 完全一致・トークンなしでメソッドを購読する
    pub fn subscribe_method<N, S, F, R>(
        &self,
        subscriber: &Arc<S>,
        method: F,
    ) -> Result<SubscriptionId, BusError>
    where
        N: ?Sized + 'static,
        S: Any + Send + Sync,
        F: Fn(&S, &N) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.subscribe(Subscription::new().method(subscriber, method))
    }

    // ────────────────────────────────────────────────────────────────────────
    // Unsubscribe
    // ────────────────────────────────────────────────────────────────────────

    /// `subscriber` が owner の購読を全て解除する
    ///
    /// handle を死亡状態にするだけで、リストからの削除は cleanup で行います。
    /// 戻り値は新たに解除した購読の数です。
    pub fn unsubscribe<S: ?Sized>(&self, subscriber: &Arc<S>) -> usize {
        let address = Arc::as_ptr(subscriber) as *const ();
        let marked: usize = self
            .partitions()
            .map(|index| index.mark_where(None, |entry| entry.handle.is_owned_by(address)))
            .sum();

        debug!(bus = %self.name(), marked, "unsubscribed subscriber");
        self.request_cleanup();
        marked
    }

    /// `subscriber` の `N` に対する購読を全て解除する
    pub fn unsubscribe_from<N: ?Sized + 'static, S: ?Sized>(&self, subscriber: &Arc<S>) -> usize {
        self.unsubscribe_matching::<N, S>(subscriber, None, None)
    }

    /// `subscriber` の `N` に対する、`token` 付きの購読だけを解除する
    pub fn unsubscribe_token<N: ?Sized + 'static, S: ?Sized>(
        &self,
        subscriber: &Arc<S>,
        token: impl Into<Token>,
    ) -> usize {
        let token = token.into();
        self.unsubscribe_matching::<N, S>(subscriber, Some(&token), None)
    }

    /// `subscriber` の `N` に対する、`handler` の購読だけを解除する
    ///
    /// handler は呼び出し可能な型で照合するので、subscribe 時と同じ
    /// `fn` アイテム（`Listener::on_ping` など）を渡してください。
    pub fn unsubscribe_handler<N: ?Sized + 'static, S: ?Sized, F: 'static>(
        &self,
        subscriber: &Arc<S>,
        handler: F,
    ) -> usize {
        self.unsubscribe_matching::<N, S>(subscriber, None, Some(MethodId::of_val(&handler)))
    }

    /// 一般形: `N` のキーに限定し、指定されたものだけで絞り込む
    pub fn unsubscribe_matching<N: ?Sized + 'static, S: ?Sized>(
        &self,
        subscriber: &Arc<S>,
        token: Option<&Token>,
        method: Option<MethodId>,
    ) -> usize {
        let address = Arc::as_ptr(subscriber) as *const ();
        let notification = NotificationType::of::<N>();
        let select = |entry: &SubscriptionEntry| {
            entry.handle.is_owned_by(address)
                && token.is_none_or(|token| entry.token.as_ref() == Some(token))
                && method.is_none_or(|method| entry.handle.method_id() == method)
        };
        let marked: usize = self
            .partitions()
            .map(|index| index.mark_where(Some(notification), &select))
            .sum();

        debug!(
            bus = %self.name(),
            %notification,
            token = ?token,
            method = method.map(|m| m.name()),
            marked,
            "unsubscribed"
        );
        self.request_cleanup();
        marked
    }

    /// subscribe が返した ID の購読を解除する
    pub fn unsubscribe_id(&self, id: SubscriptionId) -> bool {
        let marked: usize = self
            .partitions()
            .map(|index| index.mark_where(None, |entry| entry.id == id))
            .sum();

        debug!(bus = %self.name(), subscription = %id, found = marked > 0, "unsubscribed by id");
        self.request_cleanup();
        marked > 0
    }

    // ────────────────────────────────────────────────────────────────────────
    // Cleanup
    // ────────────────────────────────────────────────────────────────────────

    /// cleanup を一度だけ予約する（予約済みなら何もしない）
    pub fn request_cleanup(&self) {
        if self
            .inner
            .cleanup_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        debug!(bus = %self.name(), "cleanup scheduled");
        let pending = ScheduledCleanup {
            registry: Arc::downgrade(&self.inner),
            done: false,
        };
        self.inner.scheduler.schedule(Box::new(move || pending.run()));
    }

    /// 死んだ購読と空になったキーを削除する
    pub fn cleanup(&self) -> Sweep {
        let mut total = Sweep::default();
        for index in self.partitions() {
            let sweep = index.sweep();
            if sweep.removed_entries > 0 {
                debug!(
                    bus = %self.name(),
                    partition = index.kind().as_str(),
                    removed_entries = sweep.removed_entries,
                    removed_types = sweep.removed_types,
                    "swept dead subscriptions"
                );
            }
            total.removed_entries += sweep.removed_entries;
            total.removed_types += sweep.removed_types;
        }

        self.inner.cleanup_pending.store(false, Ordering::Release);
        total
    }

    pub fn is_cleanup_pending(&self) -> bool {
        self.inner.cleanup_pending.load(Ordering::Acquire)
    }

    /// 既定インスタンスを破棄する
    pub fn reset_all(&self) {
        super::default::reset_default();
    }

    // ────────────────────────────────────────────────────────────────────────
    // Observability
    // ────────────────────────────────────────────────────────────────────────

    pub fn stats(&self) -> BusStats {
        let exact = self.partition(PartitionKind::Exact);
        let polymorphic = self.partition(PartitionKind::Polymorphic);
        BusStats {
            exact_types: exact.map_or(0, SubscriptionIndex::type_count),
            exact_entries: exact.map_or(0, SubscriptionIndex::entry_count),
            polymorphic_types: polymorphic.map_or(0, SubscriptionIndex::type_count),
            polymorphic_entries: polymorphic.map_or(0, SubscriptionIndex::entry_count),
            cleanup_pending: self.is_cleanup_pending(),
        }
    }

    /// `notification` のキーにある購読数（未回収の死んだ購読を含む）
    pub fn subscription_count(&self, kind: PartitionKind, notification: NotificationType) -> usize {
        self.partition(kind)
            .map_or(0, |index| index.len_of(notification))
    }

    pub(crate) fn partition(&self, kind: PartitionKind) -> Option<&SubscriptionIndex> {
        self.slot(kind).get()
    }

    fn partition_or_init(&self, kind: PartitionKind) -> &SubscriptionIndex {
        self.slot(kind)
            .get_or_init(|| SubscriptionIndex::new(kind))
    }

    fn partitions(&self) -> impl Iterator<Item = &SubscriptionIndex> {
        [&self.inner.exact, &self.inner.polymorphic]
            .into_iter()
            .filter_map(OnceLock::get)
    }

    fn slot(&self, kind: PartitionKind) -> &OnceLock<SubscriptionIndex> {
        match kind {
            PartitionKind::Exact => &self.inner.exact,
            PartitionKind::Polymorphic => &self.inner.polymorphic,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("name", &self.name())
            .field("stats", &self.stats())
            .finish()
    }
}
