//! AggregatorBuilder - Aggregator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 実行環境に応じた既定値（Tokio ランタイムの有無）

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use super::aggregator::Aggregator;
use crate::impls::{InlineScheduler, TokioIdleScheduler};
use crate::ports::IdleScheduler;

const DEFAULT_NAME: &str = "tidings";

/// AggregatorBuilder は Aggregator を構築
///
/// # 使用例
/// ```
/// use std::sync::Arc;
/// use tidings_core::{AggregatorBuilder, InlineScheduler};
///
/// let bus = AggregatorBuilder::new()
///     .name("orders")
///     .scheduler(Arc::new(InlineScheduler::new()))
///     .build();
/// assert_eq!(bus.name(), "orders");
/// ```
///
/// # 既定のスケジューラ
/// - Tokio ランタイム内で `build()` した場合: `TokioIdleScheduler`
/// - それ以外: `InlineScheduler`（cleanup を呼び出し元で即実行）
#[derive(Default)]
pub struct AggregatorBuilder {
    name: Option<Cow<'static, str>>,
    scheduler: Option<Arc<dyn IdleScheduler>>,
}

impl AggregatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// ログに出る名前
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// cleanup を実行するスケジューラ
    pub fn scheduler(mut self, scheduler: Arc<dyn IdleScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Aggregator {
        let name = self.name.unwrap_or(Cow::Borrowed(DEFAULT_NAME));
        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => default_scheduler(),
        };

        debug!(bus = %name, "aggregator created");
        Aggregator::from_parts(name, scheduler)
    }
}

fn default_scheduler() -> Arc<dyn IdleScheduler> {
    match TokioIdleScheduler::try_current() {
        Some(scheduler) => Arc::new(scheduler),
        None => Arc::new(InlineScheduler::new()),
    }
}
