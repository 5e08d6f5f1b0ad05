//! 既定インスタンス
//!
//! プロセス全体で共有する Aggregator を一つだけ保持します。
//! 初回アクセス時に遅延生成し、`override_default` で差し替え、
//! `reset_default` で破棄できます。破棄された registry の購読者には何も通知しません。

use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::aggregator::Aggregator;
use super::builder::AggregatorBuilder;

static DEFAULT: RwLock<Option<Aggregator>> = RwLock::new(None);

/// 既定インスタンスを返す（なければ作る）
///
/// 同時に初回アクセスが起きても生成されるのは一つだけです。
pub fn default_aggregator() -> Aggregator {
    let current = DEFAULT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Some(aggregator) = current {
        return aggregator;
    }

    let mut slot = DEFAULT.write().unwrap_or_else(PoisonError::into_inner);
    slot.get_or_insert_with(|| {
        debug!("creating default aggregator");
        AggregatorBuilder::new().name("default").build()
    })
    .clone()
}

/// 既定インスタンスを差し替える
pub fn override_default(aggregator: Aggregator) {
    debug!(bus = %aggregator.name(), "default aggregator overridden");
    *DEFAULT.write().unwrap_or_else(PoisonError::into_inner) = Some(aggregator);
}

/// 既定インスタンスを破棄する（次の `default_aggregator()` で作り直す）
pub fn reset_default() {
    debug!("default aggregator reset");
    *DEFAULT.write().unwrap_or_else(PoisonError::into_inner) = None;
}
