//! ManualScheduler - 手動で実行するスケジューラ
//!
//! # 学習ポイント
//! - Mutex<VecDeque> による FIFO キュー
//! - 実行はロックを外してから（タスクが再度 schedule してもデッドロックしない）

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ports::{IdleScheduler, IdleTask};

/// ManualScheduler はタスクを溜めておき、`run_pending()` で実行する
///
/// テストやホスト側のイベントループから決定的に cleanup を走らせたいときに使います。
///
/// # 使用例
/// ```
/// use std::sync::Arc;
/// use tidings_core::{AggregatorBuilder, ManualScheduler};
///
/// let scheduler = Arc::new(ManualScheduler::new());
/// let bus = AggregatorBuilder::new().scheduler(scheduler.clone()).build();
///
/// bus.request_cleanup();
/// assert_eq!(scheduler.pending(), 1);
/// assert_eq!(scheduler.run_pending(), 1);
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<VecDeque<IdleTask>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 溜まっているタスクの数
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// 溜まっているタスクを全て実行し、実行した数を返す
    ///
    /// 実行中に追加されたタスクも同じ呼び出しで実行します。
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let Some(task) = self.lock().pop_front() else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<IdleTask>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdleScheduler for ManualScheduler {
    fn schedule(&self, task: IdleTask) {
        self.lock().push_back(task);
    }
}
