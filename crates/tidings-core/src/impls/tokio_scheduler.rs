//! TokioIdleScheduler - Tokio ランタイム上で後回しに実行する
//!
//! spawn したタスクは一度 `yield_now()` してから処理を実行するので、
//! その時点で実行可能な他のタスクより後に回ります。
//! ランタイムの終了で実行されずに捨てられた cleanup は、Aggregator 側でその場で実行されます。

use tokio::runtime::Handle;

use crate::ports::{IdleScheduler, IdleTask};

#[derive(Debug, Clone)]
pub struct TokioIdleScheduler {
    handle: Handle,
}

impl TokioIdleScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// 現在のランタイムに束縛する（ランタイム外なら None）
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl IdleScheduler for TokioIdleScheduler {
    fn schedule(&self, task: IdleTask) {
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn no_runtime_means_no_scheduler() {
        assert!(TokioIdleScheduler::try_current().is_none());
    }

    #[tokio::test]
    async fn runs_task_on_runtime() {
        let scheduler = TokioIdleScheduler::try_current().unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        scheduler.schedule(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(!ran.load(Ordering::SeqCst));

        for _ in 0..50 {
            if ran.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ran.load(Ordering::SeqCst));
    }
}
