//! InlineScheduler - その場で実行するスケジューラ
//!
//! ランタイムを持たない同期プログラム向けの既定値です。

use crate::ports::{IdleScheduler, IdleTask};

#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl InlineScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl IdleScheduler for InlineScheduler {
    fn schedule(&self, task: IdleTask) {
        task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn runs_task_immediately() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        InlineScheduler::new().schedule(Box::new(move || flag.store(true, Ordering::SeqCst)));

        assert!(ran.load(Ordering::SeqCst));
    }
}
