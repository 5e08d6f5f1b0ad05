//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InlineScheduler**: ランタイム外の既定値
//! - **ManualScheduler**: テスト・ホストループ用
//! - **TokioIdleScheduler**: Tokio ランタイム内の既定値

pub mod inline_scheduler;
pub mod manual_scheduler;
pub mod tokio_scheduler;

pub use self::inline_scheduler::InlineScheduler;
pub use self::manual_scheduler::ManualScheduler;
pub use self::tokio_scheduler::TokioIdleScheduler;
