//! Ports - 抽象化レイヤー
//!
//! registry が外部に依存するのは「後で一度だけ実行する」能力だけです。

pub mod idle_scheduler;

pub use self::idle_scheduler::{IdleScheduler, IdleTask};
