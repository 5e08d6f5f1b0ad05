//! IdleScheduler port - 後回しにできる処理の実行先
//!
//! registry は cleanup を「手が空いたとき」に一度だけ実行したいだけで、
//! いつ実行されるかは仮定しません。UI のディスパッチャ、非同期ランタイム、
//! テスト用の手動キューなどを差し替えられるように trait として抽象化しています。
//!
//! # 実装
//! - **InlineScheduler**: その場で実行
//! - **ManualScheduler**: キューに積み、`run_pending()` で実行（テスト用）
//! - **TokioIdleScheduler**: Tokio ランタイムに spawn

/// スケジュールされる処理（引数なし・一度だけ実行）
pub type IdleTask = Box<dyn FnOnce() + Send + 'static>;

/// IdleScheduler は低優先度の処理を後で一度だけ実行する
///
/// # 契約
/// - `schedule` に渡された処理は、いずれ一度だけ実行されること
/// - 呼び出し元のロックは保持されていない（その場で実行してもよい）
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから呼ばれる）
pub trait IdleScheduler: Send + Sync {
    fn schedule(&self, task: IdleTask);
}
