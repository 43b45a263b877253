//! 日誌初始化（tracing-subscriber）

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日誌
///
/// # 環境變數
/// - RUST_LOG: 日誌級別過濾（預設: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=shelf_ledger=debug
///
/// 重複呼叫時保留第一次的設定。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// 測試用日誌：debug 級別，輸出到測試擷取
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
