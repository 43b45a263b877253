//! 帳本配置

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// 帳本配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerConfig {
    /// JSON 資料目錄（None 表示僅使用記憶體儲存）
    pub store_dir: Option<PathBuf>,

    /// 物料數量達到此值時，全物料 GR 計算改用並行
    pub parallel_threshold: usize,

    /// 是否拒絕早於所有批次入庫時刻的銷售
    /// - true: 回傳驗證錯誤（預設）
    /// - false: 視為庫存不足
    pub reject_sales_before_stock: bool,
}

impl LedgerConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            store_dir: None,
            parallel_threshold: 64,
            reject_sales_before_stock: true,
        }
    }

    /// 建構器模式：設置資料目錄
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(dir.into());
        self
    }

    /// 建構器模式：設置並行門檻
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// 建構器模式：設置是否拒絕早於入庫的銷售
    pub fn with_reject_sales_before_stock(mut self, reject: bool) -> Self {
        self.reject_sales_before_stock = reject;
        self
    }

    /// 從 JSON 檔案載入配置（缺少的欄位使用預設值）
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("無法讀取 {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| LedgerError::Config(format!("無法解析 {}: {e}", path.display())))
    }

    /// 是否應使用並行計算
    pub fn should_parallelize(&self, item_count: usize) -> bool {
        self.parallel_threshold > 0 && item_count >= self.parallel_threshold
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();

        assert_eq!(config.store_dir, None);
        assert!(config.reject_sales_before_stock);
        assert!(!config.should_parallelize(10));
        assert!(config.should_parallelize(64));
    }

    #[test]
    fn test_config_builder() {
        let config = LedgerConfig::new()
            .with_store_dir("/var/lib/shelf")
            .with_parallel_threshold(0)
            .with_reject_sales_before_stock(false);

        assert_eq!(config.store_dir, Some(PathBuf::from("/var/lib/shelf")));
        assert!(!config.should_parallelize(10_000)); // 0 表示停用並行
        assert!(!config.reject_sales_before_stock);
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"parallelThreshold": 8}}"#).unwrap();

        let config = LedgerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.parallel_threshold, 8);
        assert!(config.reject_sales_before_stock);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LedgerConfig::from_json_file("/nonexistent/shelf.json").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
