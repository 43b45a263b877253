//! 記錄儲存：以集合名稱存取整批 JSON 記錄

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use shelf_core::{LedgerError, Result};

/// 帳本集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Items,
    OpeningStock,
    ReceivingStock,
    Sales,
    StockAdjustments,
    SaleDeductions,
}

impl Collection {
    /// 全部集合（依載入順序）
    pub const ALL: [Collection; 6] = [
        Collection::Items,
        Collection::OpeningStock,
        Collection::ReceivingStock,
        Collection::Sales,
        Collection::StockAdjustments,
        Collection::SaleDeductions,
    ];

    /// 儲存用的集合名稱
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Items => "items",
            Collection::OpeningStock => "openingStock",
            Collection::ReceivingStock => "receivingStock",
            Collection::Sales => "sales",
            Collection::StockAdjustments => "stockAdjustments",
            Collection::SaleDeductions => "saleDeductions",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 儲存協作者
///
/// 不存在的集合載入為空序列；`save` 整批取代。
pub trait RecordStore: Send + Sync {
    fn load(&self, collection: Collection) -> Result<Vec<Value>>;

    fn save(&self, collection: Collection, records: &[Value]) -> Result<()>;
}

/// 記憶體儲存
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：預先放入集合內容
    pub fn with_collection(self, collection: Collection, records: Vec<Value>) -> Self {
        if let Ok(mut collections) = self.collections.lock() {
            collections.insert(collection, records);
        }
        self
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let collections = self
            .collections
            .lock()
            .map_err(|_| LedgerError::Storage("記憶體儲存鎖已損壞".to_string()))?;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    fn save(&self, collection: Collection, records: &[Value]) -> Result<()> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| LedgerError::Storage("記憶體儲存鎖已損壞".to_string()))?;
        collections.insert(collection, records.to_vec());
        Ok(())
    }
}

/// JSON 目錄儲存：每個集合一個 `<name>.json` 檔案
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }
}

impl RecordStore for JsonDirStore {
    fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let path = self.path_for(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| LedgerError::Storage(format!("無法讀取 {}: {e}", path.display())))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| LedgerError::Storage(format!("無法解析 {}: {e}", path.display())))
    }

    fn save(&self, collection: Collection, records: &[Value]) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            LedgerError::Storage(format!("無法建立資料目錄 {}: {e}", self.dir.display()))
        })?;

        let path = self.path_for(collection);
        let body = serde_json::to_string_pretty(records)
            .map_err(|e| LedgerError::Storage(format!("無法序列化 {collection}: {e}")))?;

        // 先寫暫存檔再改名，避免留下寫到一半的檔案
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .map_err(|e| LedgerError::Storage(format!("無法寫入 {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| LedgerError::Storage(format!("無法寫入 {}: {e}", path.display())))?;

        tracing::debug!("已儲存 {}：{} 筆", collection, records.len());
        Ok(())
    }
}
