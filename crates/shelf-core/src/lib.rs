//! # Shelf Core
//!
//! 核心資料模型與類型定義（物料、批次、銷售、庫存調整）

pub mod adjustment;
pub mod calendar;
pub mod config;
pub mod item;
pub mod lot;
pub mod sale;

use rust_decimal::Decimal;

// Re-export 主要類型
pub use adjustment::{Adjustment, AdjustmentType};
pub use config::LedgerConfig;
pub use item::Item;
pub use lot::{Lot, LotOrigin};
pub use sale::{PaymentMode, Sale, StockDeduction};

/// 記錄種類（用於錯誤訊息）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Item,
    Lot,
    Sale,
    Adjustment,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RecordKind::Item => "物料",
            RecordKind::Lot => "批次",
            RecordKind::Sale => "銷售記錄",
            RecordKind::Adjustment => "庫存調整",
        };
        f.write_str(label)
    }
}

/// 帳本錯誤類型
///
/// 所有錯誤皆可由呼叫端恢復，不會造成程序終止。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("資料驗證失敗: {0}")]
    Validation(String),

    #[error("庫存不足：物料 {item_id} 需要 {requested}, 可用 {available}")]
    InsufficientStock {
        item_id: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("找不到{kind}: {id}")]
    NotFound { kind: RecordKind, id: String },

    #[error("匯入格式錯誤: {0}")]
    ImportFormat(String),

    #[error("儲存錯誤: {0}")]
    Storage(String),

    #[error("配置錯誤: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// 產生新的記錄 ID
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
