//! # Shelf
//!
//! 易腐品庫存帳本：批次 FIFO 扣減、歷史重建與退貨量（GR）計算

pub mod logging;

// Re-export 主要類型
pub use shelf_calc::{
    ExpiryReport, GoodReturn, GoodReturnSummary, LotStatus, ReconciliationWarning, StockPosition,
    WarningSeverity,
};
pub use shelf_core::{
    Adjustment, AdjustmentType, Item, LedgerConfig, LedgerError, Lot, LotOrigin, PaymentMode,
    Result, Sale, StockDeduction,
};
pub use shelf_ledger::{Collection, JsonDirStore, Ledger, MemoryStore, RecordStore};
