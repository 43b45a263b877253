//! # Shelf Calculation Engine
//!
//! 批次 FIFO 配對、即時扣減、歷史重建與 GR 計算

pub mod expiry_report;
pub mod good_return;
pub mod live;
pub mod matching;
pub mod reconstruction;
pub mod stock_position;

use rust_decimal::Decimal;

// Re-export 主要類型
pub use expiry_report::{ExpiryReport, ExpiryReportBuilder, ExpiryReportEntry};
pub use good_return::{GoodReturn, GoodReturnCalculator, GoodReturnDetail, GoodReturnSummary};
pub use live::LiveConsumption;
pub use matching::{FifoMatcher, LotSlot, MatchOutcome};
pub use reconstruction::{HistoricalReconstructor, LotBalance, Reconstruction, SaleMatch};
pub use stock_position::{LotStatus, LotPosition, StockPosition, StockPositionCalculator};

/// 單一批次的配對量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotAllocation {
    pub lot_id: String,
    pub quantity: Decimal,
}

impl LotAllocation {
    pub fn new(lot_id: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            lot_id: lot_id.into(),
            quantity,
        }
    }
}

/// 對帳警告
///
/// 歷史重建時，某筆銷售找不到足夠的合格批次承接。
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationWarning {
    pub item_id: String,
    pub sale_id: String,
    pub unmatched: Decimal,
    pub message: String,
    pub severity: WarningSeverity,
}

impl ReconciliationWarning {
    /// 整筆銷售皆無法配對時為 Error，部分配對為 Warning
    pub fn new(item_id: String, sale_id: String, unmatched: Decimal, sale_quantity: Decimal) -> Self {
        let severity = if unmatched >= sale_quantity {
            WarningSeverity::Error
        } else {
            WarningSeverity::Warning
        };
        Self {
            message: format!("銷售 {sale_id} 有 {unmatched} 無合格批次可配對"),
            item_id,
            sale_id,
            unmatched,
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Warning,
    Error,
}
