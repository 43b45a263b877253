//! 庫存調整模型

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::{LedgerError, Result};

/// 調整方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    /// 增加
    Increase,
    /// 減少
    Decrease,
}

/// 庫存調整
///
/// 只累加到目前庫存總量，不修改任何批次，也不參與 FIFO 配對。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    /// 調整ID
    pub id: String,

    /// 物料ID
    pub item_id: String,

    /// 調整方向
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,

    /// 調整數量（正數）
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,

    /// 調整時刻
    #[serde(with = "calendar::serde_datetime")]
    pub date: NaiveDateTime,

    /// 原因
    pub reason: String,

    /// 備註
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Adjustment {
    /// 創建新的庫存調整
    pub fn new(
        item_id: impl Into<String>,
        adjustment_type: AdjustmentType,
        quantity: Decimal,
        date: NaiveDateTime,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: crate::new_record_id(),
            item_id: item_id.into(),
            adjustment_type,
            quantity,
            date,
            reason: reason.into(),
            notes: None,
        }
    }

    /// 建構器模式：設置備註（空字串視為無備註）
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() { None } else { Some(notes) };
        self
    }

    /// 對目前庫存的影響：增加為正、減少為負
    pub fn signed_quantity(&self) -> Decimal {
        match self.adjustment_type {
            AdjustmentType::Increase => self.quantity,
            AdjustmentType::Decrease => -self.quantity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.item_id.trim().is_empty() {
            return Err(LedgerError::validation("調整必須指定物料"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "調整數量必須大於 0：{}",
                self.quantity
            )));
        }
        if self.reason.trim().is_empty() {
            return Err(LedgerError::validation("調整必須填寫原因"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_signed_quantity() {
        let up = Adjustment::new("BREAD", AdjustmentType::Increase, Decimal::from(4), now(), "recount");
        let down = Adjustment::new("BREAD", AdjustmentType::Decrease, Decimal::from(3), now(), "damaged");

        assert_eq!(up.signed_quantity(), Decimal::from(4));
        assert_eq!(down.signed_quantity(), Decimal::from(-3));
    }

    #[test]
    fn test_adjustment_validation() {
        let no_reason = Adjustment::new("BREAD", AdjustmentType::Decrease, Decimal::ONE, now(), "");
        assert!(matches!(no_reason.validate(), Err(LedgerError::Validation(_))));

        let zero = Adjustment::new("BREAD", AdjustmentType::Increase, Decimal::ZERO, now(), "recount");
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_blank_notes_dropped() {
        let adj = Adjustment::new("BREAD", AdjustmentType::Increase, Decimal::ONE, now(), "recount")
            .with_notes("   ");
        assert_eq!(adj.notes, None);

        let value = serde_json::to_value(&adj).unwrap();
        assert_eq!(value["type"], "increase");
        assert!(value.get("notes").is_none());
    }
}
