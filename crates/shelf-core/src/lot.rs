//! 批次模型（期初庫存與收貨統一為批次）

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::{LedgerError, Result};

/// 批次來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotOrigin {
    /// 期初庫存
    #[default]
    Opening,
    /// 收貨
    Receiving,
}

impl std::fmt::Display for LotOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotOrigin::Opening => f.write_str("opening"),
            LotOrigin::Receiving => f.write_str("receiving"),
        }
    }
}

/// 庫存批次
///
/// 批次的身分（id、物料、入庫日、來源）不會改變，只有 `quantity`
/// 會在即時銷售時被扣減。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    /// 批次ID
    pub id: String,

    /// 物料ID
    pub item_id: String,

    /// 目前數量
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,

    /// 入庫日
    #[serde(with = "calendar::serde_date", alias = "date")]
    pub stock_date: NaiveDate,

    /// 來源
    #[serde(default, alias = "type")]
    pub origin: LotOrigin,

    /// 插入序號，同一入庫日的批次依此先後配對（0 表示未編號）
    #[serde(default)]
    pub sequence: u64,
}

impl Lot {
    /// 創建新的批次
    pub fn new(
        item_id: impl Into<String>,
        quantity: Decimal,
        stock_date: NaiveDate,
        origin: LotOrigin,
    ) -> Self {
        Self {
            id: crate::new_record_id(),
            item_id: item_id.into(),
            quantity,
            stock_date,
            origin,
            sequence: 0,
        }
    }

    /// 期初庫存批次
    pub fn opening(item_id: impl Into<String>, quantity: Decimal, stock_date: NaiveDate) -> Self {
        Self::new(item_id, quantity, stock_date, LotOrigin::Opening)
    }

    /// 收貨批次
    pub fn receiving(item_id: impl Into<String>, quantity: Decimal, stock_date: NaiveDate) -> Self {
        Self::new(item_id, quantity, stock_date, LotOrigin::Receiving)
    }

    /// 建構器模式：指定 ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 到期日 = 入庫日 + 保存天數
    pub fn expiry_date(&self, shelf_life_days: u32) -> NaiveDate {
        calendar::expiry_date(self.stock_date, shelf_life_days)
    }

    /// 批次入庫時刻（入庫日 00:00）
    pub fn stocked_at(&self) -> NaiveDateTime {
        calendar::start_of_day(self.stock_date)
    }

    /// 檢查必填欄位與數量
    pub fn validate(&self) -> Result<()> {
        if self.item_id.trim().is_empty() {
            return Err(LedgerError::validation("批次必須指定物料"));
        }
        if self.quantity < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "批次數量不可為負：{}",
                self.quantity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_time(NaiveTime::from_hms_opt(h, min, 0).unwrap())
    }

    #[test]
    fn test_create_lot() {
        let lot = Lot::receiving("BREAD", Decimal::from(5), date(2024, 3, 2));

        assert_eq!(lot.item_id, "BREAD");
        assert_eq!(lot.origin, LotOrigin::Receiving);
        assert_eq!(lot.expiry_date(3), date(2024, 3, 5));
        assert_eq!(lot.stocked_at(), at(2024, 3, 2, 0, 0));
    }

    #[test]
    fn test_deserialize_legacy_stock_record() {
        let json = r#"{"id":"99","itemId":"BREAD","quantity":10,"date":"2024-03-01"}"#;
        let lot: Lot = serde_json::from_str(json).unwrap();

        assert_eq!(lot.stock_date, date(2024, 3, 1));
        assert_eq!(lot.origin, LotOrigin::Opening);
        assert_eq!(lot.quantity, Decimal::from(10));
    }

    #[test]
    fn test_serialize_lot() {
        let lot = Lot::receiving("BREAD", Decimal::from(5), date(2024, 3, 2)).with_id("L1");
        let value = serde_json::to_value(&lot).unwrap();

        assert_eq!(value["stockDate"], "2024-03-02");
        assert_eq!(value["origin"], "receiving");
        assert_eq!(value["itemId"], "BREAD");
        assert_eq!(value["quantity"], 5.0);
    }

    #[test]
    fn test_quantity_accepts_string_or_number() {
        let json = r#"{"id":"L2","itemId":"BREAD","quantity":"2.5","stockDate":"2024-03-02"}"#;
        let lot: Lot = serde_json::from_str(json).unwrap();
        assert_eq!(lot.quantity, Decimal::new(25, 1));

        let value = serde_json::to_value(&lot).unwrap();
        assert!(value["quantity"].is_number());
    }

    #[test]
    fn test_negative_quantity_invalid() {
        let lot = Lot::opening("BREAD", Decimal::from(-1), date(2024, 3, 1));
        assert!(matches!(lot.validate(), Err(LedgerError::Validation(_))));
    }
}
