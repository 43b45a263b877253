//! 銷售模型與扣減追溯記錄

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::{LedgerError, Result};

/// 付款方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// 現金
    Cash,
    /// UPI
    Upi,
}

/// 銷售記錄
///
/// 記錄後不可修改，只能刪除（刪除時退回庫存）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// 銷售ID
    pub id: String,

    /// 物料ID
    pub item_id: String,

    /// 銷售數量
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,

    /// 單價
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// 銷售時刻（含時間）
    #[serde(with = "calendar::serde_datetime")]
    pub date: NaiveDateTime,

    /// 付款方式
    pub payment_mode: PaymentMode,
}

impl Sale {
    /// 創建新的銷售記錄
    pub fn new(
        item_id: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        date: NaiveDateTime,
        payment_mode: PaymentMode,
    ) -> Self {
        Self {
            id: crate::new_record_id(),
            item_id: item_id.into(),
            quantity,
            price,
            date,
            payment_mode,
        }
    }

    /// 建構器模式：指定 ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 銷售金額
    pub fn amount(&self) -> Decimal {
        self.quantity * self.price
    }

    pub fn validate(&self) -> Result<()> {
        if self.item_id.trim().is_empty() {
            return Err(LedgerError::validation("銷售必須指定物料"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "銷售數量必須大於 0：{}",
                self.quantity
            )));
        }
        if self.price < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "銷售單價不可為負：{}",
                self.price
            )));
        }
        Ok(())
    }
}

/// 扣減追溯記錄：某筆銷售從某批次扣了多少
///
/// 即時銷售時寫入，刪除銷售時依此精確退回原批次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDeduction {
    /// 銷售ID
    pub sale_id: String,

    /// 批次ID
    pub lot_id: String,

    /// 扣減數量
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
}

impl StockDeduction {
    pub fn new(sale_id: impl Into<String>, lot_id: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            sale_id: sale_id.into(),
            lot_id: lot_id.into(),
            quantity,
        }
    }
}
