//! 物料模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// 物料（商品主檔）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// 物料ID
    pub id: String,

    /// 名稱
    pub name: String,

    /// 分類
    pub category: String,

    /// 標價
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// 保存期限（天），屬於物料而非批次
    #[serde(alias = "shelfLife")]
    pub shelf_life_days: u32,

    /// 成本價
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub cost_price: Option<Decimal>,

    /// 售價（未設定時使用標價）
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub selling_price: Option<Decimal>,
}

impl Item {
    /// 創建新的物料
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
        shelf_life_days: u32,
    ) -> Self {
        Self {
            id: crate::new_record_id(),
            name: name.into(),
            category: category.into(),
            price,
            shelf_life_days,
            cost_price: None,
            selling_price: None,
        }
    }

    /// 建構器模式：指定 ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 建構器模式：設置成本價
    pub fn with_cost_price(mut self, cost_price: Decimal) -> Self {
        self.cost_price = Some(cost_price);
        self
    }

    /// 建構器模式：設置售價
    pub fn with_selling_price(mut self, selling_price: Decimal) -> Self {
        self.selling_price = Some(selling_price);
        self
    }

    /// 某入庫日的批次到期日
    pub fn expiry_for(&self, stock_date: NaiveDate) -> NaiveDate {
        crate::calendar::expiry_date(stock_date, self.shelf_life_days)
    }

    /// 實際售價
    pub fn unit_selling_price(&self) -> Decimal {
        self.selling_price.unwrap_or(self.price)
    }

    /// 檢查必填欄位
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(LedgerError::validation("物料 ID 不可為空"));
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("物料名稱不可為空"));
        }
        if self.category.trim().is_empty() {
            return Err(LedgerError::validation("物料分類不可為空"));
        }
        if self.price < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "物料 {} 的標價不可為負：{}",
                self.name, self.price
            )));
        }
        for (label, value) in [("成本價", self.cost_price), ("售價", self.selling_price)] {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                return Err(LedgerError::validation(format!(
                    "物料 {} 的{}不可為負",
                    self.name, label
                )));
            }
        }
        Ok(())
    }
}
