//! 到期日 GR 報表：指定到期日，列出所有物料中當天到期的批次及其未售量
//!
//! 與 [`crate::good_return`] 不同，這裡的已售量只計算該批次自身可銷售
//! 區間 (入庫時刻, 到期日終] 內的銷售，不做跨批次 FIFO 配對。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shelf_core::{Item, Lot, LotOrigin, Sale, StockDeduction};

use crate::matching::LotSlot;
use crate::reconstruction::received_quantities;

/// 報表明細
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryReportEntry {
    pub item_id: String,
    pub item_name: String,
    pub lot_id: String,
    pub origin: LotOrigin,
    pub stock_date: NaiveDate,
    pub shelf_life_days: u32,
    pub original_quantity: Decimal,
    pub sold_quantity: Decimal,
    pub gr_quantity: Decimal,
}

/// 到期日 GR 報表
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryReport {
    pub expiry_date: NaiveDate,
    /// 依物料名稱排序
    pub entries: Vec<ExpiryReportEntry>,
    pub total_gr: Decimal,
    /// 有 GR 的物料數
    pub items_with_gr: usize,
}

impl ExpiryReport {
    pub fn total_entries(&self) -> usize {
        self.entries.len()
    }
}

/// 到期日報表產生器
pub struct ExpiryReportBuilder;

impl ExpiryReportBuilder {
    /// 產生指定到期日的 GR 報表
    pub fn build(
        items: &[Item],
        lots: &[Lot],
        sales: &[Sale],
        deductions: &[StockDeduction],
        expiry_date: NaiveDate,
    ) -> ExpiryReport {
        let received = received_quantities(lots, deductions);
        let mut entries = Vec::new();

        for item in items {
            for lot in lots.iter().filter(|lot| lot.item_id == item.id) {
                if lot.expiry_date(item.shelf_life_days) != expiry_date {
                    continue;
                }

                let original = received.get(&lot.id).copied().unwrap_or(lot.quantity);
                let window = LotSlot::from_lot(lot, item.shelf_life_days, original);
                let sold: Decimal = sales
                    .iter()
                    .filter(|sale| sale.item_id == item.id && window.accepts(sale.date))
                    .map(|sale| sale.quantity)
                    .sum();

                let gr_quantity = original - sold;
                if gr_quantity <= Decimal::ZERO {
                    continue;
                }

                entries.push(ExpiryReportEntry {
                    item_id: item.id.clone(),
                    item_name: item.name.clone(),
                    lot_id: lot.id.clone(),
                    origin: lot.origin,
                    stock_date: lot.stock_date,
                    shelf_life_days: item.shelf_life_days,
                    original_quantity: original,
                    sold_quantity: sold,
                    gr_quantity,
                });
            }
        }

        entries.sort_by(|a, b| a.item_name.cmp(&b.item_name));

        let mut item_ids: Vec<&str> = entries.iter().map(|e| e.item_id.as_str()).collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        let report = ExpiryReport {
            expiry_date,
            total_gr: entries.iter().map(|e| e.gr_quantity).sum(),
            items_with_gr: item_ids.len(),
            entries,
        };

        tracing::debug!(
            "到期日 {} 報表：{} 筆明細，GR 共 {}",
            expiry_date,
            report.total_entries(),
            report.total_gr
        );

        report
    }
}
