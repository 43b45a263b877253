//! 退貨量（Good Return）計算：截至某日已過期但未售出的數量

use std::collections::HashMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use shelf_core::{calendar, Item, Lot, LotOrigin, Sale, StockDeduction};

use crate::reconstruction::{received_quantities, HistoricalReconstructor, Reconstruction};

/// GR 明細（單一批次）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodReturnDetail {
    pub lot_id: String,
    pub stock_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub original_quantity: Decimal,
    pub sold_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub origin: LotOrigin,
}

/// 單物料 GR 結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodReturn {
    pub item_id: String,
    pub item_name: String,
    pub as_of_date: NaiveDate,
    pub total_gr: Decimal,
    /// 依到期日由近到遠排列（最近到期者在前）
    pub details: Vec<GoodReturnDetail>,
}

/// 全物料 GR 匯總
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodReturnSummary {
    pub as_of_date: NaiveDate,
    /// 僅包含 GR > 0 的物料
    pub results: Vec<GoodReturn>,
    pub total_gr: Decimal,
}

/// GR 計算器
pub struct GoodReturnCalculator;

impl GoodReturnCalculator {
    /// 計算單一物料截至 `as_of` 的 GR
    pub fn calculate(
        item: &Item,
        lots: &[Lot],
        sales: &[Sale],
        deductions: &[StockDeduction],
        as_of: NaiveDate,
    ) -> GoodReturn {
        let received = received_quantities(lots, deductions);
        let reconstruction = HistoricalReconstructor::reconstruct(item, lots, sales, &received, as_of);
        Self::from_reconstruction(item, &reconstruction)
    }

    /// 由重建結果取出已過期且有剩餘的批次
    pub fn from_reconstruction(item: &Item, reconstruction: &Reconstruction) -> GoodReturn {
        let mut details: Vec<GoodReturnDetail> = reconstruction
            .balances
            .iter()
            .filter(|b| {
                calendar::is_expired_as_of(b.expiry_date, reconstruction.as_of)
                    && b.remaining_quantity > Decimal::ZERO
            })
            .map(|b| GoodReturnDetail {
                lot_id: b.lot.id.clone(),
                stock_date: b.lot.stock_date,
                expiry_date: b.expiry_date,
                original_quantity: b.original_quantity,
                sold_quantity: b.sold_quantity,
                remaining_quantity: b.remaining_quantity,
                origin: b.lot.origin,
            })
            .collect();

        details.sort_by(|a, b| b.expiry_date.cmp(&a.expiry_date));

        GoodReturn {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            as_of_date: reconstruction.as_of,
            total_gr: details.iter().map(|d| d.remaining_quantity).sum(),
            details,
        }
    }

    /// 計算所有物料的 GR
    ///
    /// 先按物料分組批次與銷售，`parallel` 為 true 時以 rayon 並行計算。
    pub fn calculate_all(
        items: &[Item],
        lots: &[Lot],
        sales: &[Sale],
        deductions: &[StockDeduction],
        as_of: NaiveDate,
        parallel: bool,
    ) -> GoodReturnSummary {
        tracing::info!(
            "開始 GR 計算：物料 {} 筆，批次 {} 筆，銷售 {} 筆，截止 {}",
            items.len(),
            lots.len(),
            sales.len(),
            as_of
        );
        let start_time = std::time::Instant::now();

        let received = received_quantities(lots, deductions);
        let grouped_lots = group_by_item(lots, |lot| &lot.item_id);
        let grouped_sales = group_by_item(sales, |sale| &sale.item_id);

        let compute = |item: &Item| {
            let item_lots = grouped_lots.get(item.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let item_sales = grouped_sales.get(item.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let reconstruction =
                HistoricalReconstructor::reconstruct(item, item_lots, item_sales, &received, as_of);
            Self::from_reconstruction(item, &reconstruction)
        };

        let results: Vec<GoodReturn> = if parallel {
            items
                .par_iter()
                .map(compute)
                .filter(|gr| gr.total_gr > Decimal::ZERO)
                .collect()
        } else {
            items
                .iter()
                .map(compute)
                .filter(|gr| gr.total_gr > Decimal::ZERO)
                .collect()
        };

        let total_gr = results.iter().map(|gr| gr.total_gr).sum();

        tracing::info!(
            "GR 計算完成，耗時 {:?}，{} 個物料有 GR，共 {}",
            start_time.elapsed(),
            results.len(),
            total_gr
        );

        GoodReturnSummary {
            as_of_date: as_of,
            results,
            total_gr,
        }
    }
}

/// 按物料分組（保持原始順序）
fn group_by_item<'a, T: Clone>(
    records: &'a [T],
    key: impl Fn(&'a T) -> &'a String,
) -> HashMap<&'a str, Vec<T>> {
    let mut grouped: HashMap<&'a str, Vec<T>> = HashMap::new();
    for record in records {
        grouped
            .entry(key(record).as_str())
            .or_insert_with(Vec::new)
            .push(record.clone());
    }
    grouped
}
