//! 歷史重建：不修改任何資料，從完整銷售歷史推算截至某日的批次剩餘量

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shelf_core::{calendar, Item, Lot, Sale, StockDeduction};

use crate::matching::{FifoMatcher, LotSlot};
use crate::{LotAllocation, ReconciliationWarning};

/// 批次截至某日的結存
#[derive(Debug, Clone, PartialEq)]
pub struct LotBalance {
    /// 批次（`quantity` 為原始入庫量）
    pub lot: Lot,
    /// 到期日
    pub expiry_date: NaiveDate,
    /// 原始入庫量
    pub original_quantity: Decimal,
    /// 已銷售量
    pub sold_quantity: Decimal,
    /// 剩餘量
    pub remaining_quantity: Decimal,
}

/// 單筆銷售的重建配對
#[derive(Debug, Clone, PartialEq)]
pub struct SaleMatch {
    pub sale_id: String,
    /// 銷售數量
    pub quantity: Decimal,
    pub allocations: Vec<LotAllocation>,
    pub unmatched: Decimal,
}

/// 單物料重建結果
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub item_id: String,
    pub as_of: NaiveDate,
    /// 依 FIFO 順序排列的批次結存
    pub balances: Vec<LotBalance>,
    /// 依銷售時間排列的配對
    pub matches: Vec<SaleMatch>,
}

impl Reconstruction {
    /// 無法配對到合格批次的總量
    pub fn unmatched_total(&self) -> Decimal {
        self.matches.iter().map(|m| m.unmatched).sum()
    }

    /// 某批次的結存
    pub fn balance(&self, lot_id: &str) -> Option<&LotBalance> {
        self.balances.iter().find(|b| b.lot.id == lot_id)
    }

    /// 對帳警告（歷史銷售超出合格庫存）
    pub fn warnings(&self) -> Vec<ReconciliationWarning> {
        self.matches
            .iter()
            .filter(|m| m.unmatched > Decimal::ZERO)
            .map(|m| {
                ReconciliationWarning::new(
                    self.item_id.clone(),
                    m.sale_id.clone(),
                    m.unmatched,
                    m.quantity,
                )
            })
            .collect()
    }
}

/// 原始入庫量 = 目前數量 + 追溯記錄中從該批次扣減的總量
pub fn received_quantities(lots: &[Lot], deductions: &[StockDeduction]) -> HashMap<String, Decimal> {
    let mut received: HashMap<String, Decimal> = lots
        .iter()
        .map(|lot| (lot.id.clone(), lot.quantity))
        .collect();

    for deduction in deductions {
        if let Some(qty) = received.get_mut(&deduction.lot_id) {
            *qty += deduction.quantity;
        }
    }

    received
}

/// 歷史重建計算器
pub struct HistoricalReconstructor;

impl HistoricalReconstructor {
    /// 重建單一物料截至 `as_of` 日終的批次結存
    ///
    /// # 參數
    /// * `received` - 各批次原始入庫量（見 [`received_quantities`]），缺少時使用批次目前數量
    pub fn reconstruct(
        item: &Item,
        lots: &[Lot],
        sales: &[Sale],
        received: &HashMap<String, Decimal>,
        as_of: NaiveDate,
    ) -> Reconstruction {
        let cutoff = calendar::end_of_day(as_of);

        let mut item_lots: Vec<Lot> = lots
            .iter()
            .filter(|lot| lot.item_id == item.id && lot.stock_date <= as_of)
            .map(|lot| {
                let mut original = lot.clone();
                original.quantity = received.get(&lot.id).copied().unwrap_or(lot.quantity);
                original
            })
            .collect();
        item_lots.sort_by_key(|lot| (lot.stock_date, lot.sequence));

        let mut slots: Vec<LotSlot> = item_lots
            .iter()
            .map(|lot| LotSlot::from_lot(lot, item.shelf_life_days, lot.quantity))
            .collect();

        let mut item_sales: Vec<&Sale> = sales
            .iter()
            .filter(|sale| sale.item_id == item.id && sale.date <= cutoff)
            .collect();
        item_sales.sort_by_key(|sale| sale.date);

        let matches: Vec<SaleMatch> = item_sales
            .iter()
            .map(|sale| {
                let outcome = FifoMatcher::consume(&mut slots, sale.quantity, sale.date);
                SaleMatch {
                    sale_id: sale.id.clone(),
                    quantity: sale.quantity,
                    allocations: outcome.allocations,
                    unmatched: outcome.unmatched,
                }
            })
            .collect();

        let balances: Vec<LotBalance> = item_lots
            .into_iter()
            .zip(slots)
            .map(|(lot, slot)| LotBalance {
                expiry_date: lot.expiry_date(item.shelf_life_days),
                original_quantity: lot.quantity,
                sold_quantity: lot.quantity - slot.remaining,
                remaining_quantity: slot.remaining,
                lot,
            })
            .collect();

        let reconstruction = Reconstruction {
            item_id: item.id.clone(),
            as_of,
            balances,
            matches,
        };

        let unmatched = reconstruction.unmatched_total();
        if unmatched > Decimal::ZERO {
            tracing::warn!(
                "物料 {} 截至 {} 有 {} 的銷售無合格批次可配對",
                item.id,
                as_of,
                unmatched
            );
        }

        reconstruction
    }
}
