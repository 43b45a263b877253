//! 即時扣減：記錄銷售時依 FIFO 規則直接扣減批次數量

use shelf_core::{Item, LedgerError, Lot, Sale, StockDeduction};

use crate::matching::{FifoMatcher, LotSlot};

/// 即時扣減計算器
pub struct LiveConsumption;

impl LiveConsumption {
    /// 為一筆銷售扣減批次，回傳扣減追溯記錄
    ///
    /// 扣減不足時整筆拒絕，任何批次都不會被修改。
    ///
    /// # 參數
    /// * `lots` - 全部批次（依插入順序）
    /// * `reject_before_stock` - 銷售早於該物料所有批次時是否回傳驗證錯誤
    pub fn deduct(
        lots: &mut [Lot],
        item: &Item,
        sale: &Sale,
        reject_before_stock: bool,
    ) -> shelf_core::Result<Vec<StockDeduction>> {
        let mut slots: Vec<LotSlot> = lots
            .iter()
            .filter(|lot| lot.item_id == item.id)
            .map(|lot| LotSlot::from_lot(lot, item.shelf_life_days, lot.quantity))
            .collect();
        FifoMatcher::order_slots(&mut slots);

        let predates_all_stock =
            !slots.is_empty() && slots.iter().all(|slot| sale.date <= slot.stocked_at);
        if predates_all_stock && reject_before_stock {
            return Err(LedgerError::validation(format!(
                "銷售時間 {} 早於物料 {} 的所有入庫批次",
                sale.date, item.name
            )));
        }

        let outcome = FifoMatcher::plan(&slots, sale.quantity, sale.date);
        if !outcome.is_complete() {
            let available = FifoMatcher::available_at(&slots, sale.date);
            tracing::debug!(
                "物料 {} 庫存不足：需要 {}, 可用 {}",
                item.id,
                sale.quantity,
                available
            );
            return Err(LedgerError::InsufficientStock {
                item_id: item.id.clone(),
                requested: sale.quantity,
                available,
            });
        }

        let mut deductions = Vec::with_capacity(outcome.allocations.len());
        for allocation in outcome.allocations {
            if let Some(lot) = lots.iter_mut().find(|lot| lot.id == allocation.lot_id) {
                lot.quantity -= allocation.quantity;
            }
            deductions.push(StockDeduction::new(
                sale.id.clone(),
                allocation.lot_id,
                allocation.quantity,
            ));
        }

        tracing::debug!(
            "銷售 {} 扣減 {} 個批次，共 {}",
            sale.id,
            deductions.len(),
            sale.quantity
        );

        Ok(deductions)
    }

    /// 依追溯記錄退回數量到原批次
    ///
    /// 任何追溯批次已被刪除時整筆拒絕，批次不變；還原該批次後才能退回。
    pub fn reverse(lots: &mut [Lot], trace: &[StockDeduction]) -> shelf_core::Result<()> {
        if let Some(missing) = trace
            .iter()
            .find(|d| !lots.iter().any(|lot| lot.id == d.lot_id))
        {
            return Err(LedgerError::validation(format!(
                "批次 {} 已被刪除，請先還原再退回銷售 {}",
                missing.lot_id, missing.sale_id
            )));
        }

        for deduction in trace {
            if let Some(lot) = lots.iter_mut().find(|lot| lot.id == deduction.lot_id) {
                lot.quantity += deduction.quantity;
            }
        }
        Ok(())
    }
}
