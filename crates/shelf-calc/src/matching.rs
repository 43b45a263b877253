//! FIFO 配對規則（即時扣減與歷史重建共用）

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use shelf_core::{calendar, Lot};

use crate::LotAllocation;

/// 配對槽：一個批次在配對過程中的狀態
#[derive(Debug, Clone)]
pub struct LotSlot {
    /// 批次ID
    pub lot_id: String,
    /// 入庫時刻
    pub stocked_at: NaiveDateTime,
    /// 插入序號
    pub sequence: u64,
    /// 可銷售截止時刻（到期日終）
    pub sellable_until: NaiveDateTime,
    /// 剩餘數量
    pub remaining: Decimal,
}

impl LotSlot {
    /// 由批次建立配對槽
    pub fn from_lot(lot: &Lot, shelf_life_days: u32, remaining: Decimal) -> Self {
        Self {
            lot_id: lot.id.clone(),
            stocked_at: lot.stocked_at(),
            sequence: lot.sequence,
            sellable_until: calendar::end_of_day(lot.expiry_date(shelf_life_days)),
            remaining,
        }
    }

    /// 銷售時刻是否落在 (入庫時刻, 到期日終]
    pub fn accepts(&self, sold_at: NaiveDateTime) -> bool {
        sold_at > self.stocked_at && sold_at <= self.sellable_until
    }
}

/// 單筆銷售的配對結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// 各批次扣減量（依 FIFO 順序）
    pub allocations: Vec<LotAllocation>,
    /// 無合格批次可承接的數量
    pub unmatched: Decimal,
}

impl MatchOutcome {
    /// 是否完全配對
    pub fn is_complete(&self) -> bool {
        self.unmatched <= Decimal::ZERO
    }

    /// 已配對總量
    pub fn matched(&self) -> Decimal {
        self.allocations.iter().map(|a| a.quantity).sum()
    }
}

/// FIFO 配對器
pub struct FifoMatcher;

impl FifoMatcher {
    /// 依入庫時刻排序，同時刻依插入序號（期初與收貨不分先後）
    ///
    /// 穩定排序：未編號的批次保持原本順序。
    pub fn order_slots(slots: &mut [LotSlot]) {
        slots.sort_by_key(|slot| (slot.stocked_at, slot.sequence));
    }

    /// 某時刻可供銷售的總量
    pub fn available_at(slots: &[LotSlot], sold_at: NaiveDateTime) -> Decimal {
        slots
            .iter()
            .filter(|slot| slot.accepts(sold_at))
            .map(|slot| slot.remaining.max(Decimal::ZERO))
            .sum()
    }

    /// 規劃配對，不修改任何槽
    ///
    /// `slots` 必須已經過 [`FifoMatcher::order_slots`] 排序。
    pub fn plan(slots: &[LotSlot], quantity: Decimal, sold_at: NaiveDateTime) -> MatchOutcome {
        let mut allocations = Vec::new();
        let mut remaining_qty = quantity;

        for slot in slots {
            if remaining_qty <= Decimal::ZERO {
                break;
            }
            if slot.remaining <= Decimal::ZERO || !slot.accepts(sold_at) {
                continue;
            }

            let take = slot.remaining.min(remaining_qty);
            allocations.push(LotAllocation::new(slot.lot_id.clone(), take));
            remaining_qty -= take;
        }

        MatchOutcome {
            allocations,
            unmatched: remaining_qty.max(Decimal::ZERO),
        }
    }

    /// 配對並扣減槽內剩餘量
    pub fn consume(slots: &mut [LotSlot], quantity: Decimal, sold_at: NaiveDateTime) -> MatchOutcome {
        let outcome = Self::plan(slots, quantity, sold_at);
        for allocation in &outcome.allocations {
            if let Some(slot) = slots.iter_mut().find(|s| s.lot_id == allocation.lot_id) {
                slot.remaining -= allocation.quantity;
            }
        }
        outcome
    }
}
