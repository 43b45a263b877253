//! 庫存狀態：截至某日各批次的剩餘量與狀態（可銷售、已過期、已售完）

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shelf_core::{calendar, Adjustment, Item, Lot, LotOrigin, Sale, StockDeduction};

use crate::reconstruction::{received_quantities, HistoricalReconstructor};
use crate::ReconciliationWarning;

/// 批次狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    Sellable,
    Expired,
    Depleted,
}

/// 單一批次的狀態
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotPosition {
    pub lot_id: String,
    pub origin: LotOrigin,
    pub stock_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub status: LotStatus,
}

/// 單物料庫存狀態
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPosition {
    pub item_id: String,
    pub as_of_date: NaiveDate,
    pub lots: Vec<LotPosition>,
    /// 可銷售批次剩餘量
    pub sellable: Decimal,
    /// 已過期未售（與 GR 相同，到期日當天日終即視為過期）
    pub expired: Decimal,
    /// 截至當日的調整淨額
    pub net_adjustment: Decimal,
    #[serde(skip)]
    pub warnings: Vec<ReconciliationWarning>,
}

impl StockPosition {
    /// 帳面庫存 = 全部批次剩餘 + 調整淨額
    pub fn book_quantity(&self) -> Decimal {
        self.sellable + self.expired + self.net_adjustment
    }
}

/// 庫存狀態計算器
pub struct StockPositionCalculator;

impl StockPositionCalculator {
    pub fn calculate(
        item: &Item,
        lots: &[Lot],
        sales: &[Sale],
        deductions: &[StockDeduction],
        adjustments: &[Adjustment],
        as_of: NaiveDate,
    ) -> StockPosition {
        let received = received_quantities(lots, deductions);
        let reconstruction = HistoricalReconstructor::reconstruct(item, lots, sales, &received, as_of);

        let positions: Vec<LotPosition> = reconstruction
            .balances
            .iter()
            .map(|b| {
                let status = if b.remaining_quantity <= Decimal::ZERO {
                    LotStatus::Depleted
                } else if calendar::is_expired_as_of(b.expiry_date, as_of) {
                    LotStatus::Expired
                } else {
                    LotStatus::Sellable
                };
                LotPosition {
                    lot_id: b.lot.id.clone(),
                    origin: b.lot.origin,
                    stock_date: b.lot.stock_date,
                    expiry_date: b.expiry_date,
                    original_quantity: b.original_quantity,
                    remaining_quantity: b.remaining_quantity,
                    status,
                }
            })
            .collect();

        let sum_of = |status: LotStatus| -> Decimal {
            positions
                .iter()
                .filter(|p| p.status == status)
                .map(|p| p.remaining_quantity)
                .sum()
        };

        let cutoff = calendar::end_of_day(as_of);
        let net_adjustment = adjustments
            .iter()
            .filter(|a| a.item_id == item.id && a.date <= cutoff)
            .map(Adjustment::signed_quantity)
            .sum();

        StockPosition {
            item_id: item.id.clone(),
            as_of_date: as_of,
            sellable: sum_of(LotStatus::Sellable),
            expired: sum_of(LotStatus::Expired),
            net_adjustment,
            warnings: reconstruction.warnings(),
            lots: positions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelf_core::{AdjustmentType, PaymentMode};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bread() -> Item {
        Item::new("Bread", "Bakery", Decimal::from(40), 3).with_id("BREAD")
    }

    fn scenario() -> (Vec<Lot>, Vec<Sale>) {
        let lots = vec![
            Lot::opening("BREAD", Decimal::from(10), date(2024, 3, 1)).with_id("OPEN"),
            Lot::receiving("BREAD", Decimal::from(5), date(2024, 3, 2)).with_id("RECV"),
        ];
        let sales = vec![Sale::new(
            "BREAD",
            Decimal::from(12),
            Decimal::from(40),
            date(2024, 3, 3).and_hms_opt(10, 0, 0).unwrap(),
            PaymentMode::Cash,
        )];
        (lots, sales)
    }

    #[rstest]
    #[case(date(2024, 3, 2), LotStatus::Sellable, LotStatus::Sellable, 15, 0)]
    #[case(date(2024, 3, 4), LotStatus::Depleted, LotStatus::Sellable, 3, 0)]
    #[case(date(2024, 3, 5), LotStatus::Depleted, LotStatus::Expired, 0, 3)]
    #[case(date(2024, 3, 6), LotStatus::Depleted, LotStatus::Expired, 0, 3)]
    fn test_status_by_as_of(
        #[case] as_of: NaiveDate,
        #[case] open_status: LotStatus,
        #[case] recv_status: LotStatus,
        #[case] sellable: i64,
        #[case] expired: i64,
    ) {
        let (lots, sales) = scenario();

        let position = StockPositionCalculator::calculate(&bread(), &lots, &sales, &[], &[], as_of);

        assert_eq!(position.lots[0].status, open_status);
        assert_eq!(position.lots[1].status, recv_status);
        assert_eq!(position.sellable, Decimal::from(sellable));
        assert_eq!(position.expired, Decimal::from(expired));
    }

    #[test]
    fn test_net_adjustment_up_to_cutoff() {
        let (lots, sales) = scenario();
        let adjustments = vec![
            Adjustment::new(
                "BREAD",
                AdjustmentType::Decrease,
                Decimal::from(1),
                date(2024, 3, 3).and_hms_opt(18, 0, 0).unwrap(),
                "damaged",
            ),
            Adjustment::new(
                "BREAD",
                AdjustmentType::Increase,
                Decimal::from(4),
                date(2024, 3, 9).and_hms_opt(9, 0, 0).unwrap(),
                "recount",
            ),
        ];

        let position =
            StockPositionCalculator::calculate(&bread(), &lots, &sales, &[], &adjustments, date(2024, 3, 4));

        assert_eq!(position.net_adjustment, Decimal::from(-1));
        assert_eq!(position.book_quantity(), Decimal::from(2));
        assert!(position.warnings.is_empty());
    }
}
