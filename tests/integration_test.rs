//! 集成測試

use std::sync::Arc;
use std::thread;

use chrono::{NaiveDate, NaiveDateTime};
use rstest::rstest;
use rust_decimal::Decimal;
use shelf::{
    Adjustment, AdjustmentType, Collection, Item, JsonDirStore, Ledger, LedgerConfig, LedgerError,
    Lot, LotStatus, PaymentMode,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(d: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
    d.and_hms_opt(h, min, 0).unwrap()
}

fn bakery() -> Ledger {
    shelf::logging::init_test();

    let ledger = Ledger::in_memory();
    ledger
        .add_item(Item::new("Bread", "Bakery", Decimal::from(40), 3).with_id("BREAD"))
        .unwrap();
    ledger
        .record_opening_stock("BREAD", Decimal::from(10), date(2024, 3, 1))
        .unwrap();
    ledger
        .record_receipt("BREAD", Decimal::from(5), date(2024, 3, 2))
        .unwrap();
    ledger
}

#[test]
fn test_bread_scenario_end_to_end() {
    // 場景：Bread 保存 3 天，期初 10（3/1），收貨 5（3/2），3/3 售出 12
    let ledger = bakery();

    ledger
        .record_sale(
            "BREAD",
            Decimal::from(12),
            None,
            at(date(2024, 3, 3), 10, 0),
            PaymentMode::Upi,
        )
        .unwrap();

    let position = ledger.stock_position("BREAD", date(2024, 3, 3)).unwrap();
    assert_eq!(position.lots[0].remaining_quantity, Decimal::ZERO);
    assert_eq!(position.lots[0].status, LotStatus::Depleted);
    assert_eq!(position.lots[1].remaining_quantity, Decimal::from(3));

    let gr = ledger.good_return("BREAD", date(2024, 3, 5)).unwrap();
    assert_eq!(gr.total_gr, Decimal::from(3));
    assert_eq!(gr.details.len(), 1);
    assert_eq!(gr.details[0].expiry_date, date(2024, 3, 5));
}

#[test]
fn test_fifo_order_across_origins() {
    let ledger = Ledger::in_memory();
    ledger
        .add_item(Item::new("Milk", "Dairy", Decimal::from(30), 10).with_id("MILK"))
        .unwrap();
    // 插入順序與日期順序不同
    let d3 = ledger.record_receipt("MILK", Decimal::from(4), date(2024, 5, 3)).unwrap();
    let d1 = ledger.record_opening_stock("MILK", Decimal::from(4), date(2024, 5, 1)).unwrap();
    let d2 = ledger.record_receipt("MILK", Decimal::from(4), date(2024, 5, 2)).unwrap();

    ledger
        .record_sale("MILK", Decimal::from(6), None, at(date(2024, 5, 4), 9, 0), PaymentMode::Cash)
        .unwrap();

    let remaining = |id: &str| {
        ledger
            .list_lots("MILK", None)
            .unwrap()
            .into_iter()
            .find(|lot| lot.id == id)
            .map(|lot| lot.quantity)
            .unwrap()
    };
    assert_eq!(remaining(&d1.id), Decimal::ZERO);
    assert_eq!(remaining(&d2.id), Decimal::from(2));
    assert_eq!(remaining(&d3.id), Decimal::from(4));
}

#[rstest]
#[case(at(date(2024, 1, 6), 23, 0), true)]
#[case(at(date(2024, 1, 7), 0, 0), false)]
fn test_expiry_boundary(#[case] sold_at: NaiveDateTime, #[case] accepted: bool) {
    let ledger = Ledger::in_memory();
    ledger
        .add_item(Item::new("Bun", "Bakery", Decimal::from(10), 5).with_id("BUN"))
        .unwrap();
    ledger
        .add_lot(Lot::opening("BUN", Decimal::from(10), date(2024, 1, 1)))
        .unwrap();

    let result = ledger.record_sale("BUN", Decimal::ONE, None, sold_at, PaymentMode::Cash);

    assert_eq!(result.is_ok(), accepted);
    if !accepted {
        assert!(matches!(result, Err(LedgerError::InsufficientStock { .. })));
    }
}

#[test]
fn test_sale_before_any_stock() {
    let ledger = bakery();
    let early = at(date(2024, 2, 20), 9, 0);

    let strict = ledger.record_sale("BREAD", Decimal::ONE, None, early, PaymentMode::Cash);
    assert!(matches!(strict, Err(LedgerError::Validation(_))));

    let lenient = bakery().with_config(LedgerConfig::new().with_reject_sales_before_stock(false));
    let result = lenient.record_sale("BREAD", Decimal::ONE, None, early, PaymentMode::Cash);
    assert!(matches!(result, Err(LedgerError::InsufficientStock { .. })));
}

#[test]
fn test_insufficient_stock_atomicity() {
    let ledger = Ledger::in_memory();
    ledger
        .add_item(Item::new("Cake", "Bakery", Decimal::from(300), 2).with_id("CAKE"))
        .unwrap();
    ledger.record_receipt("CAKE", Decimal::from(6), date(2024, 3, 1)).unwrap();
    ledger.record_receipt("CAKE", Decimal::from(4), date(2024, 3, 2)).unwrap();
    let before = ledger.snapshot().unwrap();

    let err = ledger
        .record_sale("CAKE", Decimal::from(15), None, at(date(2024, 3, 2), 12, 0), PaymentMode::Cash)
        .unwrap_err();

    assert_eq!(
        err,
        LedgerError::InsufficientStock {
            item_id: "CAKE".to_string(),
            requested: Decimal::from(15),
            available: Decimal::from(10),
        }
    );
    assert_eq!(ledger.snapshot().unwrap(), before);
}

#[test]
fn test_adjustment_guard() {
    let ledger = Ledger::in_memory();
    ledger
        .add_item(Item::new("Rusk", "Dry", Decimal::from(20), 90).with_id("RUSK"))
        .unwrap();
    ledger.record_receipt("RUSK", Decimal::from(12), date(2024, 3, 1)).unwrap();

    let result = ledger.record_adjustment(Adjustment::new(
        "RUSK",
        AdjustmentType::Decrease,
        Decimal::from(20),
        at(date(2024, 3, 2), 9, 0),
        "expired pack",
    ));

    assert!(matches!(result, Err(LedgerError::InsufficientStock { .. })));
    assert_eq!(ledger.current_stock("RUSK").unwrap(), Decimal::from(12));
    assert!(ledger.adjustments("RUSK").unwrap().is_empty());
}

#[test]
fn test_json_store_persists_and_reloads() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = LedgerConfig::new().with_store_dir(dir.path());

    let sale_id = {
        let ledger = Ledger::open(config.clone())?;
        ledger.add_item(Item::new("Bread", "Bakery", Decimal::from(40), 3).with_id("BREAD"))?;
        ledger.record_opening_stock("BREAD", Decimal::from(10), date(2024, 3, 1))?;
        ledger.record_receipt("BREAD", Decimal::from(5), date(2024, 3, 2))?;
        ledger
            .record_sale("BREAD", Decimal::from(12), None, at(date(2024, 3, 3), 10, 0), PaymentMode::Cash)?
            .id
    };

    for name in ["items", "openingStock", "receivingStock", "sales", "saleDeductions"] {
        assert!(dir.path().join(format!("{name}.json")).exists(), "missing {name}.json");
    }
    // 沒有調整記錄時不寫入
    assert!(!dir.path().join("stockAdjustments.json").exists());

    let reopened = Ledger::open(config)?;
    assert_eq!(reopened.current_stock("BREAD")?, Decimal::from(3));
    assert_eq!(reopened.good_return("BREAD", date(2024, 3, 5))?.total_gr, Decimal::from(3));

    // 追溯記錄也被保存，刪除銷售可精確退回
    reopened.delete_sale(&sale_id)?;
    assert_eq!(reopened.current_stock("BREAD")?, Decimal::from(15));

    // 外部修改檔案後重新載入
    let store = JsonDirStore::new(dir.path());
    shelf::RecordStore::save(&store, Collection::Sales, &[])?;
    reopened.reload()?;
    assert!(reopened.sales_on(date(2024, 3, 3))?.is_empty());
    Ok(())
}

#[test]
fn test_import_legacy_records() {
    let ledger = Ledger::in_memory();
    ledger
        .import_collection(
            Collection::Items,
            r#"[{"id": "1700000000000", "name": "Bread", "category": "Bakery",
                 "price": 40, "shelfLife": 3, "costPrice": 25}]"#,
        )
        .unwrap();
    ledger
        .import_collection(
            Collection::OpeningStock,
            r#"[{"id": "1700000000001", "itemId": "1700000000000", "quantity": 10, "date": "2024-03-01"}]"#,
        )
        .unwrap();
    ledger
        .import_collection(
            Collection::ReceivingStock,
            r#"[{"id": "1700000000002", "itemId": "1700000000000", "quantity": 5, "date": "2024-03-02"}]"#,
        )
        .unwrap();
    ledger
        .import_collection(
            Collection::Sales,
            r#"[{"id": "1700000000003", "itemId": "1700000000000", "quantity": 12, "price": 40,
                 "date": "2024-03-03T04:30:00.000Z", "paymentMode": "cash"}]"#,
        )
        .unwrap();

    let gr = ledger.good_return("1700000000000", date(2024, 3, 5)).unwrap();
    assert_eq!(gr.total_gr, Decimal::from(3));

    let err = ledger
        .import_collection(Collection::Sales, r#"{"sales": []}"#)
        .unwrap_err();
    assert!(matches!(err, LedgerError::ImportFormat(_)));
    assert_eq!(ledger.sales_on(date(2024, 3, 3)).unwrap().len(), 1);
}

#[test]
fn test_expiry_report_and_all_items_gr() {
    let ledger = bakery();
    ledger
        .add_item(Item::new("Muffin", "Bakery", Decimal::from(30), 3).with_id("MUF"))
        .unwrap();
    ledger.record_receipt("MUF", Decimal::from(8), date(2024, 3, 1)).unwrap();
    ledger
        .record_sale("MUF", Decimal::from(2), None, at(date(2024, 3, 2), 11, 0), PaymentMode::Upi)
        .unwrap();

    // Bread 期初批次與 Muffin 收貨批次同在 3/4 到期
    let report = ledger.expiry_report(date(2024, 3, 4)).unwrap();
    let names: Vec<_> = report.entries.iter().map(|e| e.item_name.as_str()).collect();
    assert_eq!(names, vec!["Bread", "Muffin"]);
    assert_eq!(report.total_gr, Decimal::from(16));
    assert_eq!(report.items_with_gr, 2);

    let summary = ledger.good_return_all(date(2024, 3, 5)).unwrap();
    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.total_gr, Decimal::from(21));
}

#[test]
fn test_concurrent_reads_during_writes() {
    let ledger = Arc::new(bakery());

    let writer = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            for minute in 0..10 {
                ledger
                    .record_sale(
                        "BREAD",
                        Decimal::ONE,
                        None,
                        at(date(2024, 3, 3), 8, minute),
                        PaymentMode::Cash,
                    )
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for _ in 0..20 {
                    // 每次讀取都應看到一致的快照：批次剩餘 + 已售 = 15
                    let snapshot = ledger.snapshot().unwrap();
                    let on_hand: Decimal = snapshot.lots.iter().map(|l| l.quantity).sum();
                    let sold: Decimal = snapshot.sales.iter().map(|s| s.quantity).sum();
                    assert_eq!(on_hand + sold, Decimal::from(15));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(ledger.current_stock("BREAD").unwrap(), Decimal::from(5));
}
