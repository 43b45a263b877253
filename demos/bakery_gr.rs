//! 烘焙店 GR 計算示例

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shelf::{Adjustment, AdjustmentType, Item, Ledger, LedgerConfig, PaymentMode};

fn date(y: i32, m: u32, d: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).context("無效日期")
}

fn main() -> anyhow::Result<()> {
    shelf::logging::init();

    println!("=== 烘焙店 GR 計算示例 ===\n");

    // SHELF_CONFIG 指向 JSON 配置檔時使用該設定（可指定資料目錄）
    let config = match std::env::var("SHELF_CONFIG") {
        Ok(path) => LedgerConfig::from_json_file(&path).with_context(|| format!("讀取配置 {path}"))?,
        Err(_) => LedgerConfig::default(),
    };
    let ledger = Ledger::open(config)?;

    // 物料
    let bread = ledger.add_item(Item::new("Bread", "Bakery", Decimal::from(40), 3))?;
    let cake = ledger.add_item(
        Item::new("Cake", "Bakery", Decimal::from(300), 2).with_cost_price(Decimal::from(180)),
    )?;

    // 入庫
    ledger.record_opening_stock(&bread.id, Decimal::from(10), date(2024, 3, 1)?)?;
    ledger.record_receipt(&bread.id, Decimal::from(5), date(2024, 3, 2)?)?;
    ledger.record_receipt(&cake.id, Decimal::from(6), date(2024, 3, 1)?)?;

    // 銷售
    let morning = date(2024, 3, 3)?.and_hms_opt(10, 0, 0).context("無效時間")?;
    ledger.record_sale(&bread.id, Decimal::from(12), None, morning, PaymentMode::Upi)?;
    let noon = date(2024, 3, 2)?.and_hms_opt(12, 30, 0).context("無效時間")?;
    ledger.record_sale(&cake.id, Decimal::from(1), None, noon, PaymentMode::Cash)?;

    // 庫存調整
    ledger.record_adjustment(
        Adjustment::new(&cake.id, AdjustmentType::Decrease, Decimal::from(1), noon, "damaged")
            .with_notes("dropped during display"),
    )?;

    println!("目前庫存:");
    for item in ledger.items()? {
        println!("  - {}: {}", item.name, ledger.current_stock(&item.id)?);
    }

    let as_of = date(2024, 3, 5)?;
    let summary = ledger.good_return_all(as_of)?;
    println!("\n截至 {} 的 GR:", summary.as_of_date);
    for gr in &summary.results {
        println!("  {} 共 {}", gr.item_name, gr.total_gr);
        for detail in &gr.details {
            println!(
                "    批次 {} ({}): 入庫 {} / 到期 {}，原始 {}，已售 {}，剩餘 {}",
                detail.lot_id,
                detail.origin,
                detail.stock_date,
                detail.expiry_date,
                detail.original_quantity,
                detail.sold_quantity,
                detail.remaining_quantity
            );
        }
    }
    println!("  合計 {}", summary.total_gr);

    let report = ledger.expiry_report(date(2024, 3, 4)?)?;
    println!(
        "\n到期日 {} 報表：{} 筆，{} 個物料，GR {}",
        report.expiry_date,
        report.total_entries(),
        report.items_with_gr,
        report.total_gr
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
