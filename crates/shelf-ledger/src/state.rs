//! 帳本狀態：全部集合的記憶體內容與記錄轉換

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shelf_core::{
    Adjustment, Item, LedgerError, Lot, LotOrigin, RecordKind, Result, Sale, StockDeduction,
};

use crate::store::{Collection, RecordStore};

/// 帳本狀態
///
/// `lots` 依插入序號保存，期初與收貨批次混在同一序列中。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerState {
    pub items: Vec<Item>,
    pub lots: Vec<Lot>,
    pub sales: Vec<Sale>,
    pub adjustments: Vec<Adjustment>,
    pub deductions: Vec<StockDeduction>,
}

impl LedgerState {
    /// 從儲存載入全部集合
    pub fn load(store: &dyn RecordStore) -> Result<Self> {
        let mut state = Self::default();
        for collection in Collection::ALL {
            let records = store.load(collection)?;
            state.replace(collection, records).map_err(|e| match e {
                LedgerError::ImportFormat(msg) => LedgerError::Storage(msg),
                other => other,
            })?;
        }

        tracing::info!(
            "帳本載入完成：物料 {}，批次 {}，銷售 {}，調整 {}",
            state.items.len(),
            state.lots.len(),
            state.sales.len(),
            state.adjustments.len()
        );
        Ok(state)
    }

    /// 將某集合轉為記錄
    pub fn records(&self, collection: Collection) -> Result<Vec<Value>> {
        match collection {
            Collection::Items => encode(collection, &self.items),
            Collection::OpeningStock => encode(collection, self.lots_of(LotOrigin::Opening)),
            Collection::ReceivingStock => encode(collection, self.lots_of(LotOrigin::Receiving)),
            Collection::Sales => encode(collection, &self.sales),
            Collection::StockAdjustments => encode(collection, &self.adjustments),
            Collection::SaleDeductions => encode(collection, &self.deductions),
        }
    }

    /// 以記錄整批取代某集合
    ///
    /// 任何一筆記錄格式錯誤或驗證失敗時回傳 `ImportFormat`，狀態不變。
    pub fn replace(&mut self, collection: Collection, records: Vec<Value>) -> Result<()> {
        match collection {
            Collection::Items => {
                let items: Vec<Item> = decode(collection, records)?;
                check_each(collection, &items, Item::validate)?;
                check_unique_ids(collection, items.iter().map(|i| i.id.as_str()))?;
                self.items = items;
            }
            Collection::OpeningStock | Collection::ReceivingStock => {
                let origin = if collection == Collection::OpeningStock {
                    LotOrigin::Opening
                } else {
                    LotOrigin::Receiving
                };
                let mut incoming: Vec<Lot> = decode(collection, records)?;
                for lot in &mut incoming {
                    lot.origin = origin;
                }
                check_each(collection, &incoming, Lot::validate)?;

                let kept: Vec<Lot> = self.lots.iter().filter(|l| l.origin != origin).cloned().collect();
                // 期初批次排在收貨批次之前，與載入順序一致
                let mut lots: Vec<Lot> = if origin == LotOrigin::Opening {
                    incoming.into_iter().chain(kept).collect()
                } else {
                    kept.into_iter().chain(incoming).collect()
                };
                lots.sort_by_key(|lot| lot.sequence);
                check_unique_ids(collection, lots.iter().map(|l| l.id.as_str()))?;
                self.lots = lots;
            }
            Collection::Sales => {
                let sales: Vec<Sale> = decode(collection, records)?;
                check_each(collection, &sales, Sale::validate)?;
                check_unique_ids(collection, sales.iter().map(|s| s.id.as_str()))?;
                self.sales = sales;

                // 追溯記錄只屬於仍存在的銷售
                let before = self.deductions.len();
                let sales = &self.sales;
                self.deductions
                    .retain(|d| sales.iter().any(|sale| sale.id == d.sale_id));
                if self.deductions.len() < before {
                    tracing::warn!(
                        "{collection} 取代後移除 {} 筆無對應銷售的扣減記錄",
                        before - self.deductions.len()
                    );
                }
            }
            Collection::StockAdjustments => {
                let adjustments: Vec<Adjustment> = decode(collection, records)?;
                check_each(collection, &adjustments, Adjustment::validate)?;
                check_unique_ids(collection, adjustments.iter().map(|a| a.id.as_str()))?;
                self.adjustments = adjustments;
            }
            Collection::SaleDeductions => {
                let deductions: Vec<StockDeduction> = decode(collection, records)?;
                if let Some(bad) = deductions.iter().find(|d| d.quantity <= Decimal::ZERO) {
                    return Err(LedgerError::ImportFormat(format!(
                        "{collection}: 銷售 {} 的扣減數量必須大於 0",
                        bad.sale_id
                    )));
                }
                // 批次可能已被刪除而等待還原，只要求銷售存在
                if let Some(orphan) = deductions
                    .iter()
                    .find(|d| !self.sales.iter().any(|sale| sale.id == d.sale_id))
                {
                    return Err(LedgerError::ImportFormat(format!(
                        "{collection}: 扣減記錄指向不存在的銷售 {}",
                        orphan.sale_id
                    )));
                }
                self.deductions = deductions;
            }
        }
        Ok(())
    }

    pub fn item(&self, item_id: &str) -> Result<&Item> {
        self.items
            .iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| LedgerError::not_found(RecordKind::Item, item_id))
    }

    pub fn lot_index(&self, lot_id: &str) -> Result<usize> {
        self.lots
            .iter()
            .position(|lot| lot.id == lot_id)
            .ok_or_else(|| LedgerError::not_found(RecordKind::Lot, lot_id))
    }

    pub fn sale_index(&self, sale_id: &str) -> Result<usize> {
        self.sales
            .iter()
            .position(|sale| sale.id == sale_id)
            .ok_or_else(|| LedgerError::not_found(RecordKind::Sale, sale_id))
    }

    /// 放入批次並維持插入序號順序
    ///
    /// 未編號的新批次取得下一個序號；還原的批次保留原序號並回到原位置。
    pub fn insert_lot(&mut self, mut lot: Lot) -> Lot {
        if lot.sequence == 0 {
            lot.sequence = self.lots.iter().map(|l| l.sequence).max().unwrap_or(0) + 1;
        }
        let position = self.lots.partition_point(|l| l.sequence <= lot.sequence);
        self.lots.insert(position, lot.clone());
        lot
    }

    /// 目前庫存 = 批次目前數量合計 + 調整淨額
    pub fn current_stock(&self, item_id: &str) -> Decimal {
        let lots: Decimal = self
            .lots
            .iter()
            .filter(|lot| lot.item_id == item_id)
            .map(|lot| lot.quantity)
            .sum();
        let adjustments: Decimal = self
            .adjustments
            .iter()
            .filter(|adj| adj.item_id == item_id)
            .map(Adjustment::signed_quantity)
            .sum();
        lots + adjustments
    }

    /// 追溯記錄中從某批次扣減的總量
    pub fn traced_from_lot(&self, lot_id: &str) -> Decimal {
        self.deductions
            .iter()
            .filter(|d| d.lot_id == lot_id)
            .map(|d| d.quantity)
            .sum()
    }

    /// 物料是否仍被批次、銷售或調整引用
    pub fn is_item_referenced(&self, item_id: &str) -> bool {
        self.lots.iter().any(|l| l.item_id == item_id)
            || self.sales.iter().any(|s| s.item_id == item_id)
            || self.adjustments.iter().any(|a| a.item_id == item_id)
    }

    fn lots_of(&self, origin: LotOrigin) -> Vec<&Lot> {
        self.lots.iter().filter(|lot| lot.origin == origin).collect()
    }
}

fn encode<T: Serialize>(collection: Collection, records: impl IntoIterator<Item = T>) -> Result<Vec<Value>> {
    records
        .into_iter()
        .map(|record| {
            serde_json::to_value(record)
                .map_err(|e| LedgerError::Storage(format!("無法序列化 {collection}: {e}")))
        })
        .collect()
}

fn decode<T: DeserializeOwned>(collection: Collection, records: Vec<Value>) -> Result<Vec<T>> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).map_err(|e| {
                LedgerError::ImportFormat(format!("{collection} 第 {} 筆記錄格式錯誤: {e}", index + 1))
            })
        })
        .collect()
}

fn check_each<T>(collection: Collection, records: &[T], validate: impl Fn(&T) -> Result<()>) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        validate(record).map_err(|e| {
            LedgerError::ImportFormat(format!("{collection} 第 {} 筆記錄無效: {e}", index + 1))
        })?;
    }
    Ok(())
}

fn check_unique_ids<'a>(collection: Collection, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(LedgerError::ImportFormat(format!("{collection} 有重複的 ID: {id}")));
        }
    }
    Ok(())
}
