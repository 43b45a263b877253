//! 帳本服務：擁有全部集合，提供命令與查詢介面
//!
//! 命令取得寫鎖後在工作副本上修改，儲存成功才提交；查詢取得讀鎖，
//! 可同時進行且看到一致的快照。

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use shelf_calc::{
    ExpiryReport, ExpiryReportBuilder, GoodReturn, GoodReturnCalculator, GoodReturnSummary,
    HistoricalReconstructor, LiveConsumption, ReconciliationWarning, StockPosition,
    StockPositionCalculator,
};
use shelf_core::{
    Adjustment, AdjustmentType, Item, LedgerConfig, LedgerError, Lot, LotOrigin, PaymentMode,
    RecordKind, Result, Sale,
};

use crate::dirty_tracking::DirtyTracker;
use crate::import;
use crate::state::LedgerState;
use crate::store::{Collection, JsonDirStore, MemoryStore, RecordStore};

/// 批次來源對應的集合
fn lot_collection(origin: LotOrigin) -> Collection {
    match origin {
        LotOrigin::Opening => Collection::OpeningStock,
        LotOrigin::Receiving => Collection::ReceivingStock,
    }
}

/// 庫存帳本
pub struct Ledger {
    config: LedgerConfig,
    store: Box<dyn RecordStore>,
    state: RwLock<LedgerState>,
}

impl Ledger {
    /// 以指定儲存建立帳本並載入全部集合
    pub fn new(config: LedgerConfig, store: impl RecordStore + 'static) -> Result<Self> {
        let state = LedgerState::load(&store)?;
        Ok(Self {
            config,
            store: Box::new(store),
            state: RwLock::new(state),
        })
    }

    /// 依配置開啟帳本：設定 `store_dir` 時使用 JSON 目錄，否則使用記憶體
    pub fn open(config: LedgerConfig) -> Result<Self> {
        match config.store_dir.clone() {
            Some(dir) => {
                tracing::info!("開啟 JSON 帳本: {}", dir.display());
                Self::new(config, JsonDirStore::new(dir))
            }
            None => Self::new(config, MemoryStore::new()),
        }
    }

    /// 空白的記憶體帳本
    pub fn in_memory() -> Self {
        Self {
            config: LedgerConfig::default(),
            store: Box::new(MemoryStore::new()),
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// 建構器模式：替換配置（不重新載入資料）
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// 從儲存重新載入全部集合
    pub fn reload(&self) -> Result<()> {
        let fresh = LedgerState::load(self.store.as_ref())?;
        *self.write_state()? = fresh;
        Ok(())
    }

    /// 目前狀態的一致快照
    pub fn snapshot(&self) -> Result<LedgerState> {
        Ok(self.read_state()?.clone())
    }

    // ---------------------------------------------------------------
    // 物料
    // ---------------------------------------------------------------

    pub fn add_item(&self, item: Item) -> Result<Item> {
        item.validate()?;
        self.mutate(|state, dirty| {
            if state.items.iter().any(|i| i.id == item.id) {
                return Err(LedgerError::validation(format!("物料 ID 已存在: {}", item.id)));
            }
            state.items.push(item.clone());
            dirty.mark_dirty(Collection::Items);
            tracing::info!("新增物料 {} ({})", item.name, item.id);
            Ok(item)
        })
    }

    pub fn update_item(&self, item: Item) -> Result<Item> {
        item.validate()?;
        self.mutate(|state, dirty| {
            let existing = state
                .items
                .iter_mut()
                .find(|i| i.id == item.id)
                .ok_or_else(|| LedgerError::not_found(RecordKind::Item, &item.id))?;
            *existing = item.clone();
            dirty.mark_dirty(Collection::Items);
            tracing::info!("更新物料 {} ({})", item.name, item.id);
            Ok(item)
        })
    }

    /// 刪除物料（仍被批次、銷售或調整引用時拒絕）
    pub fn remove_item(&self, item_id: &str) -> Result<Item> {
        self.mutate(|state, dirty| {
            state.item(item_id)?;
            if state.is_item_referenced(item_id) {
                return Err(LedgerError::validation(format!(
                    "物料 {item_id} 仍有批次、銷售或調整記錄，無法刪除"
                )));
            }
            let index = state
                .items
                .iter()
                .position(|i| i.id == item_id)
                .ok_or_else(|| LedgerError::not_found(RecordKind::Item, item_id))?;
            dirty.mark_dirty(Collection::Items);
            Ok(state.items.remove(index))
        })
    }

    pub fn item(&self, item_id: &str) -> Result<Item> {
        self.read_state()?.item(item_id).cloned()
    }

    pub fn items(&self) -> Result<Vec<Item>> {
        Ok(self.read_state()?.items.clone())
    }

    // ---------------------------------------------------------------
    // 批次
    // ---------------------------------------------------------------

    /// 記錄期初庫存
    ///
    /// 同一物料同一日已有期初批次時更新其數量；已被銷售扣減的部分保留，
    /// 新數量不可低於已扣減量。
    pub fn record_opening_stock(
        &self,
        item_id: &str,
        quantity: Decimal,
        stock_date: NaiveDate,
    ) -> Result<Lot> {
        if quantity < Decimal::ZERO {
            return Err(LedgerError::validation(format!("期初數量不可為負：{quantity}")));
        }
        self.mutate(|state, dirty| {
            state.item(item_id)?;
            dirty.mark_dirty(Collection::OpeningStock);

            let existing = state.lots.iter().position(|lot| {
                lot.item_id == item_id
                    && lot.origin == LotOrigin::Opening
                    && lot.stock_date == stock_date
            });

            match existing {
                Some(index) => {
                    let traced = state.traced_from_lot(&state.lots[index].id);
                    if quantity < traced {
                        return Err(LedgerError::validation(format!(
                            "期初數量 {quantity} 低於已售出的 {traced}"
                        )));
                    }
                    let lot = &mut state.lots[index];
                    lot.quantity = quantity - traced;
                    tracing::info!("更新期初庫存 {} @ {}：{}", item_id, stock_date, quantity);
                    Ok(lot.clone())
                }
                None => {
                    let lot = state.insert_lot(Lot::opening(item_id, quantity, stock_date));
                    tracing::info!("新增期初庫存 {} @ {}：{}", item_id, stock_date, quantity);
                    Ok(lot)
                }
            }
        })
    }

    /// 記錄收貨（每次收貨都是新批次）
    pub fn record_receipt(&self, item_id: &str, quantity: Decimal, stock_date: NaiveDate) -> Result<Lot> {
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::validation(format!("收貨數量必須大於 0：{quantity}")));
        }
        self.insert_lot(Lot::receiving(item_id, quantity, stock_date))
    }

    /// 新增任意批次
    pub fn add_lot(&self, lot: Lot) -> Result<Lot> {
        self.insert_lot(lot)
    }

    /// 刪除批次，回傳被刪除的批次以供還原
    pub fn remove_lot(&self, lot_id: &str) -> Result<Lot> {
        self.mutate(|state, dirty| {
            let index = state.lot_index(lot_id)?;
            let lot = state.lots.remove(index);
            dirty.mark_dirty(lot_collection(lot.origin));
            tracing::info!("刪除批次 {}（物料 {}，剩餘 {}）", lot.id, lot.item_id, lot.quantity);
            Ok(lot)
        })
    }

    /// 還原先前刪除的批次（保留原 ID）
    pub fn restore_lot(&self, lot: Lot) -> Result<Lot> {
        tracing::debug!("還原批次 {}", lot.id);
        self.insert_lot(lot)
    }

    /// 列出物料的批次；指定 `as_of` 時只含入庫日不晚於該日者
    pub fn list_lots(&self, item_id: &str, as_of: Option<NaiveDate>) -> Result<Vec<Lot>> {
        let state = self.read_state()?;
        state.item(item_id)?;
        Ok(state
            .lots
            .iter()
            .filter(|lot| lot.item_id == item_id)
            .filter(|lot| as_of.map_or(true, |date| lot.stock_date <= date))
            .cloned()
            .collect())
    }

    /// 目前庫存（批次目前數量 + 調整淨額）
    pub fn current_stock(&self, item_id: &str) -> Result<Decimal> {
        let state = self.read_state()?;
        state.item(item_id)?;
        Ok(state.current_stock(item_id))
    }

    fn insert_lot(&self, lot: Lot) -> Result<Lot> {
        lot.validate()?;
        self.mutate(|state, dirty| {
            state.item(&lot.item_id)?;
            if state.lots.iter().any(|l| l.id == lot.id) {
                return Err(LedgerError::validation(format!("批次 ID 已存在: {}", lot.id)));
            }
            let lot = state.insert_lot(lot.clone());
            dirty.mark_dirty(lot_collection(lot.origin));
            tracing::info!(
                "新增{}批次 {}：物料 {}，{} @ {}",
                if lot.origin == LotOrigin::Opening { "期初" } else { "收貨" },
                lot.id,
                lot.item_id,
                lot.quantity,
                lot.stock_date
            );
            Ok(lot)
        })
    }

    // ---------------------------------------------------------------
    // 銷售
    // ---------------------------------------------------------------

    /// 記錄銷售並即時扣減批次
    ///
    /// 未指定單價時使用物料標價。庫存不足時整筆拒絕，帳本不變。
    pub fn record_sale(
        &self,
        item_id: &str,
        quantity: Decimal,
        price: Option<Decimal>,
        sold_at: NaiveDateTime,
        payment_mode: PaymentMode,
    ) -> Result<Sale> {
        let reject_before_stock = self.config.reject_sales_before_stock;
        self.mutate(|state, dirty| {
            let item = state.item(item_id)?.clone();
            let sale = Sale::new(
                item_id,
                quantity,
                price.unwrap_or(item.price),
                sold_at,
                payment_mode,
            );
            sale.validate()?;

            let trace = LiveConsumption::deduct(&mut state.lots, &item, &sale, reject_before_stock)?;

            for deduction in &trace {
                if let Ok(index) = state.lot_index(&deduction.lot_id) {
                    dirty.mark_dirty(lot_collection(state.lots[index].origin));
                }
            }
            state.deductions.extend(trace);
            state.sales.push(sale.clone());
            dirty.mark_dirty(Collection::Sales);
            dirty.mark_dirty(Collection::SaleDeductions);

            tracing::info!(
                "記錄銷售 {}：{} x {} @ {}",
                sale.id,
                item.name,
                sale.quantity,
                sale.date
            );
            Ok(sale)
        })
    }

    /// 刪除銷售，依追溯記錄退回原批次
    ///
    /// 追溯的批次已被刪除時回傳 `Validation`，銷售與批次都不變。
    pub fn delete_sale(&self, sale_id: &str) -> Result<Sale> {
        self.mutate(|state, dirty| {
            let index = state.sale_index(sale_id)?;
            let sale = state.sales.remove(index);
            dirty.mark_dirty(Collection::Sales);

            let (trace, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.deductions)
                .into_iter()
                .partition(|d| d.sale_id == sale_id);
            state.deductions = kept;

            if trace.is_empty() {
                tracing::warn!("銷售 {} 沒有扣減追溯記錄，不退回庫存", sale_id);
                return Ok(sale);
            }
            dirty.mark_dirty(Collection::SaleDeductions);

            LiveConsumption::reverse(&mut state.lots, &trace)?;
            for deduction in &trace {
                if let Ok(lot_index) = state.lot_index(&deduction.lot_id) {
                    dirty.mark_dirty(lot_collection(state.lots[lot_index].origin));
                }
            }

            tracing::info!("刪除銷售 {}，退回 {} 個批次", sale_id, trace.len());
            Ok(sale)
        })
    }

    pub fn sale(&self, sale_id: &str) -> Result<Sale> {
        let state = self.read_state()?;
        let index = state.sale_index(sale_id)?;
        Ok(state.sales[index].clone())
    }

    /// 某日全部銷售（依時間排序）
    pub fn sales_on(&self, date: NaiveDate) -> Result<Vec<Sale>> {
        let state = self.read_state()?;
        let mut sales: Vec<Sale> = state
            .sales
            .iter()
            .filter(|sale| sale.date.date() == date)
            .cloned()
            .collect();
        sales.sort_by_key(|sale| sale.date);
        Ok(sales)
    }

    // ---------------------------------------------------------------
    // 庫存調整
    // ---------------------------------------------------------------

    /// 記錄庫存調整；減少量超過目前庫存時回傳 `InsufficientStock`
    pub fn record_adjustment(&self, adjustment: Adjustment) -> Result<Adjustment> {
        adjustment.validate()?;
        self.mutate(|state, dirty| {
            state.item(&adjustment.item_id)?;

            if adjustment.adjustment_type == AdjustmentType::Decrease {
                let available = state.current_stock(&adjustment.item_id);
                if adjustment.quantity > available {
                    return Err(LedgerError::InsufficientStock {
                        item_id: adjustment.item_id.clone(),
                        requested: adjustment.quantity,
                        available,
                    });
                }
            }

            state.adjustments.push(adjustment.clone());
            dirty.mark_dirty(Collection::StockAdjustments);
            tracing::info!(
                "記錄庫存調整 {}：物料 {} {}，原因 {}",
                adjustment.id,
                adjustment.item_id,
                adjustment.signed_quantity(),
                adjustment.reason
            );
            Ok(adjustment)
        })
    }

    pub fn adjustments(&self, item_id: &str) -> Result<Vec<Adjustment>> {
        let state = self.read_state()?;
        Ok(state
            .adjustments
            .iter()
            .filter(|adj| adj.item_id == item_id)
            .cloned()
            .collect())
    }

    // ---------------------------------------------------------------
    // 報表（唯讀）
    // ---------------------------------------------------------------

    /// 單一物料截至某日的 GR
    pub fn good_return(&self, item_id: &str, as_of: NaiveDate) -> Result<GoodReturn> {
        let state = self.read_state()?;
        let item = state.item(item_id)?;
        Ok(GoodReturnCalculator::calculate(
            item,
            &state.lots,
            &state.sales,
            &state.deductions,
            as_of,
        ))
    }

    /// 全部物料截至某日的 GR
    pub fn good_return_all(&self, as_of: NaiveDate) -> Result<GoodReturnSummary> {
        let state = self.read_state()?;
        let parallel = self.config.should_parallelize(state.items.len());
        Ok(GoodReturnCalculator::calculate_all(
            &state.items,
            &state.lots,
            &state.sales,
            &state.deductions,
            as_of,
            parallel,
        ))
    }

    /// 指定到期日的 GR 報表
    pub fn expiry_report(&self, expiry_date: NaiveDate) -> Result<ExpiryReport> {
        let state = self.read_state()?;
        Ok(ExpiryReportBuilder::build(
            &state.items,
            &state.lots,
            &state.sales,
            &state.deductions,
            expiry_date,
        ))
    }

    /// 單一物料截至某日的庫存狀態
    pub fn stock_position(&self, item_id: &str, as_of: NaiveDate) -> Result<StockPosition> {
        let state = self.read_state()?;
        let item = state.item(item_id)?;
        Ok(StockPositionCalculator::calculate(
            item,
            &state.lots,
            &state.sales,
            &state.deductions,
            &state.adjustments,
            as_of,
        ))
    }

    /// 全部物料的對帳警告（截至某日）
    pub fn reconciliation_warnings(&self, as_of: NaiveDate) -> Result<Vec<ReconciliationWarning>> {
        let state = self.read_state()?;
        let received = shelf_calc::reconstruction::received_quantities(&state.lots, &state.deductions);
        Ok(state
            .items
            .iter()
            .flat_map(|item| {
                HistoricalReconstructor::reconstruct(item, &state.lots, &state.sales, &received, as_of)
                    .warnings()
            })
            .collect())
    }

    // ---------------------------------------------------------------
    // 匯入/匯出
    // ---------------------------------------------------------------

    /// 以 JSON 陣列整批取代某集合，回傳匯入筆數
    ///
    /// 載荷不是陣列或任何記錄無效時回傳 `ImportFormat`，既有資料保留。
    pub fn import_collection(&self, collection: Collection, raw: &str) -> Result<usize> {
        let records = import::parse_payload(collection, raw)?;
        let count = records.len();
        self.mutate(|state, dirty| {
            let traced = state.deductions.len();
            state.replace(collection, records)?;
            dirty.mark_dirty(collection);
            if state.deductions.len() != traced {
                dirty.mark_dirty(Collection::SaleDeductions);
            }
            tracing::info!("匯入 {}：{} 筆", collection, count);
            Ok(count)
        })
    }

    /// 匯出某集合為 JSON 陣列
    pub fn export_collection(&self, collection: Collection) -> Result<String> {
        let records = self.read_state()?.records(collection)?;
        import::render_payload(collection, &records)
    }

    // ---------------------------------------------------------------
    // 內部
    // ---------------------------------------------------------------

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Storage("帳本狀態鎖已損壞".to_string()))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|_| LedgerError::Storage("帳本狀態鎖已損壞".to_string()))
    }

    /// 在工作副本上執行命令，儲存成功後提交
    fn mutate<T>(
        &self,
        command: impl FnOnce(&mut LedgerState, &mut DirtyTracker) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.write_state()?;
        let mut working = guard.clone();
        let mut dirty = DirtyTracker::new();

        let value = command(&mut working, &mut dirty)?;
        self.persist(&guard, &working, &dirty)?;

        *guard = working;
        Ok(value)
    }

    /// 儲存髒集合；中途失敗時盡量寫回已儲存集合的舊內容
    fn persist(&self, previous: &LedgerState, working: &LedgerState, dirty: &DirtyTracker) -> Result<()> {
        let mut saved: BTreeSet<Collection> = BTreeSet::new();

        for collection in dirty.dirty_collections() {
            let outcome = working
                .records(collection)
                .and_then(|records| self.store.save(collection, &records));

            if let Err(e) = outcome {
                tracing::warn!("儲存 {} 失敗，命令撤銷: {}", collection, e);
                for done in saved {
                    let restored = previous
                        .records(done)
                        .and_then(|records| self.store.save(done, &records));
                    if let Err(restore_err) = restored {
                        tracing::warn!("無法寫回 {} 的舊內容: {}", done, restore_err);
                    }
                }
                return Err(e);
            }
            saved.insert(collection);
        }
        Ok(())
    }
}
