//! 髒標記追蹤：記錄一次命令修改了哪些集合

use std::collections::BTreeSet;

use crate::store::Collection;

/// 髒標記追蹤器
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_collections: BTreeSet<Collection>,
}

impl DirtyTracker {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 標記集合為髒
    pub fn mark_dirty(&mut self, collection: Collection) {
        self.dirty_collections.insert(collection);
    }

    /// 檢查集合是否為髒
    pub fn is_dirty(&self, collection: Collection) -> bool {
        self.dirty_collections.contains(&collection)
    }

    pub fn is_clean(&self) -> bool {
        self.dirty_collections.is_empty()
    }

    /// 清除所有髒標記
    pub fn clear(&mut self) {
        self.dirty_collections.clear();
    }

    /// 獲取所有髒集合（依固定順序）
    pub fn dirty_collections(&self) -> Vec<Collection> {
        self.dirty_collections.iter().copied().collect()
    }
}
