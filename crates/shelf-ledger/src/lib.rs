//! # Shelf Ledger
//!
//! 帳本服務、儲存協作者與批次匯入/匯出

pub mod dirty_tracking;
pub mod import;
pub mod ledger;
pub mod state;
pub mod store;

// Re-export 主要類型
pub use dirty_tracking::DirtyTracker;
pub use ledger::Ledger;
pub use state::LedgerState;
pub use store::{Collection, JsonDirStore, MemoryStore, RecordStore};
