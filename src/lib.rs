pub mod audit;
pub mod cli;
pub mod core;
pub mod logging;
pub mod storage;

pub use audit::{AuditKind, AuditRecord, AuditSink};
pub use core::{SyncConfig, SyncEngine, SyncError, SyncStats};
pub use storage::{FileStore, LocalFileStore};
