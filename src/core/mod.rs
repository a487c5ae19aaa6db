pub mod diff;
pub mod engine;
pub mod error;
pub mod exclude;
pub mod executor;
pub mod hasher;

pub use diff::{classify_dir, DirDiff, DirListing, EntryNameSet, DEFAULT_SET_SWITCH_THRESHOLD};
pub use engine::{SyncConfig, SyncEngine, SyncStats, WorkItem};
pub use error::SyncError;
pub use exclude::ExcludeRules;
pub use executor::{ActionExecutor, BatchOutcome, CopyPolicy};
pub use hasher::{contents_equal, digest_bytes, fingerprint, ContentDigest};
