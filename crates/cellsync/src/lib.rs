pub mod dedup;
pub mod record;
pub mod remote;
pub mod report;
pub mod sync_engine;
pub mod table;
pub mod target;
pub mod watermark;

pub use dedup::{DedupKey, LoadBatch, dedupe};
pub use record::{NormalizedRecord, Vendor};
pub use remote::{RemoteError, RemoteFile, RemoteStore};
pub use report::{FileSyncOutcome, FileSyncState, SyncReport, TargetOutcome, TargetStatus};
pub use sync_engine::{RemoteSyncEngine, SyncError};
pub use table::{ColumnMapping, Technology, TrafficTable};
pub use target::{ConfigError, DEFAULT_ALLOWED_EXTENSIONS, SyncMode, SyncTarget, SyncTargetConfig};
pub use watermark::{Watermark, filter};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
