pub mod ingest;
pub mod schema;
pub mod warehouse;

pub use ingest::{FileOutcome, FileState, IngestJob, IngestReport, ingest};
pub use warehouse::{LoadError, StoreError, Warehouse};
