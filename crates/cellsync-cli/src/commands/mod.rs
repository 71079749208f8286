pub mod format;
pub mod ingest;
pub mod load_csv;
pub mod sync;
