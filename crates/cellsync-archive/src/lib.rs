pub mod extractor;
pub mod format;
pub mod parse;

pub use extractor::{ArchiveExtractor, ExtractError, OpenArchive, RecordStats, RecordStream};
pub use format::ArchiveFormat;
