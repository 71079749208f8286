pub mod client;
pub mod files;

pub use client::{DriveClient, FOLDER_MIME_TYPE};
