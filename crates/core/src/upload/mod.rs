pub mod parse;
pub mod storage;

// Re-export public types and functions
pub use parse::{ParsedUpload, UploadedFile, decode_keywords};
pub use storage::{StoredFile, create_upload_dir, store_files};
