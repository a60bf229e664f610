use crate::error::UploadError;
use crate::upload::UploadedFile;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind as StdIoErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const UPLOAD_DIR_PREFIX: &str = "upload-";

/// Metadata of a file persisted under an upload directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub filename: String,
    pub size: u64,
    pub path: PathBuf,
}

/// Create a fresh `upload-<unix-ms>` directory under `workspace`.
///
/// The workspace itself is created if missing. When the timestamp is already
/// taken by a concurrent request the next free millisecond is used instead.
pub async fn create_upload_dir(workspace: &Path) -> Result<PathBuf, UploadError> {
    tokio::fs::create_dir_all(workspace).await?;

    let mut stamp = chrono::Utc::now().timestamp_millis();
    loop {
        let dir = workspace.join(format!("{UPLOAD_DIR_PREFIX}{stamp}"));
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => return Ok(dir),
            Err(error) if error.kind() == StdIoErrorKind::AlreadyExists => {
                debug!(?dir, "Upload directory taken, trying next timestamp");
                stamp += 1;
            }
            Err(error) => return Err(error.into()),
        }
    }
}

/// Write every file into `dir`, keeping the original names only as metadata
pub async fn store_files(
    dir: &Path,
    files: &[UploadedFile],
) -> Result<Vec<StoredFile>, UploadError> {
    let mut stored = Vec::with_capacity(files.len());

    for (index, file) in files.iter().enumerate() {
        let path = dir.join(stored_name(index, &file.filename));
        tokio::fs::write(&path, &file.bytes).await?;
        debug!(filename = %file.filename, ?path, size = file.bytes.len(), "Stored upload");

        stored.push(StoredFile {
            filename: file.filename.clone(),
            size: file.bytes.len() as u64,
            path,
        });
    }

    Ok(stored)
}

/// On-disk name for the `index`th file; only a plain alphanumeric extension survives
fn stored_name(index: usize, original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("file-{index}.{ext}"),
        None => format!("file-{index}"),
    }
}
