use crate::error::UploadError;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::debug;

pub const KEYWORDS_FIELD: &str = "keywords";
pub const FILES_FIELD: &str = "files";

/// A file part held in memory until validation passes
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct ParsedUpload {
    pub keywords: Vec<String>,
    pub files: Vec<UploadedFile>,
}

impl ParsedUpload {
    /// Collect the `keywords` and `files` parts of a multipart body.
    ///
    /// Unknown parts are skipped. Nothing is written to disk here.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, UploadError> {
        let mut raw_keywords: Option<String> = None;
        let mut files = Vec::new();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(KEYWORDS_FIELD) => {
                    raw_keywords = Some(field.text().await.map_err(multipart_error)?);
                }
                Some(FILES_FIELD) => {
                    let filename = field.file_name().map(str::to_owned).unwrap_or_default();
                    let bytes = field.bytes().await.map_err(multipart_error)?;

                    // Browsers send an empty nameless part for an untouched file input
                    if filename.is_empty() && bytes.is_empty() {
                        debug!("Skipping empty file part");
                        continue;
                    }

                    let filename = if filename.is_empty() {
                        format!("file-{}", files.len())
                    } else {
                        filename
                    };
                    files.push(UploadedFile { filename, bytes });
                }
                other => {
                    debug!(field = ?other, "Ignoring unknown multipart field");
                }
            }
        }

        Ok(Self {
            keywords: decode_keywords(raw_keywords.as_deref())?,
            files,
        })
    }

    /// Both a keyword and a file are required before anything is stored
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.keywords.is_empty() {
            return Err(UploadError::Validation("keywords are required".into()));
        }
        if self.files.is_empty() {
            return Err(UploadError::Validation("no files were uploaded".into()));
        }
        Ok(())
    }
}

/// Decode the JSON-array-encoded `keywords` field.
///
/// An absent or blank field yields an empty list.
pub fn decode_keywords(raw: Option<&str>) -> Result<Vec<String>, UploadError> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    serde_json::from_str::<Vec<String>>(raw).map_err(|error| {
        UploadError::Parse(format!(
            "keywords must be a JSON array of strings: {error}"
        ))
    })
}

fn multipart_error(error: MultipartError) -> UploadError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge(error.body_text())
    } else {
        UploadError::Parse(error.body_text())
    }
}
