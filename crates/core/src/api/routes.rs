use crate::AppState;
use crate::error::UploadError;
use crate::relay::RelayResult;
use crate::upload::{ParsedUpload, StoredFile, create_upload_dir, store_files};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

const UPLOAD_PAGE: &str = include_str!("../../assets/upload.html");

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub upload_dir: PathBuf,
    pub files: Vec<StoredFile>,
    pub ai_response: RelayResult,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

/// Receive keywords and files, store them, relay them and report back
#[axum::debug_handler]
pub async fn upload(
    Extension(state): Extension<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, UploadError> {
    let parsed = ParsedUpload::from_multipart(multipart?).await?;
    parsed.validate()?;

    let upload_dir = create_upload_dir(state.workspace()).await?;
    info!(
        ?upload_dir,
        files = parsed.files.len(),
        keywords = parsed.keywords.len(),
        "Storing upload"
    );

    let files = store_files(&upload_dir, &parsed.files).await?;
    let ai_response = state.relay.send(&files, &parsed.keywords).await?;

    info!(?upload_dir, status = ai_response.status, "Upload relayed");

    Ok(Json(UploadResponse {
        message: "Files stored and relayed".into(),
        upload_dir,
        files,
        ai_response,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_keys() {
        let response = UploadResponse {
            message: "Files stored and relayed".into(),
            upload_dir: PathBuf::from("/srv/workspace/upload-1700000000000"),
            files: vec![StoredFile {
                filename: "a.pdf".into(),
                size: 3,
                path: PathBuf::from("/srv/workspace/upload-1700000000000/file-0.pdf"),
            }],
            ai_response: RelayResult {
                status: 200,
                received_file_names: vec!["a.pdf".into()],
                received_keywords: vec!["anatomy".into()],
                origin: None,
                url: None,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["uploadDir"], "/srv/workspace/upload-1700000000000");
        assert_eq!(json["files"][0]["filename"], "a.pdf");
        assert_eq!(json["files"][0]["size"], 3);
        assert_eq!(
            json["files"][0]["path"],
            "/srv/workspace/upload-1700000000000/file-0.pdf"
        );
        assert_eq!(json["aiResponse"]["receivedFileNames"][0], "a.pdf");
    }

    #[test]
    fn test_upload_page_posts_to_api() {
        assert!(UPLOAD_PAGE.contains("/api/upload"));
        assert!(UPLOAD_PAGE.contains(r#"formData.append("keywords", JSON.stringify"#));
        assert!(UPLOAD_PAGE.contains(r#"formData.append("files", file)"#));
    }
}
