use crate::error::UploadError;
use crate::upload::StoredFile;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{info, warn};

/// One file as sent to the relay endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayFile {
    pub filename: String,
    /// Base64 (standard alphabet, padded) file contents
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayPayload {
    pub files: Vec<RelayFile>,
    pub keywords: Vec<String>,
}

/// The part of the relay response that is safe to hand back to the browser.
///
/// File contents never appear here, only names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResult {
    pub status: u16,
    pub received_file_names: Vec<String>,
    pub received_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<JsonValue>,
}

#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    url: String,
    timeout: Option<Duration>,
}

impl RelayClient {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forward the stored files and keywords, then filter the response
    pub async fn send(
        &self,
        files: &[StoredFile],
        keywords: &[String],
    ) -> Result<RelayResult, UploadError> {
        let payload = build_payload(files, keywords).await?;
        let received_file_names = payload
            .files
            .iter()
            .map(|file| file.filename.clone())
            .collect::<Vec<_>>();

        info!(
            url = %self.url,
            files = payload.files.len(),
            keywords = payload.keywords.len(),
            "Relaying upload"
        );

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, %status, "Relay returned non-success status");
        }

        let body = response.bytes().await?;
        let json: JsonValue = serde_json::from_slice(&body).map_err(|error| {
            UploadError::Relay(format!("relay returned a non-JSON body: {error}"))
        })?;
        let Some(fields) = json.as_object() else {
            return Err(UploadError::Relay(format!(
                "relay returned a non-object JSON body: {json}"
            )));
        };

        Ok(RelayResult {
            status: status.as_u16(),
            received_file_names,
            received_keywords: keywords.to_vec(),
            origin: fields.get("origin").cloned(),
            url: fields.get("url").cloned(),
        })
    }
}

/// Read each stored file back and encode it for the relay
pub async fn build_payload(
    files: &[StoredFile],
    keywords: &[String],
) -> Result<RelayPayload, UploadError> {
    let mut relay_files = Vec::with_capacity(files.len());
    for stored in files {
        let bytes = tokio::fs::read(&stored.path).await?;
        relay_files.push(RelayFile {
            filename: stored.filename.clone(),
            file: STANDARD.encode(bytes),
        });
    }

    Ok(RelayPayload {
        files: relay_files,
        keywords: keywords.to_vec(),
    })
}
