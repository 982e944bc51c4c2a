//! Google Gemini REST provider.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use mediascribe_config::ProviderConfig;

use crate::types::{GenerativeProvider, Part, ProviderError, RemoteFile};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Gemini provider over `generateContent` and the resumable file API.
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Build from configuration; the HTTP client uses the configured timeout.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            api_key: config.api_key.expose().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, ProviderError> {
        let data = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = error_for_status(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ProviderError::InvalidResponse("missing upload URL".into()))?
            .to_string();

        let resp = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(CONTENT_TYPE, mime_type)
            .body(data)
            .send()
            .await?;
        let resp = error_for_status(resp).await?;

        let uploaded: UploadResponse = resp.json().await?;
        Ok(uploaded.file.into())
    }

    async fn generate(&self, model: &str, parts: &[Part]) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: parts.iter().map(WirePart::from).collect(),
            }],
        };

        let resp = self
            .client
            .post(format!(
                "{}/v1beta/models/{model}:generateContent",
                self.base_url
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = error_for_status(resp).await?;

        let json: GenerateContentResponse = resp.json().await?;
        json.into_text()
    }
}

/// Turn a non-2xx response into `ProviderError::Api`, preferring the
/// provider's `error.message`.
async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body
            }
        });

    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}

// ──────────────────── Wire Types ────────────────────

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum WirePart<'a> {
    Text(&'a str),
    InlineData(InlineData<'a>),
    FileData(FileData<'a>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

impl<'a> From<&'a Part> for WirePart<'a> {
    fn from(part: &'a Part) -> Self {
        match part {
            Part::Text(text) => WirePart::Text(text),
            Part::InlineData { mime_type, data } => WirePart::InlineData(InlineData {
                mime_type,
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
            Part::FileData {
                mime_type,
                file_uri,
            } => WirePart::FileData(FileData {
                mime_type,
                file_uri,
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, ProviderError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(ProviderError::EmptyResponse(
                block_reason.unwrap_or_else(|| "no candidates".into()),
            ));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse(
                candidate
                    .finish_reason
                    .or(block_reason)
                    .unwrap_or_else(|| "empty candidate".into()),
            ));
        }
        Ok(text)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFileInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFileInfo {
    name: String,
    uri: String,
    mime_type: Option<String>,
    state: Option<String>,
}

impl From<UploadedFileInfo> for RemoteFile {
    fn from(info: UploadedFileInfo) -> Self {
        RemoteFile {
            name: info.name,
            uri: info.uri,
            mime_type: info.mime_type,
            state: info.state,
        }
    }
}
