//! Provider-facing types and the provider trait.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// One piece of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Raw bytes sent inside the request.
    InlineData { mime_type: String, data: Bytes },
    /// A file previously uploaded through the provider file API.
    FileData { mime_type: String, file_uri: String },
    /// Plain text (the instruction).
    Text(String),
}

/// A file staged on the provider side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Provider resource name (e.g. "files/abc123").
    pub name: String,
    /// URI used to reference the file in generation requests.
    pub uri: String,
    /// Content type the provider recorded.
    pub mime_type: Option<String>,
    /// Processing state (e.g. "ACTIVE", "PROCESSING").
    pub state: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Provider returned no text: {0}")]
    EmptyResponse(String),
    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether a second attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(e) => e.is_timeout() || e.is_connect(),
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Timeout(_) => true,
            ProviderError::EmptyResponse(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::Io(_) => false,
        }
    }
}

/// A multimodal generative-AI service.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Provider identifier.
    fn id(&self) -> &str;

    /// Upload a local file to the provider's file-staging API.
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, ProviderError>;

    /// Run `model` over `parts` and return the generated text.
    async fn generate(&self, model: &str, parts: &[Part]) -> Result<String, ProviderError>;
}
