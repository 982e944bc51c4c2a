//! Media-to-text conversion shared by every media kind.

use std::sync::Arc;

use mediascribe_config::MediascribeConfig;
use mediascribe_types::{MediaKind, UploadMode, UploadedFile};

use crate::retry::RetryPolicy;
use crate::staging::{StagedFile, Stager};
use crate::types::{GenerativeProvider, Part, ProviderError};

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to stage upload")]
    Staging(#[source] std::io::Error),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Model identifiers per media kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTable {
    pub image: String,
    pub audio: String,
    pub video: String,
}

impl ModelTable {
    pub fn get(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.image,
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        let defaults = mediascribe_config::ProviderConfig::default();
        Self {
            image: defaults.image_model,
            audio: defaults.audio_model,
            video: defaults.video_model,
        }
    }
}

/// Converts uploads to text: stage, call the provider, release the stage.
pub struct MediaConverter {
    provider: Arc<dyn GenerativeProvider>,
    stager: Stager,
    models: ModelTable,
    policy: RetryPolicy,
}

impl MediaConverter {
    pub fn new(
        provider: Arc<dyn GenerativeProvider>,
        stager: Stager,
        models: ModelTable,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            stager,
            models,
            policy,
        }
    }

    /// Build a converter using the models, staging dir and retry policy in `config`.
    pub fn from_config(provider: Arc<dyn GenerativeProvider>, config: &MediascribeConfig) -> Self {
        let p = &config.provider;
        Self::new(
            provider,
            Stager::new(config.gateway.staging_dir.clone()),
            ModelTable {
                image: p.image_model.clone(),
                audio: p.audio_model.clone(),
                video: p.video_model.clone(),
            },
            RetryPolicy::from_config(p),
        )
    }

    pub fn model_for(&self, kind: MediaKind) -> &str {
        self.models.get(kind)
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    pub async fn image_to_text(&self, upload: UploadedFile) -> Result<String, ConvertError> {
        self.convert(MediaKind::Image, upload).await
    }

    pub async fn audio_to_text(&self, upload: UploadedFile) -> Result<String, ConvertError> {
        self.convert(MediaKind::Audio, upload).await
    }

    pub async fn video_to_text(&self, upload: UploadedFile) -> Result<String, ConvertError> {
        self.convert(MediaKind::Video, upload).await
    }

    /// Convert one upload. The staged copy is deleted before returning,
    /// whether or not the provider call succeeded.
    #[tracing::instrument(
        skip(self, upload),
        fields(bytes = upload.data.len(), model = self.model_for(kind))
    )]
    pub async fn convert(&self, kind: MediaKind, upload: UploadedFile) -> Result<String, ConvertError> {
        let staged = match self.stager.stage(&upload, kind.preserves_extension()).await {
            Ok(staged) => staged,
            Err(e) => {
                tracing::error!(error = %e, "Failed to stage upload");
                return Err(ConvertError::Staging(e));
            }
        };

        let result = self.run(kind, &staged, &upload).await;

        let path = staged.path().to_path_buf();
        if let Err(e) = staged.close() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged upload");
        }

        match &result {
            Ok(text) => tracing::info!(chars = text.len(), "Conversion complete"),
            Err(e) => tracing::error!(error = %e, "Conversion failed"),
        }
        result
    }

    async fn run(
        &self,
        kind: MediaKind,
        staged: &StagedFile,
        upload: &UploadedFile,
    ) -> Result<String, ConvertError> {
        let media = match kind.upload_mode() {
            UploadMode::Inline => {
                let data = staged.read_all().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to read staged upload");
                    ConvertError::Staging(e)
                })?;
                Part::InlineData {
                    mime_type: inline_mime(upload),
                    data: data.into(),
                }
            }
            UploadMode::FileApi => {
                let mime_type = staged
                    .guess_mime()
                    .or_else(|| upload.mime_type.clone())
                    .unwrap_or_else(|| FALLBACK_MIME.to_string());
                let remote = self
                    .policy
                    .run("upload_file", || {
                        self.provider.upload_file(staged.path(), &mime_type)
                    })
                    .await?;
                tracing::info!(
                    file = %remote.name,
                    state = remote.state.as_deref().unwrap_or("unknown"),
                    "Staged upload sent to provider file API"
                );
                Part::FileData {
                    mime_type: remote.mime_type.unwrap_or(mime_type),
                    file_uri: remote.uri,
                }
            }
        };

        let parts = [media, Part::Text(kind.instruction().to_string())];
        let model = self.model_for(kind);
        let text = self
            .policy
            .run("generate", || self.provider.generate(model, &parts))
            .await?;
        Ok(text)
    }
}

/// MIME type sent with inline bytes: the declared type, else a guess from the
/// original filename.
fn inline_mime(upload: &UploadedFile) -> String {
    upload
        .mime_type
        .clone()
        .or_else(|| {
            upload
                .file_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|m| m.essence_str().to_string())
        })
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}
