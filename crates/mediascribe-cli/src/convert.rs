use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use mediascribe_config::MediascribeConfig;
use mediascribe_media::{GeminiProvider, MediaConverter};
use mediascribe_types::{MediaKind, UploadedFile};

/// Convert a local file through the same pipeline the gateway uses.
pub async fn run_convert(
    config: &MediascribeConfig,
    kind: MediaKind,
    path: &Path,
) -> Result<String> {
    let upload = read_upload(path).await?;
    let provider = GeminiProvider::from_config(&config.provider)
        .context("Failed to build provider client")?;
    let converter = MediaConverter::from_config(Arc::new(provider), config);

    tracing::info!(
        kind = %kind,
        model = converter.model_for(kind),
        path = %path.display(),
        "Converting file"
    );

    converter
        .convert(kind, upload)
        .await
        .with_context(|| format!("Failed to convert {}", path.display()))
}

async fn read_upload(path: &Path) -> Result<UploadedFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut upload = UploadedFile::new(data);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        upload = upload.with_file_name(name);
    }
    Ok(upload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_upload_keeps_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sample.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let upload = read_upload(&path).await.unwrap();
        assert_eq!(upload.file_name.as_deref(), Some("sample.wav"));
        assert_eq!(upload.extension_suffix(), ".wav");
        assert_eq!(&upload.data[..], b"RIFF");
        assert!(upload.mime_type.is_none());
    }

    #[tokio::test]
    async fn test_read_upload_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = read_upload(&dir.path().join("absent.png")).await.unwrap_err();
        assert!(err.to_string().contains("absent.png"));
    }
}
