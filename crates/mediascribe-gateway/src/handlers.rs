//! Conversion endpoints.
//!
//! Each endpoint reads one multipart field and hands the upload to the shared
//! converter; they differ only in the media kind.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};

use mediascribe_types::{MediaKind, TextResponse, UploadedFile};

use crate::GatewayState;
use crate::error::ApiError;

/// POST /api/image-to-text, multipart field `image`.
pub async fn image_to_text(
    State(state): State<Arc<GatewayState>>,
    multipart: Multipart,
) -> Result<Json<TextResponse>, ApiError> {
    convert_upload(&state, MediaKind::Image, multipart).await
}

/// POST /api/audio-to-text, multipart field `audio`.
pub async fn audio_to_text(
    State(state): State<Arc<GatewayState>>,
    multipart: Multipart,
) -> Result<Json<TextResponse>, ApiError> {
    convert_upload(&state, MediaKind::Audio, multipart).await
}

/// POST /api/video-to-text, multipart field `video`.
pub async fn video_to_text(
    State(state): State<Arc<GatewayState>>,
    multipart: Multipart,
) -> Result<Json<TextResponse>, ApiError> {
    convert_upload(&state, MediaKind::Video, multipart).await
}

async fn convert_upload(
    state: &GatewayState,
    kind: MediaKind,
    mut multipart: Multipart,
) -> Result<Json<TextResponse>, ApiError> {
    let upload = read_upload(&mut multipart, kind.field_name()).await?;

    tracing::debug!(
        kind = %kind,
        file_name = upload.file_name.as_deref().unwrap_or("unknown"),
        content_type = upload.mime_type.as_deref().unwrap_or("unknown"),
        bytes = upload.data.len(),
        "Upload received"
    );

    let text = state.converter.convert(kind, upload).await?;
    Ok(Json(TextResponse { text }))
}

/// Read the first file part called `name`. Other fields, including plain
/// text fields with the same name, are skipped.
async fn read_upload(
    multipart: &mut Multipart,
    name: &'static str,
) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }
        let Some(file_name) = field.file_name().map(String::from) else {
            tracing::debug!(field = name, "Skipping non-file part");
            continue;
        };
        let mime_type = field.content_type().map(String::from);
        let data = field.bytes().await?;
        return Ok(UploadedFile {
            data,
            mime_type,
            file_name: Some(file_name),
        });
    }
    Err(ApiError::MissingField(name))
}
