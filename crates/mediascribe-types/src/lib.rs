use std::fmt;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ──────────────────── Media Kinds ────────────────────

/// The three media categories the gateway converts to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// How an upload reaches the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Raw bytes sent inside the generation request.
    Inline,
    /// Staged through the provider's file API and referenced by URI.
    FileApi,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Audio, MediaKind::Video];

    /// Lowercase name, also the multipart field carrying the upload.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    /// Multipart form field expected on the HTTP endpoint.
    pub fn field_name(&self) -> &'static str {
        self.as_str()
    }

    /// HTTP route serving this kind.
    pub fn route(&self) -> &'static str {
        match self {
            MediaKind::Image => "/api/image-to-text",
            MediaKind::Audio => "/api/audio-to-text",
            MediaKind::Video => "/api/video-to-text",
        }
    }

    /// Fixed instruction sent alongside the media payload.
    pub fn instruction(&self) -> &'static str {
        match self {
            MediaKind::Image => {
                "Generate the prompt for image and return the generated text in markdown."
            }
            MediaKind::Audio => {
                "Transcribe the audio file into text and return the transcribed text in markdown."
            }
            MediaKind::Video => {
                "Describe the video file into text and return the generated text in markdown."
            }
        }
    }

    pub fn upload_mode(&self) -> UploadMode {
        match self {
            MediaKind::Image => UploadMode::Inline,
            MediaKind::Audio | MediaKind::Video => UploadMode::FileApi,
        }
    }

    /// Whether the staged copy must keep the original file extension.
    ///
    /// The file API infers content type from the extension.
    pub fn preserves_extension(&self) -> bool {
        self.upload_mode() == UploadMode::FileApi
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

// ──────────────────── Upload Types ────────────────────

/// Longest filename extension carried onto a staged copy.
pub const MAX_EXTENSION_LEN: usize = 16;

/// A file received from a client, held in memory for one request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Raw file contents.
    pub data: Bytes,
    /// Declared MIME type, if the client sent one.
    pub mime_type: Option<String>,
    /// Original filename, if the client sent one.
    pub file_name: Option<String>,
}

impl UploadedFile {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
            file_name: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Extension of the original filename including the leading dot
    /// (e.g. ".wav"), or an empty string when there is none.
    ///
    /// Extensions longer than `MAX_EXTENSION_LEN` or containing anything but
    /// ASCII letters and digits are dropped.
    pub fn extension_suffix(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LEN
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }
}

// ──────────────────── HTTP Bodies ────────────────────

/// Successful conversion body: `{"text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResponse {
    pub text: String,
}

/// Error body: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_and_fields() {
        assert_eq!(MediaKind::Image.route(), "/api/image-to-text");
        assert_eq!(MediaKind::Audio.route(), "/api/audio-to-text");
        assert_eq!(MediaKind::Video.route(), "/api/video-to-text");
        assert_eq!(MediaKind::Audio.field_name(), "audio");
    }

    #[test]
    fn test_upload_modes() {
        assert_eq!(MediaKind::Image.upload_mode(), UploadMode::Inline);
        assert_eq!(MediaKind::Audio.upload_mode(), UploadMode::FileApi);
        assert_eq!(MediaKind::Video.upload_mode(), UploadMode::FileApi);
        assert!(!MediaKind::Image.preserves_extension());
        assert!(MediaKind::Video.preserves_extension());
    }

    #[test]
    fn test_instructions_are_exact() {
        assert_eq!(
            MediaKind::Image.instruction(),
            "Generate the prompt for image and return the generated text in markdown."
        );
        assert_eq!(
            MediaKind::Audio.instruction(),
            "Transcribe the audio file into text and return the transcribed text in markdown."
        );
        assert_eq!(
            MediaKind::Video.instruction(),
            "Describe the video file into text and return the generated text in markdown."
        );
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Video".parse::<MediaKind>().unwrap(), MediaKind::Video);
        assert!("pdf".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_extension_suffix() {
        let f = UploadedFile::new(vec![1, 2]).with_file_name("sample.wav");
        assert_eq!(f.extension_suffix(), ".wav");

        let f = UploadedFile::new(vec![1]).with_file_name("archive.tar.gz");
        assert_eq!(f.extension_suffix(), ".gz");

        let f = UploadedFile::new(vec![1]).with_file_name("noext");
        assert_eq!(f.extension_suffix(), "");

        assert_eq!(UploadedFile::new(vec![]).extension_suffix(), "");
    }

    #[test]
    fn test_extension_suffix_drops_unsafe_extensions() {
        let long = format!("clip.{}", "a".repeat(300));
        assert_eq!(UploadedFile::new(vec![1]).with_file_name(long).extension_suffix(), "");

        let at_limit = format!("clip.{}", "m".repeat(MAX_EXTENSION_LEN));
        assert_eq!(
            UploadedFile::new(vec![1])
                .with_file_name(at_limit)
                .extension_suffix()
                .len(),
            MAX_EXTENSION_LEN + 1
        );

        for name in ["clip.w av", "clip.wa-v", "clip.wäv", "clip.m$a"] {
            let f = UploadedFile::new(vec![1]).with_file_name(name);
            assert_eq!(f.extension_suffix(), "", "{name}");
        }
    }

    #[test]
    fn test_text_response_shape() {
        let body = serde_json::to_value(TextResponse {
            text: "# Hello".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "text": "# Hello" }));
    }
}
