//! mediascribe-media: media-to-text conversion through a generative-AI provider.
//!
//! An upload is staged to a scoped temporary file, handed to the provider
//! (inline bytes for images, the provider file API for audio and video) with a
//! fixed instruction, and the generated text is returned. The staged file is
//! removed on every exit path.

pub mod converter;
pub mod gemini;
pub mod retry;
pub mod staging;
pub mod types;

pub use converter::{ConvertError, MediaConverter, ModelTable};
pub use gemini::GeminiProvider;
pub use retry::RetryPolicy;
pub use staging::{StagedFile, Stager};
pub use types::{GenerativeProvider, Part, ProviderError, RemoteFile};
