//! mediascribe-config: gateway and provider configuration.
//!
//! Values come from built-in defaults, an optional JSON5 file and the process
//! environment (after `.env` is loaded), in increasing precedence. The provider
//! API key is required; loading fails without it so the gateway never binds a
//! listener it cannot serve.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mediascribe_types::MediaKind;

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "GOOGLE_AI_API_KEY";
pub const HOST_ENV: &str = "MEDIASCRIBE_HOST";
pub const PORT_ENV: &str = "MEDIASCRIBE_PORT";
pub const PROVIDER_URL_ENV: &str = "MEDIASCRIBE_PROVIDER_URL";
pub const STAGING_DIR_ENV: &str = "MEDIASCRIBE_STAGING_DIR";

/// Upper bound for `provider.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("GOOGLE_AI_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Provider API key. Never printed or serialized.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Masked form for diagnostics, e.g. `****abcd`.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in MiB.
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
    /// Directory for staged uploads (OS temp dir when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_body_limit_mb() -> usize {
    100
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_mb: default_body_limit_mb(),
            staging_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// Generative-AI provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key, normally supplied through `GOOGLE_AI_API_KEY`.
    #[serde(default, skip_serializing)]
    pub api_key: ApiKey,
    /// Provider REST endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_audio_model")]
    pub audio_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    /// Per-call timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries after a transient provider failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pause before a retry, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_image_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_audio_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_video_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKey::default(),
            base_url: default_base_url(),
            image_model: default_image_model(),
            audio_model: default_audio_model(),
            video_model: default_video_model(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl ProviderConfig {
    /// Model identifier used for the given media kind.
    pub fn model_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.image_model,
            MediaKind::Audio => &self.audio_model,
            MediaKind::Video => &self.video_model,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Top-level mediascribe configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediascribeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl MediascribeConfig {
    /// Overlay environment values using `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.provider.api_key = ApiKey::new(key);
        }
        if let Some(host) = lookup(HOST_ENV) {
            self.gateway.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.gateway.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{PORT_ENV} is not a port: {port}")))?;
        }
        if let Some(url) = lookup(PROVIDER_URL_ENV) {
            self.provider.base_url = url;
        }
        if let Some(dir) = lookup(STAGING_DIR_ENV) {
            self.gateway.staging_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Check the configuration can serve requests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.api_key.is_blank() {
            return Err(ConfigError::MissingApiKey);
        }

        let url = url::Url::parse(&self.provider.base_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "provider.base_url {:?}: {e}",
                self.provider.base_url
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "provider.base_url must be http(s), got {}",
                url.scheme()
            )));
        }

        for kind in MediaKind::ALL {
            if self.provider.model_for(kind).trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{kind} model is empty")));
            }
        }
        if self.provider.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "provider.request_timeout_secs must be positive".into(),
            ));
        }
        if self.provider.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "provider.max_retries must be at most {MAX_RETRIES_LIMIT}"
            )));
        }
        if self.gateway.body_limit_mb == 0 {
            return Err(ConfigError::Invalid(
                "gateway.body_limit_mb must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Resolve the mediascribe config directory (~/.mediascribe/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".mediascribe"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the default config file path (~/.mediascribe/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load, overlay and validate configuration.
///
/// An explicit `path` must exist; the default path is optional.
pub fn load_config(path: Option<&Path>) -> Result<MediascribeConfig, ConfigError> {
    let config = resolve_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Load `.env`, the config file and environment overrides without validating.
pub fn resolve_config(path: Option<&Path>) -> Result<MediascribeConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => match config_file_path() {
            Ok(p) => load_config_from(&p)?,
            Err(_) => MediascribeConfig::default(),
        },
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<MediascribeConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(MediascribeConfig::default());
    }
    read_config_file(path)
}

fn read_config_file(path: &Path) -> Result<MediascribeConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: MediascribeConfig = json5::from_str(&content)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid_config() -> MediascribeConfig {
        let mut config = MediascribeConfig::default();
        config.provider.api_key = ApiKey::new("test-key");
        config
    }

    #[test]
    fn test_default_config() {
        let config = MediascribeConfig::default();
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.provider.model_for(MediaKind::Image), "gemini-2.0-flash");
        assert_eq!(config.provider.model_for(MediaKind::Audio), "gemini-2.0-flash");
        assert_eq!(config.provider.model_for(MediaKind::Video), "gemini-2.5-flash");
        assert_eq!(config.provider.max_retries, 1);
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        let config = MediascribeConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));

        let mut config = MediascribeConfig::default();
        config.provider.api_key = ApiKey::new("   ");
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_apply_env() {
        let mut config = MediascribeConfig::default();
        config
            .apply_env(lookup_from(&[
                (API_KEY_ENV, "secret-key-1234"),
                (HOST_ENV, "0.0.0.0"),
                (PORT_ENV, "8080"),
                (PROVIDER_URL_ENV, "http://localhost:9999"),
            ]))
            .unwrap();
        assert_eq!(config.provider.api_key.expose(), "secret-key-1234");
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.provider.base_url, "http://localhost:9999");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_bad_port() {
        let mut config = MediascribeConfig::default();
        let err = config
            .apply_env(lookup_from(&[(PORT_ENV, "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = valid_config();
        config.provider.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid_config();
        config.provider.base_url = "ftp://example.com".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid_config();
        config.provider.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid_config();
        config.provider.max_retries = MAX_RETRIES_LIMIT + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid_config();
        config.provider.video_model = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            gateway: { port: 8080, body_limit_mb: 20 },
            provider: {
                video_model: "gemini-2.5-pro",
                max_retries: 0,
            },
        }"#;
        let config: MediascribeConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.gateway.body_limit_bytes(), 20 * 1024 * 1024);
        assert_eq!(config.provider.video_model, "gemini-2.5-pro");
        assert_eq!(config.provider.image_model, "gemini-2.0-flash");
        assert_eq!(config.provider.max_retries, 0);
        assert!(config.provider.api_key.is_blank());
    }

    #[test]
    fn test_load_config_from_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("absent.json5")).unwrap();
        assert_eq!(config.gateway.port, 5000);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, "{ gateway: { host: '0.0.0.0' } }").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.gateway.host, "0.0.0.0");
    }

    #[test]
    fn test_resolve_config_skips_validation() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, "{ provider: { max_retries: 9 } }").unwrap();

        let config = resolve_config(Some(&path)).unwrap();
        assert_eq!(config.provider.max_retries, 9);
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::MissingApiKey | ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_api_key_never_serialized_or_printed() {
        let mut config = valid_config();
        config.provider.api_key = ApiKey::new("AIzaSyVerySecretValue");

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("AIzaSyVerySecretValue"));
        assert!(!json.contains("api_key"));

        let debug = format!("{config:?}");
        assert!(!debug.contains("AIzaSyVerySecretValue"));
        assert!(debug.contains("****alue"));
    }

    #[test]
    fn test_masked_short_key() {
        assert_eq!(ApiKey::new("abc").masked(), "****");
    }
}
