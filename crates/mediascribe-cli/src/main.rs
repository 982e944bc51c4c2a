mod convert;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use mediascribe_config::MediascribeConfig;
use mediascribe_media::GeminiProvider;
use mediascribe_types::MediaKind;

#[derive(Parser)]
#[command(name = "mediascribe", about = "Media-to-text gateway")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a JSON5 config file (default: ~/.mediascribe/config.json5)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Convert a local file to text without the HTTP layer
    Convert {
        /// Media kind: image, audio or video
        kind: MediaKind,

        /// File to convert
        path: PathBuf,
    },
    /// Print the resolved configuration and whether it is usable
    Health,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => {
            // Fails here, before any listener exists, when the API key is missing.
            let config = mediascribe_config::load_config(config_path)
                .context("Failed to load configuration")?;
            let config = apply_overrides(config, host, port);
            let provider = GeminiProvider::from_config(&config.provider)
                .context("Failed to build provider client")?;

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(mediascribe_gateway::start_gateway(config, Arc::new(provider)))
                .map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        Commands::Convert { kind, path } => {
            let config = mediascribe_config::load_config(config_path)
                .context("Failed to load configuration")?;
            let rt = tokio::runtime::Runtime::new()?;
            let text = rt.block_on(convert::run_convert(&config, kind, &path))?;
            println!("{text}");
        }
        Commands::Health => {
            // Unvalidated, so an incomplete setup can still be inspected.
            let config = mediascribe_config::resolve_config(config_path)
                .context("Failed to load configuration")?;
            print!("{}", health_report(&config));
            config.validate().context("Configuration is not usable")?;
        }
    }

    Ok(())
}

/// Resolved configuration with the API key masked, plus the validation status.
fn health_report(config: &MediascribeConfig) -> String {
    let api_key = if config.provider.api_key.is_blank() {
        "(not set)".to_string()
    } else {
        config.provider.api_key.masked()
    };
    let status = match config.validate() {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    };

    let mut report = String::new();
    report.push_str(&format!("  status:       {status}\n"));
    report.push_str(&format!(
        "  listen:       {}:{}\n",
        config.gateway.host, config.gateway.port
    ));
    report.push_str(&format!("  provider:     {}\n", config.provider.base_url));
    report.push_str(&format!("  api key:      {api_key}\n"));
    for kind in MediaKind::ALL {
        report.push_str(&format!(
            "  {:<13} {}\n",
            format!("{kind} model:"),
            config.provider.model_for(kind)
        ));
    }
    report.push_str(&format!(
        "  timeout:      {}s, retries: {}\n",
        config.provider.request_timeout_secs, config.provider.max_retries
    ));
    report
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Apply command-line overrides on top of the loaded configuration.
fn apply_overrides(
    mut config: MediascribeConfig,
    host: Option<String>,
    port: Option<u16>,
) -> MediascribeConfig {
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }
    config
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from(["mediascribe", "convert", "video", "clip.mp4"]).unwrap();
        match cli.command {
            Commands::Convert { kind, path } => {
                assert_eq!(kind, MediaKind::Video);
                assert_eq!(path, PathBuf::from("clip.mp4"));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["mediascribe", "convert", "pdf", "doc.pdf"]).is_err());
    }

    #[test]
    fn test_health_report_without_api_key() {
        let report = health_report(&MediascribeConfig::default());
        assert!(report.contains(
            "status:       GOOGLE_AI_API_KEY environment variable is required"
        ));
        assert!(report.contains("api key:      (not set)"));
        assert!(report.contains("listen:       127.0.0.1:5000"));
        assert!(report.contains("video model:  gemini-2.5-flash"));
    }

    #[test]
    fn test_health_report_masks_key() {
        let mut config = MediascribeConfig::default();
        config.provider.api_key = mediascribe_config::ApiKey::new("AIzaSyExample1234");
        let report = health_report(&config);
        assert!(report.contains("status:       ok"));
        assert!(report.contains("api key:      ****1234"));
        assert!(!report.contains("AIzaSyExample"));
    }

    #[test]
    fn test_apply_overrides() {
        let config = apply_overrides(
            MediascribeConfig::default(),
            Some("0.0.0.0".into()),
            Some(8080),
        );
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 8080);

        let config = apply_overrides(MediascribeConfig::default(), None, None);
        assert_eq!(config.gateway.port, 5000);
    }
}
