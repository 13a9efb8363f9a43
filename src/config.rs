use crate::widget::{InputMetrics, KeywordFilter, WidgetSettings};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Default answering service endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5001/ask";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Question answering endpoint
    #[arg(long, env = "ASK_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Pause before the reply placeholder appears, in milliseconds
    #[arg(long)]
    pub reply_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub widget: WidgetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub endpoint: String,
    pub reply_delay_ms: u64,
    pub desktop_min_width: u32,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    pub line_height: u32,
    pub vertical_padding: u32,
    #[serde(default)]
    pub keyword_filter: KeywordFilter,
}

impl WidgetConfig {
    /// Behavioral settings handed to every new widget.
    #[must_use]
    pub fn settings(&self) -> WidgetSettings {
        WidgetSettings {
            reply_delay: Duration::from_millis(self.reply_delay_ms),
            desktop_min_width: self.desktop_min_width,
            metrics: InputMetrics {
                line_height: self.line_height,
                vertical_padding: self.vertical_padding,
            },
            filter: self.keyword_filter.clone(),
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let metrics = InputMetrics::default();
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("widget.endpoint", DEFAULT_ENDPOINT)?
            .set_default("widget.reply_delay_ms", 600)?
            .set_default("widget.desktop_min_width", 768)?
            .set_default("widget.line_height", i64::from(metrics.line_height))?
            .set_default("widget.vertical_padding", i64::from(metrics.vertical_padding))?
            .set_default("widget.keyword_filter.enabled", false)?;

        // Explicit file must exist; ./config.{yaml,toml,json} is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. WIDGET_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("WIDGET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("widget.keyword_filter.keywords"),
        );

        // CLI flags (and their env fallbacks) win over everything else.
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(endpoint) = cli.endpoint {
            builder = builder.set_override("widget.endpoint", endpoint)?;
        }
        if let Some(delay) = cli.reply_delay_ms {
            builder = builder
                .set_override("widget.reply_delay_ms", i64::try_from(delay).unwrap_or(i64::MAX))?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let config = AppConfig::load_from_args([
            "chat-widget",
            "--port",
            "4100",
            "--endpoint",
            "http://answers.internal:9000/ask",
            "--reply-delay-ms",
            "0",
        ])
        .unwrap();

        assert_eq!(config.server.port, 4100);
        assert_eq!(config.widget.endpoint, "http://answers.internal:9000/ask");
        assert_eq!(config.widget.settings().reply_delay, Duration::ZERO);
    }

    #[test]
    fn test_unknown_flag_is_an_error() {
        assert!(AppConfig::load_from_args(["chat-widget", "--nope"]).is_err());
    }
}
