use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{warn, Subscriber};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::ServiceConfig;


#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match *self {
            LogLevel::TRACE => "trace",
            LogLevel::DEBUG => "debug",
            LogLevel::INFO => "info",
            LogLevel::WARN => "warn",
            LogLevel::ERROR => "error",
        }
    }
}

/// Level from the command line wins over the config file.
pub fn resolve(service_config: &ServiceConfig, arg_log_level: Option<LogLevel>) -> LoggingConfig {
    let config = service_config.settings.logging.to_owned().unwrap_or_default();
    match arg_log_level {
        Some(level) => LoggingConfig::new(level.as_str().to_owned(), config.format),
        None => config,
    }
}

pub fn run(service_config: &ServiceConfig, arg_log_level: Option<LogLevel>) -> Result<()> {
    init_logging(&resolve(service_config, arg_log_level))
}

/// Install the global subscriber. `RUST_LOG`, when set, replaces the
/// configured level. Everything goes to stderr; stdout carries command output.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let (filter, rejected) = build_filter(&cfg.level, std::env::var("RUST_LOG").ok());

    tracing_subscriber::registry()
        .with(format_layer(&cfg.format).with_filter(filter))
        .try_init()
        .context("tracing subscriber already installed")?;

    if let Some(err) = rejected {
        warn!(error = %err, "invalid log filter, falling back to 'info'");
    }
    Ok(())
}

fn build_filter(level: &str, env_override: Option<String>) -> (EnvFilter, Option<ParseError>) {
    let directives = env_override.filter(|d| !d.trim().is_empty()).unwrap_or_else(|| level.to_owned());
    match EnvFilter::try_new(&directives) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    }
}

fn format_layer<S>(format: &LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(UtcTime::rfc_3339());

    match format {
        // one flat object per line, no color codes
        LogFormat::Json => layer.json().flatten_event(true).with_ansi(false).boxed(),
        LogFormat::Compact => layer
            .compact()
            .with_ansi(std::io::stderr().is_terminal())
            .boxed(),
    }
}
