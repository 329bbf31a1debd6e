//! Log setup for the `stockkeep` binary
//!
//! Events go to stderr so command output on stdout stays machine readable.
//! `RUST_LOG` overrides `--log-level` when set.

use std::fmt;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable plaintext format
    #[default]
    Plaintext,
    /// Structured JSON format
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Plaintext => write!(f, "plaintext"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// CLI log level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error conditions
    Error,
    /// Errors and warnings
    #[default]
    Warn,
    /// Errors, warnings, and informational messages
    Info,
    /// All above plus debug information
    Debug,
    /// All above plus detailed tracing
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

/// Logging flags shared by every subcommand
#[derive(Clone, Debug, Default, clap::Args)]
pub struct CliLoggingArgs {
    /// Log verbosity level
    #[arg(long, global = true, value_enum, help = "Log verbosity level (default: warn)")]
    pub log_level: Option<CliLogLevel>,

    /// Log output format
    #[arg(long, global = true, value_enum, help = "Log output format (default: plaintext)")]
    pub log_format: Option<LogFormat>,
}

impl CliLoggingArgs {
    /// Filter directive for the chosen level
    fn directive(&self) -> String {
        let level = Level::from(self.log_level.unwrap_or_default());
        format!("{level},stockkeep_core={level},stockkeep={level}").to_lowercase()
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// A subscriber is already installed
    pub fn init(&self) -> anyhow::Result<()> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()));

        match self.log_format.unwrap_or_default() {
            LogFormat::Json => {
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .json();
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init()?;
            }
            LogFormat::Plaintext => {
                let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init()?;
            }
        }
        Ok(())
    }
}
