//! Processing context shared by every pipeline stage.

use camino::Utf8PathBuf;
use clap::{Args, ValueEnum};
use core::time::Duration;
use directories::BaseDirs;
use esm_inventory::Result;
use esm_inventory::config::Config;
use esm_inventory::progress::ProgressReporter;
use ohno::IntoAppError;
use std::path::PathBuf;

/// Log level for diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and above messages
    Debug,
    /// All messages including trace
    Trace,
}

/// Arguments shared between the pipeline stage commands.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to configuration file [default: one of inventory.[toml|yml|yaml|json] ]
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Directory where fetched records are cached [default: platform cache directory]
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: LogLevel,
}

/// Shared stage context: validated configuration, cache location, and the
/// progress reporter.
#[derive(Debug)]
pub struct Common {
    pub config: Config,
    pub cache_dir: PathBuf,
    pub progress: ProgressReporter,
}

impl Common {
    /// Build the stage context. Configuration problems are fatal here,
    /// before the stage touches any output.
    pub fn new(args: &CommonArgs) -> Result<Self> {
        Self::init_logging(args.log_level);

        let config = Config::load(args.config.as_deref().map(camino::Utf8Path::as_std_path))?;

        let cache_dir = if let Some(cache_path) = &args.cache_dir {
            cache_path.as_std_path().to_path_buf()
        } else {
            BaseDirs::new()
                .into_app_err("unable to determine cache directory")?
                .cache_dir()
                .join("esm-inventory")
        };

        // The progress bar would interleave with log output, so it only
        // appears when logging is off.
        let delay = if args.log_level == LogLevel::None {
            Duration::from_millis(500)
        } else {
            Duration::MAX
        };

        Ok(Self {
            config,
            cache_dir,
            progress: ProgressReporter::new(delay),
        })
    }

    /// Initialize logger based on log level.
    fn init_logging(log_level: LogLevel) {
        if log_level == LogLevel::None {
            return;
        }

        let level = match log_level {
            LogLevel::None => return,
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        let env = env_logger::Env::default().filter_or("RUST_LOG", level);

        env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
            .init();
    }

    /// TTL for cached ecosyste.ms repository records.
    #[must_use]
    pub const fn stats_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.stats_cache_ttl * 24 * 60 * 60)
    }
}
