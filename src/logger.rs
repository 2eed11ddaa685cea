//! Logging setup on top of tracing-subscriber.
//!
//! The active filter is picked from three places, first match wins:
//!
//! 1. `RUST_LOG`, full `EnvFilter` directive syntax (`study_assistant=debug,reqwest=warn`)
//! 2. `STUDY_LOG_LEVEL`, a single level name
//! 3. `[supervisor] log_level` from the config file
//!
//! An unparsable `RUST_LOG` is reported and skipped. An unknown
//! `STUDY_LOG_LEVEL` is an error. Output goes to stderr because the console
//! channel owns stdout.

use std::fmt;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub const ENV_LOG_LEVEL: &str = "STUDY_LOG_LEVEL";

/// Where the active filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    RustLog,
    StudyLogLevel,
    Config,
}

impl fmt::Display for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterSource::RustLog => "RUST_LOG",
            FilterSource::StudyLogLevel => ENV_LOG_LEVEL,
            FilterSource::Config => "config",
        })
    }
}

/// The filter directives chosen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub directives: String,
    pub source: FilterSource,
    /// A `RUST_LOG` value that was set but could not be parsed.
    pub rejected_rust_log: Option<String>,
}

/// Choose the filter from the raw variable values. Blank values count as
/// unset.
pub fn select_filter(
    rust_log: Option<&str>,
    study_level: Option<&str>,
    config_level: &str,
) -> Result<LogFilter, AppError> {
    fn set(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|s| !s.is_empty())
    }

    let mut rejected_rust_log = None;
    if let Some(directives) = set(rust_log) {
        if EnvFilter::try_new(directives).is_ok() {
            return Ok(LogFilter {
                directives: directives.to_string(),
                source: FilterSource::RustLog,
                rejected_rust_log,
            });
        }
        rejected_rust_log = Some(directives.to_string());
    }

    let (level, source) = match set(study_level) {
        Some(level) => (level, FilterSource::StudyLogLevel),
        None => (config_level.trim(), FilterSource::Config),
    };
    parse_level(level).map_err(|e| AppError::Logger(format!("{source}: {e}")))?;

    Ok(LogFilter { directives: level.to_ascii_lowercase(), source, rejected_rust_log })
}

/// Install the global subscriber, reading `RUST_LOG` and `STUDY_LOG_LEVEL`
/// from the process environment. Returns the filter that was applied.
pub fn init(config_level: &str) -> Result<LogFilter, AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let study_level = std::env::var(ENV_LOG_LEVEL).ok();
    let filter = select_filter(rust_log.as_deref(), study_level.as_deref(), config_level)?;

    let env_filter = EnvFilter::try_new(&filter.directives)
        .map_err(|e| AppError::Logger(format!("invalid filter '{}': {e}", filter.directives)))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    if let Some(bad) = &filter.rejected_rust_log {
        tracing::warn!(rust_log = %bad, fallback = %filter.source, "RUST_LOG ignored, cannot be parsed");
    }
    Ok(filter)
}

/// Parse a single level name. Used to validate `[supervisor] log_level`.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
