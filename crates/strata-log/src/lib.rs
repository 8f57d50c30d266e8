//! Structured logging and tracing for the Strata terrain pipeline.
//!
//! Console output with uptime timestamps, module paths and worker thread
//! names, plus JSON file logging in debug builds. The filter honours
//! `RUST_LOG` first and the config's `debug.log_level` second.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use strata_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "info";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "strata.log";

/// Install the global tracing subscriber.
///
/// Console output is always on. In debug builds with a `log_dir`, a JSON copy
/// goes to `log_dir/strata.log`, and its path is returned. If a subscriber is
/// already installed this does nothing and returns `None`.
///
/// ```no_run
/// use strata_config::Config;
/// use strata_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) -> Option<PathBuf> {
    let filter = env_filter(config);
    let filter_desc = filter.to_string();

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime());

    let (file_layer, log_path, file_error) = match log_dir.filter(|_| debug_build).map(open_log_file) {
        Some(Ok((file, path))) => {
            let layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime())
                .json();
            (Some(layer), Some(path), None)
        }
        Some(Err(err)) => (None, None, Some(err)),
        None => (None, None, None),
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        return None;
    }

    if let Some(err) = file_error {
        tracing::warn!(%err, "file logging disabled");
    }
    tracing::debug!(filter = %filter_desc, file = ?log_path, "logging initialized");
    log_path
}

/// Filter from `RUST_LOG`, else from the config, else [`DEFAULT_FILTER`].
///
/// An unparsable config filter falls back to the default.
pub fn env_filter(config: Option<&Config>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(filter_from_config(config)).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn open_log_file(dir: &Path) -> io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE_NAME);
    let file = File::create(&path)?;
    Ok((file, path))
}

/// Resolve the filter string from an optional config.
pub fn filter_from_config(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_config_filter_falls_back_to_default() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let mut config = Config::default();
        config.debug.log_level = "strata_stream=loud".to_string();
        assert_eq!(env_filter(Some(&config)).to_string(), DEFAULT_FILTER);

        config.debug.log_level = "warn,strata_mesh=trace".to_string();
        let filter = env_filter(Some(&config)).to_string();
        assert!(filter.contains("strata_mesh=trace"), "got {filter}");
    }

    #[test]
    fn test_filter_from_config_override() {
        let mut config = Config::default();
        config.debug.log_level = "warn,strata_stream=debug".to_string();
        assert_eq!(filter_from_config(Some(&config)), "warn,strata_stream=debug");
    }

    #[test]
    fn test_filter_from_config_fallbacks() {
        assert_eq!(filter_from_config(None), DEFAULT_FILTER);

        let mut config = Config::default();
        config.debug.log_level.clear();
        assert_eq!(filter_from_config(Some(&config)), DEFAULT_FILTER);
    }

    #[test]
    fn test_subsystem_filters_parse() {
        let valid_filters = [
            "info",
            "debug,strata_terrain=trace",
            "warn,strata_stream=debug,strata_mesh=trace",
            "error",
        ];

        for filter_str in &valid_filters {
            let result = EnvFilter::try_new(*filter_str);
            assert!(result.is_ok(), "Failed to parse filter: {filter_str}");
        }
    }

    #[test]
    fn test_log_file_created_in_nested_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("strata").join("logs");
        let (_file, path) = open_log_file(&dir).unwrap();
        assert_eq!(path, dir.join("strata.log"));
        assert!(path.is_file());
    }

    #[test]
    fn test_log_file_error_when_dir_is_a_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("logs");
        std::fs::write(&blocker, "").unwrap();
        assert!(open_log_file(&blocker).is_err());
    }
}
