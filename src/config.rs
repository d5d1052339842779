//! Configuration loaded from environment variables
//!
//! Command line flags override these values.

use std::path::PathBuf;

use crate::timeline::DEFAULT_SKIP_ROWS;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory the output dataset is written to
    pub output_dir: PathBuf,

    /// Preamble records at the top of the size/time log, header row included
    pub log_skip_rows: usize,

    /// Capture processing threads; 1 processes files on the main thread
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            log_skip_rows: DEFAULT_SKIP_ROWS,
            workers: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            output_dir: lookup("WXRX_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),

            log_skip_rows: lookup("WXRX_LOG_SKIP_ROWS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.log_skip_rows),

            workers: lookup("WXRX_WORKERS")
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.workers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(from_pairs(&[]), Config::default());
        assert_eq!(Config::default().log_skip_rows, 4);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("WXRX_OUTPUT_DIR", "/data/out"),
            ("WXRX_LOG_SKIP_ROWS", "1"),
            ("WXRX_WORKERS", "4"),
        ]);
        assert_eq!(config.output_dir, PathBuf::from("/data/out"));
        assert_eq!(config.log_skip_rows, 1);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[("WXRX_LOG_SKIP_ROWS", "four"), ("WXRX_WORKERS", "0")]);
        assert_eq!(config.log_skip_rows, 4);
        assert_eq!(config.workers, 1);
    }
}
