//! [`FileStore`](super::FileStore) configuration.

use std::path::PathBuf;

const DEFAULT_MAX_BYTES: u64 = 500 * 1024 * 1024;
const DEFAULT_WARN_PERCENT: u8 = 80;
const DEFAULT_REDACT_VALUE: &str = "[REDACTED]";

fn default_filter_headers() -> Vec<String> {
    [
        "Authorization",
        "Cookie",
        "Set-Cookie",
        "X-API-Key",
        "X-Auth-Token",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Configuration for a [`FileStore`](super::FileStore).
///
/// Zero-valued numeric fields and empty collection fields are treated as
/// "unset" and replaced with defaults in [`StorageConfig::normalized`].
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub max_bytes: u64,
    pub warn_percent: u8,
    pub filter_headers: Vec<String>,
    pub filter_body_keys: Vec<String>,
    pub redact_value: String,
}

impl StorageConfig {
    /// Builds a config pointed at `data_dir` with every other field defaulted.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default_values()
        }
    }

    fn default_values() -> Self {
        Self {
            data_dir: PathBuf::new(),
            max_bytes: DEFAULT_MAX_BYTES,
            warn_percent: DEFAULT_WARN_PERCENT,
            filter_headers: default_filter_headers(),
            filter_body_keys: Vec::new(),
            redact_value: DEFAULT_REDACT_VALUE.to_string(),
        }
    }

    /// Returns a copy with zero/empty fields replaced by their defaults.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.max_bytes == 0 {
            cfg.max_bytes = DEFAULT_MAX_BYTES;
        }
        if cfg.warn_percent == 0 {
            cfg.warn_percent = DEFAULT_WARN_PERCENT;
        }
        if cfg.filter_headers.is_empty() {
            cfg.filter_headers = default_filter_headers();
        }
        if cfg.redact_value.is_empty() {
            cfg.redact_value = DEFAULT_REDACT_VALUE.to_string();
        }
        cfg
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::default_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_bytes_falls_back_to_default() {
        let cfg = StorageConfig {
            max_bytes: 0,
            ..StorageConfig::new("/tmp/x")
        };
        assert_eq!(cfg.normalized().max_bytes, DEFAULT_MAX_BYTES);
    }

    #[test]
    fn empty_filter_headers_falls_back_to_default_list() {
        let cfg = StorageConfig {
            filter_headers: Vec::new(),
            ..StorageConfig::new("/tmp/x")
        };
        assert!(cfg.normalized().filter_headers.contains(&"Authorization".to_string()));
    }

    #[test]
    fn empty_redact_value_falls_back_to_default() {
        let cfg = StorageConfig {
            redact_value: String::new(),
            ..StorageConfig::new("/tmp/x")
        };
        assert_eq!(cfg.normalized().redact_value, "[REDACTED]");
    }
}
