//! Configuration for qpas-storage

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qpas-storage")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Page size used when a list request names none
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,

    /// Upper bound for any requested page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,

    /// How many institutions the featured listing shows
    #[serde(default = "default_featured_institutions")]
    pub featured_institutions_limit: i64,

    /// Recent papers shown on a dashboard
    #[serde(default = "default_dashboard_recent")]
    pub dashboard_recent_limit: i64,

    /// Metric rows shown on a dashboard
    #[serde(default = "default_dashboard_metrics")]
    pub dashboard_metrics_limit: i64,

    /// Trailing window for the "recent uploads" statistic
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,

    /// Require the institution to exist before recording a metric
    #[serde(default)]
    pub enforce_metric_institution: bool,
}

fn default_http_port() -> u16 {
    8095
}

fn default_page_size() -> i64 {
    20
}

fn default_max_page_size() -> i64 {
    100
}

fn default_featured_institutions() -> i64 {
    6
}

fn default_dashboard_recent() -> i64 {
    5
}

fn default_dashboard_metrics() -> i64 {
    10
}

fn default_recent_window_days() -> i64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            featured_institutions_limit: default_featured_institutions(),
            dashboard_recent_limit: default_dashboard_recent(),
            dashboard_metrics_limit: default_dashboard_metrics(),
            recent_window_days: default_recent_window_days(),
            enforce_metric_institution: false,
        }
    }
}

impl Config {
    /// Load and validate config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ArchiveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits and windows that would not bound a query
    pub fn validate(&self) -> Result<(), ArchiveError> {
        let positive = [
            ("default_page_size", self.default_page_size),
            ("max_page_size", self.max_page_size),
            ("featured_institutions_limit", self.featured_institutions_limit),
            ("dashboard_recent_limit", self.dashboard_recent_limit),
            ("dashboard_metrics_limit", self.dashboard_metrics_limit),
            ("recent_window_days", self.recent_window_days),
        ];
        for (name, value) in positive {
            if value < 1 {
                return Err(ArchiveError::Config(format!(
                    "{} must be at least 1, got {}",
                    name, value
                )));
            }
        }
        if self.max_page_size < self.default_page_size {
            return Err(ArchiveError::Config(format!(
                "max_page_size ({}) is below default_page_size ({})",
                self.max_page_size, self.default_page_size
            )));
        }
        Ok(())
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get database file path
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join("archive.db")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("http_port = 9000\nmax_page_size = 50\n").unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.recent_window_days, 30);
        assert!(!config.enforce_metric_institution);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage_dir = dir.path().to_path_buf();
        config.enforce_metric_institution = true;

        config.save(config.config_path()).unwrap();
        let loaded = Config::load(config.config_path()).unwrap();

        assert!(loaded.enforce_metric_institution);
        assert_eq!(loaded.database_path(), dir.path().join("archive.db"));
    }

    #[test]
    fn test_load_rejects_unbounded_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        for bad in [
            "dashboard_recent_limit = -1\n",
            "dashboard_metrics_limit = 0\n",
            "recent_window_days = -30\n",
            "default_page_size = 0\n",
            "default_page_size = 50\nmax_page_size = 10\n",
        ] {
            std::fs::write(&path, bad).unwrap();
            let err = Config::load(&path).unwrap_err();
            assert!(matches!(err, ArchiveError::Config(_)), "{} -> {:?}", bad, err);
        }

        std::fs::write(&path, "dashboard_recent_limit = 1\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().dashboard_recent_limit, 1);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
        let config = Config {
            featured_institutions_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
