use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::monitor::{Endpoint, ProbeMode, ProbeSettings};

/// Env var naming the config file.
pub const CONFIG_PATH_VAR: &str = "CDN_MONITOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("PORT must be a port number, got {0:?}")]
    Port(String),
}

// ─── File schema ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// CDN base URLs, in ranking tie-break order.
    pub cdns: Vec<String>,

    /// Path appended to each base URL, e.g. `"ping.txt"`.
    pub test_file: String,

    pub interval_ms: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default)]
    pub probe_mode: ProbeMode,

    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,

    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}
fn default_results_file() -> PathBuf {
    "results.json".into()
}
fn default_static_dir() -> PathBuf {
    "public".into()
}

impl MonitorConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cdns.is_empty() {
            return Err(ConfigError::Invalid("cdns must list at least one URL".into()));
        }

        let mut seen = HashSet::new();
        for cdn in &self.cdns {
            if cdn.trim().is_empty() {
                return Err(ConfigError::Invalid("cdns must not contain empty URLs".into()));
            }
            if !seen.insert(cdn.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate cdn {cdn:?}")));
            }
        }

        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid("intervalMs must be greater than 0".into()));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid("probeTimeoutMs must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            endpoints: self.cdns.iter().cloned().map(Endpoint::new).collect(),
            probe_path: self.test_file.clone(),
            timeout: self.probe_timeout(),
            interval: self.interval(),
            mode: self.probe_mode,
        }
    }
}

// ─── Environment ─────────────────────────────────────────────────

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.into())
}

/// `PORT` from the environment, or 3000 when unset or blank.
pub fn listen_port() -> Result<u16, ConfigError> {
    parse_port(std::env::var("PORT").ok().as_deref())
}

fn parse_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_PORT),
        Some(port) => port.parse().map_err(|_| ConfigError::Port(port.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cdns": ["https://a.example/", "https://b.example/"],
        "testFile": "ping.txt",
        "intervalMs": 5000
    }"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = MonitorConfig::from_json(SAMPLE).unwrap();

        assert_eq!(config.cdns.len(), 2);
        assert_eq!(config.test_file, "ping.txt");
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.probe_timeout(), Duration::from_secs(3));
        assert_eq!(config.probe_mode, ProbeMode::Concurrent);
        assert_eq!(config.results_file, PathBuf::from("results.json"));
        assert_eq!(config.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn probe_settings_keep_endpoint_order() {
        let settings = MonitorConfig::from_json(SAMPLE).unwrap().probe_settings();

        let urls: Vec<&str> = settings.endpoints.iter().map(|e| e.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/", "https://b.example/"]);
        assert_eq!(settings.probe_path, "ping.txt");
    }

    #[test]
    fn optional_fields_are_honoured() {
        let config = MonitorConfig::from_json(
            r#"{
                "cdns": ["https://a.example/"],
                "testFile": "ping.txt",
                "intervalMs": 1000,
                "probeTimeoutMs": 750,
                "probeMode": "sequential",
                "resultsFile": "/tmp/out.json"
            }"#,
        )
        .unwrap();

        assert_eq!(config.probe_timeout(), Duration::from_millis(750));
        assert_eq!(config.probe_mode, ProbeMode::Sequential);
        assert_eq!(config.results_file, PathBuf::from("/tmp/out.json"));
    }

    #[test]
    fn rejects_invalid_configs() {
        let cases = [
            r#"{"cdns": [], "testFile": "x", "intervalMs": 1000}"#,
            r#"{"cdns": ["https://a/", "https://a/"], "testFile": "x", "intervalMs": 1000}"#,
            r#"{"cdns": ["https://a/"], "testFile": "x", "intervalMs": 0}"#,
            r#"{"cdns": ["https://a/"], "testFile": "x", "intervalMs": 10, "probeTimeoutMs": 0}"#,
        ];
        for raw in cases {
            assert!(
                matches!(MonitorConfig::from_json(raw), Err(ConfigError::Invalid(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let err = MonitorConfig::from_json(r#"{"cdns": ["https://a/"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn blank_port_falls_back_to_default() {
        assert_eq!(parse_port(None).unwrap(), DEFAULT_PORT);
        assert_eq!(parse_port(Some("")).unwrap(), DEFAULT_PORT);
        assert_eq!(parse_port(Some("   ")).unwrap(), DEFAULT_PORT);
        assert_eq!(parse_port(Some(" 8080 ")).unwrap(), 8080);
        assert!(matches!(parse_port(Some("http")), Err(ConfigError::Port(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MonitorConfig::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
