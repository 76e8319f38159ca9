use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bands: BandsConfig,
}

/// Thresholds that split each table column into green/yellow/red.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BandsConfig {
    #[serde(default = "default_latency_warn_ms")]
    pub latency_warn_ms: f64,
    #[serde(default = "default_latency_bad_ms")]
    pub latency_bad_ms: f64,
    /// Fraction of echo replies received, so counts with different ping
    /// counts band the same way.
    #[serde(default = "default_loss_good_ratio")]
    pub loss_good_ratio: f64,
    #[serde(default = "default_loss_warn_ratio")]
    pub loss_warn_ratio: f64,
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            latency_warn_ms: default_latency_warn_ms(),
            latency_bad_ms: default_latency_bad_ms(),
            loss_good_ratio: default_loss_good_ratio(),
            loss_warn_ratio: default_loss_warn_ratio(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bands = &self.bands;
        if !bands.latency_warn_ms.is_finite() || bands.latency_warn_ms <= 0.0 {
            return Err(ConfigError::Validation(
                "bands.latency_warn_ms must be > 0".to_string(),
            ));
        }
        if !bands.latency_bad_ms.is_finite() || bands.latency_bad_ms <= 0.0 {
            return Err(ConfigError::Validation(
                "bands.latency_bad_ms must be > 0".to_string(),
            ));
        }
        if bands.latency_warn_ms > bands.latency_bad_ms {
            return Err(ConfigError::Validation(
                "bands.latency_warn_ms must be <= bands.latency_bad_ms".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&bands.loss_good_ratio) {
            return Err(ConfigError::Validation(
                "bands.loss_good_ratio must be in range 0..1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&bands.loss_warn_ratio) {
            return Err(ConfigError::Validation(
                "bands.loss_warn_ratio must be in range 0..1".to_string(),
            ));
        }
        if bands.loss_warn_ratio > bands.loss_good_ratio {
            return Err(ConfigError::Validation(
                "bands.loss_warn_ratio must be <= bands.loss_good_ratio".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

#[derive(Debug, Error)]
pub enum HostListError {
    #[error("failed to read host file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Reads one host per line. Blank lines and `#` comments are skipped;
/// surrounding whitespace is trimmed. An empty result is not an error here,
/// startup decides what to do with it.
pub fn load_host_file(path: impl AsRef<Path>) -> Result<Vec<String>, HostListError> {
    let path_ref = path.as_ref();
    let text = fs::read_to_string(path_ref).map_err(|source| HostListError::Read {
        path: path_ref.display().to_string(),
        source,
    })?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

const fn default_latency_warn_ms() -> f64 {
    50.0
}

const fn default_latency_bad_ms() -> f64 {
    100.0
}

const fn default_loss_good_ratio() -> f64 {
    1.0
}

const fn default_loss_warn_ratio() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn valid_config() -> Config {
        Config {
            bands: BandsConfig::default(),
        }
    }

    #[test]
    fn defaults_validate() {
        valid_config().validate().expect("defaults should be valid");
    }

    #[test]
    fn example_yaml_parses_and_matches_defaults() {
        let cfg: Config =
            serde_yaml::from_str(Config::example_yaml()).expect("example should parse");
        cfg.validate().expect("example should be valid");
        assert_eq!(cfg.bands.latency_warn_ms, 50.0);
        assert_eq!(cfg.bands.latency_bad_ms, 100.0);
        assert_eq!(cfg.bands.loss_good_ratio, 1.0);
        assert_eq!(cfg.bands.loss_warn_ratio, 0.5);
    }

    #[test]
    fn empty_document_falls_back_to_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").expect("empty mapping should parse");
        assert_eq!(cfg.bands.latency_warn_ms, 50.0);
        assert_eq!(cfg.bands.loss_warn_ratio, 0.5);
    }

    #[test]
    fn rejects_inverted_latency_bands() {
        let mut cfg = valid_config();
        cfg.bands.latency_warn_ms = 200.0;
        cfg.bands.latency_bad_ms = 100.0;
        let err = cfg.validate().expect_err("inverted bands should fail");
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_loss_ratio_outside_unit_range() {
        let mut cfg = valid_config();
        cfg.bands.loss_good_ratio = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = valid_config();
        cfg.bands.loss_warn_ratio = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_loss_ratios() {
        let mut cfg = valid_config();
        cfg.bands.loss_good_ratio = 0.5;
        cfg.bands.loss_warn_ratio = 0.9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_latency() {
        let mut cfg = valid_config();
        cfg.bands.latency_warn_ms = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_from_file_reports_missing_file() {
        let err = Config::load_from_file("/nonexistent/hostmon.yaml")
            .expect_err("missing file should fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_from_file_reports_bad_yaml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "bands: [not, a, mapping]").expect("write");
        let err = Config::load_from_file(file.path()).expect_err("bad yaml should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn host_file_skips_blanks_and_comments() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "# primary targets").expect("write");
        writeln!(file, "example.com").expect("write");
        writeln!(file).expect("write");
        writeln!(file, "  192.0.2.7  ").expect("write");
        writeln!(file, "http://intranet.local:8080/health").expect("write");

        let hosts = load_host_file(file.path()).expect("host file should load");
        assert_eq!(
            hosts,
            vec![
                "example.com",
                "192.0.2.7",
                "http://intranet.local:8080/health"
            ]
        );
    }

    #[test]
    fn empty_host_file_yields_empty_list() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let hosts = load_host_file(file.path()).expect("empty file should load");
        assert!(hosts.is_empty());
    }

    #[test]
    fn missing_host_file_is_an_error() {
        let err = load_host_file("/nonexistent/hosts.txt").expect_err("missing file should fail");
        assert!(matches!(err, HostListError::Read { .. }));
    }
}
