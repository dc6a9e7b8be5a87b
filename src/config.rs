//! Application configuration
//!
//! One YAML or JSON file (chosen by extension) with a section per provider
//! plus shared progress and retry settings. Credentials are resolved here,
//! once, and handed to the providers as plain values:
//!
//! ```yaml
//! progress:
//!   step_percent: 10
//! retry:
//!   max_passes: 3
//! moralis:
//!   api_key_env: MORALIS_KEY
//! tatum:
//!   credentials_file: ./tatum.json
//!   credentials_key: api_key_free_mainnet
//!   rate_limit: 5
//! opensea:
//!   rate_limit: 0.5
//! ```

use crate::error::{Error, Result, ResultExt};
use crate::progress::ProgressConfig;
use crate::providers::ProviderConfig;
use crate::retry::DEFAULT_MAX_PASSES;
use crate::types::{JsonValue, Scheme};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Providers
// ============================================================================

/// The providers chainfetch talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Moralis,
    Tatum,
    OpenSea,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Moralis => "moralis",
            ProviderKind::Tatum => "tatum",
            ProviderKind::OpenSea => "opensea",
        }
    }

    /// Environment variable consulted when a section names no key source
    fn default_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::Moralis => Some("MORALIS_KEY"),
            ProviderKind::Tatum | ProviderKind::OpenSea => None,
        }
    }

    /// Key looked up in a credentials file when none is configured
    fn default_credentials_key(self) -> &'static str {
        match self {
            ProviderKind::Tatum => "api_key_free_mainnet",
            _ => "api_key",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Config Sections
// ============================================================================

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub moralis: ProviderSection,

    #[serde(default)]
    pub tatum: ProviderSection,

    #[serde(default)]
    pub opensea: ProviderSection,
}

/// Retry settings for bulk operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Passes over failing items
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
        }
    }
}

fn default_max_passes() -> u32 {
    DEFAULT_MAX_PASSES
}

/// One provider's section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSection {
    /// Inline API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// JSON file holding the API key
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    /// Key inside `credentials_file`
    #[serde(default)]
    pub credentials_key: Option<String>,

    /// Host override
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub scheme: Option<Scheme>,

    /// Calls per second
    #[serde(default)]
    pub rate_limit: Option<f64>,

    #[serde(default)]
    pub page_size: Option<u32>,

    /// Per-call timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Record limit for paginated fetches
    #[serde(default)]
    pub max_records: Option<usize>,
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    /// Load a config file; `.json` is parsed as JSON, anything else as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.progress.step_percent) {
            return Err(Error::invalid_value(
                "progress.step_percent",
                format!("expected 1..=100, got {}", self.progress.step_percent),
            ));
        }
        if self.retry.max_passes == 0 {
            return Err(Error::invalid_value("retry.max_passes", "must be at least 1"));
        }
        for kind in [ProviderKind::Moralis, ProviderKind::Tatum, ProviderKind::OpenSea] {
            let section = self.section(kind);
            if let Some(rate) = section.rate_limit {
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(Error::invalid_value(
                        format!("{kind}.rate_limit"),
                        format!("expected a positive number, got {rate}"),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn section(&self, kind: ProviderKind) -> &ProviderSection {
        match kind {
            ProviderKind::Moralis => &self.moralis,
            ProviderKind::Tatum => &self.tatum,
            ProviderKind::OpenSea => &self.opensea,
        }
    }

    /// Build a provider's settings, resolving its credentials
    pub fn provider_config(&self, kind: ProviderKind) -> Result<ProviderConfig> {
        let section = self.section(kind);
        Ok(ProviderConfig {
            api_key: section.resolve_api_key(kind)?,
            host: section.host.clone(),
            scheme: section.scheme.unwrap_or_default(),
            rate_limit: section.rate_limit,
            page_size: section.page_size,
            timeout: section.timeout_secs.map(Duration::from_secs),
            progress: self.progress,
            max_passes: self.retry.max_passes,
            max_records: section.max_records.unwrap_or(0),
        })
    }
}

impl ProviderSection {
    /// Resolve the API key: inline value, then environment, then file.
    ///
    /// With no source configured the provider's conventional environment
    /// variable is tried; its absence is not an error.
    pub fn resolve_api_key(&self, kind: ProviderKind) -> Result<Option<String>> {
        if let Some(key) = &self.api_key {
            return Ok(Some(key.clone()));
        }

        if let Some(var) = &self.api_key_env {
            return std::env::var(var).map(Some).map_err(|_| {
                Error::config(format!(
                    "{kind}: environment variable '{var}' is not set"
                ))
            });
        }

        if let Some(file) = &self.credentials_file {
            let key = self
                .credentials_key
                .as_deref()
                .unwrap_or_else(|| kind.default_credentials_key());
            return read_credentials_file(file, key).map(Some);
        }

        Ok(kind
            .default_key_env()
            .and_then(|var| std::env::var(var).ok()))
    }
}

/// Read one string key from a JSON credentials file
fn read_credentials_file(path: &Path, key: &str) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::Io(e)
        }
    })?;

    let creds: JsonValue = serde_json::from_str(&content)
        .with_context(|| format!("Invalid credentials file '{}'", path.display()))?;
    creds
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::missing_field(format!("{}: {key}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_minimal_config() {
        let config = AppConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.progress, ProgressConfig::default());
        assert_eq!(config.retry.max_passes, 3);
        assert!(config.moralis.api_key.is_none());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
progress:
  step_percent: 5
  include_eta: false
retry:
  max_passes: 4
moralis:
  api_key: "inline-key"
  rate_limit: 2
  page_size: 100
  timeout_secs: 10
  max_records: 250
tatum:
  host: "127.0.0.1:8080"
  scheme: http
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.progress.step_percent, 5);
        assert!(!config.progress.include_eta);

        let moralis = config.provider_config(ProviderKind::Moralis).unwrap();
        assert_eq!(moralis.api_key.as_deref(), Some("inline-key"));
        assert_eq!(moralis.rate_limit, Some(2.0));
        assert_eq!(moralis.page_size, Some(100));
        assert_eq!(moralis.timeout, Some(Duration::from_secs(10)));
        assert_eq!(moralis.max_passes, 4);
        assert_eq!(moralis.max_records, 250);
        assert_eq!(
            config.provider_config(ProviderKind::Tatum).unwrap().max_records,
            0
        );

        let tatum = &config.tatum;
        assert_eq!(tatum.host.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(tatum.scheme, Some(Scheme::Http));
    }

    #[test]
    fn test_load_json_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"opensea": {{"rate_limit": 0.25}}}}"#).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.opensea.rate_limit, Some(0.25));
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "retry:\n  max_passes: 2").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.retry.max_passes, 2);
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("/nonexistent/chainfetch.yaml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_yaml_str("moralis:\n  rate_limit: 0").is_err());
        assert!(AppConfig::from_yaml_str("retry:\n  max_passes: 0").is_err());
        assert!(AppConfig::from_yaml_str("progress:\n  step_percent: 0").is_err());
        assert!(AppConfig::from_yaml_str("unknown_section: {}").is_err());
    }

    #[test]
    fn test_api_key_from_env() {
        std::env::set_var("CHAINFETCH_TEST_KEY_A", "from-env");
        let section = ProviderSection {
            api_key_env: Some("CHAINFETCH_TEST_KEY_A".to_string()),
            ..ProviderSection::default()
        };
        assert_eq!(
            section.resolve_api_key(ProviderKind::Moralis).unwrap(),
            Some("from-env".to_string())
        );

        let missing = ProviderSection {
            api_key_env: Some("CHAINFETCH_TEST_KEY_UNSET".to_string()),
            ..ProviderSection::default()
        };
        assert!(missing
            .resolve_api_key(ProviderKind::Moralis)
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_api_key_from_credentials_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tatum.json");
        fs::write(&path, r#"{"api_key_free_mainnet": "file-key", "other": "x"}"#).unwrap();

        let section = ProviderSection {
            credentials_file: Some(path.clone()),
            ..ProviderSection::default()
        };
        assert_eq!(
            section.resolve_api_key(ProviderKind::Tatum).unwrap(),
            Some("file-key".to_string())
        );

        let wrong_key = ProviderSection {
            credentials_file: Some(path),
            credentials_key: Some("missing".to_string()),
            ..ProviderSection::default()
        };
        let err = wrong_key.resolve_api_key(ProviderKind::Tatum).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[test]
    fn test_malformed_credentials_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "api_key: not json").unwrap();

        let section = ProviderSection {
            credentials_file: Some(path),
            ..ProviderSection::default()
        };
        let err = section.resolve_api_key(ProviderKind::Moralis).unwrap_err();
        assert!(err.to_string().contains("Invalid credentials file"));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_inline_key_wins() {
        let section = ProviderSection {
            api_key: Some("inline".to_string()),
            api_key_env: Some("CHAINFETCH_TEST_KEY_UNSET".to_string()),
            ..ProviderSection::default()
        };
        assert_eq!(
            section.resolve_api_key(ProviderKind::OpenSea).unwrap(),
            Some("inline".to_string())
        );
    }
}
