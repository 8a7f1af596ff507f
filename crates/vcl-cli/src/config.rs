//! # Demo Configuration
//!
//! Loaded from an optional YAML file, then overridden from the environment:
//!
//! | Variable             | Field            |
//! |----------------------|------------------|
//! | `VCL_MAX_CRED_NUM`   | `max_cred_num`   |
//! | `VCL_TAILS_LOCATION` | `tails_location` |
//! | `VCL_LOG_FORMAT`     | `log_format`     |
//!
//! Every field has a default, so an empty file and no file are equivalent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vcl_vc::PredicateType;

/// Configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid YAML for this shape.
    #[error("parsing config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An override variable holds an unusable value.
    #[error("{var}={value:?}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Its value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The loaded values are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Log output format of the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}, expected text or json")),
        }
    }
}

/// Schema published by the demo issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub name: String,
    pub version: String,
    pub attributes: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            name: "gvt".into(),
            version: "1.0".into(),
            attributes: vec!["name".into(), "age".into(), "sex".into(), "height".into()],
        }
    }
}

/// Predicate the demo verifier asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateConfig {
    pub attribute: String,
    pub p_type: PredicateType,
    pub value: i32,
}

/// Everything `vcl demo` needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Seed of the issuer's signing key.
    pub issuer_seed: String,
    /// Seed of the holder's signing key.
    pub holder_seed: String,
    pub schema: SchemaConfig,
    /// Tag for the credential definition and the registry.
    pub tag: String,
    /// Registry capacity.
    pub max_cred_num: u32,
    /// Where the registry says its tails file lives.
    pub tails_location: Option<String>,
    /// Raw attribute values of the issued credential.
    pub values: BTreeMap<String, String>,
    /// Attributes the verifier asks to see.
    pub reveal: Vec<String>,
    pub predicate: Option<PredicateConfig>,
    pub log_format: LogFormat,
}

impl Default for DemoConfig {
    fn default() -> Self {
        let values = [("name", "Alex"), ("age", "28"), ("sex", "male"), ("height", "175")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            issuer_seed: "vcl-demo-issuer".into(),
            holder_seed: "vcl-demo-holder".into(),
            schema: SchemaConfig::default(),
            tag: "default".into(),
            max_cred_num: 100,
            tails_location: None,
            values,
            reveal: vec!["name".into()],
            predicate: Some(PredicateConfig {
                attribute: "age".into(),
                p_type: PredicateType::GE,
                value: 18,
            }),
            log_format: LogFormat::Text,
        }
    }
}

impl DemoConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml_str(&content)?
            }
            None => Self::default(),
        };
        let config = config.with_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML. Missing fields keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("VCL_MAX_CRED_NUM") {
            self.max_cred_num = value.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnv {
                    var: "VCL_MAX_CRED_NUM",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(value) = lookup("VCL_TAILS_LOCATION") {
            self.tails_location = Some(value);
        }
        if let Some(value) = lookup("VCL_LOG_FORMAT") {
            self.log_format = value.parse().map_err(|reason| ConfigError::InvalidEnv {
                var: "VCL_LOG_FORMAT",
                value: value.clone(),
                reason,
            })?;
        }
        Ok(self)
    }

    /// Cross-field checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cred_num == 0 {
            return Err(ConfigError::Invalid("max_cred_num must be at least 1".into()));
        }
        let known = |name: &String| self.schema.attributes.contains(name);
        if let Some(name) = self.values.keys().find(|&n| !known(n)) {
            return Err(ConfigError::Invalid(format!(
                "value given for {name:?}, which the schema does not define"
            )));
        }
        if let Some(name) = self.schema.attributes.iter().find(|n| !self.values.contains_key(*n)) {
            return Err(ConfigError::Invalid(format!("no value for attribute {name:?}")));
        }
        let requested = self
            .reveal
            .iter()
            .chain(self.predicate.as_ref().map(|p| &p.attribute));
        for name in requested {
            if !known(name) {
                return Err(ConfigError::Invalid(format!(
                    "verifier asks for {name:?}, which the schema does not define"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn test_defaults_are_consistent() {
        let config = DemoConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_cred_num, 100);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = DemoConfig::from_yaml_str("max_cred_num: 5\ntag: t1\n").unwrap();
        assert_eq!(config.max_cred_num, 5);
        assert_eq!(config.tag, "t1");
        assert_eq!(config.schema, SchemaConfig::default());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(DemoConfig::from_yaml_str("  \n").unwrap(), DemoConfig::default());
    }

    #[test]
    fn test_predicate_operator_parses() {
        let yaml = "predicate:\n  attribute: age\n  p_type: \"<\"\n  value: 65\n";
        let config = DemoConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.predicate.map(|p| p.p_type), Some(PredicateType::LT));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = DemoConfig::from_yaml_str("max_cred_num: 5\n")
            .unwrap()
            .with_env(env(&[
                ("VCL_MAX_CRED_NUM", "7"),
                ("VCL_TAILS_LOCATION", "/var/tails"),
                ("VCL_LOG_FORMAT", "JSON"),
            ]))
            .unwrap();
        assert_eq!(config.max_cred_num, 7);
        assert_eq!(config.tails_location.as_deref(), Some("/var/tails"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let err = DemoConfig::default()
            .with_env(env(&[("VCL_MAX_CRED_NUM", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "VCL_MAX_CRED_NUM",
                ..
            }
        ));
        let err = DemoConfig::default()
            .with_env(env(&[("VCL_LOG_FORMAT", "xml")]))
            .unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_validation_catches_unknown_attributes() {
        let mut config = DemoConfig::default();
        config.reveal.push("salary".into());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = DemoConfig::default();
        config.values.remove("height");
        assert!(config.validate().unwrap_err().to_string().contains("height"));

        let config = DemoConfig {
            max_cred_num: 0,
            ..DemoConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "holder_seed: someone-else").unwrap();
        let config = DemoConfig::from_yaml_str(&std::fs::read_to_string(file.path()).unwrap())
            .unwrap();
        assert_eq!(config.holder_seed, "someone-else");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DemoConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
