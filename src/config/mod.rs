//! Two-tier configuration for the reporting connectors.
//!
//! Values resolve from a project override file first, then from framework
//! defaults bundled into the crate.
//!
//! # Precedence
//!
//! 1. **Project override** – `tattle.toml` in the current working directory,
//!    loaded only when present
//! 2. **Framework defaults** – `defaults.toml` embedded at compile time
//!
//! TOML tables flatten into dot-separated keys, so `[jira.connector]` with
//! `isActive = false` resolves as `jira.connector.isActive`. String, boolean,
//! integer, and float leaves stringify; arrays and datetimes are rejected.

use std::collections::BTreeMap;
use std::time::Duration;

use camino::Utf8Path;
use thiserror::Error;

/// Name of the embedded framework defaults document, used in error messages.
pub const DEFAULTS_FILE_NAME: &str = "defaults.toml";

/// File name of the optional project override, discovered in the working
/// directory.
pub const OVERRIDE_FILE_NAME: &str = "tattle.toml";

const EMBEDDED_DEFAULTS: &str = include_str!("defaults.toml");

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors surfaced while loading or resolving configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration document could not be read from disk.
    #[error("failed to read configuration file '{path}': {message}")]
    FileUnreadable {
        /// Path of the unreadable file.
        path: String,
        /// Error detail from the I/O operation.
        message: String,
    },

    /// A configuration document is not valid TOML.
    #[error("failed to parse configuration file '{file}': {message}")]
    ParseFailed {
        /// Name of the offending document.
        file: String,
        /// Error detail from the TOML parser.
        message: String,
    },

    /// The key is absent from both layers.
    #[error("key '{key}' was not found in the framework configuration '{file}'")]
    MissingKey {
        /// The key that failed to resolve.
        key: String,
        /// Name of the defaults document that was searched last.
        file: String,
    },

    /// A value exists but cannot be used as requested.
    #[error("configuration key '{key}' has unusable value '{value}': {reason}")]
    InvalidValue {
        /// The key holding the value.
        key: String,
        /// The offending value as written.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// String-keyed configuration with a project override layer over framework
/// defaults.
///
/// # Example
///
/// ```no_run
/// use tattle::LayeredConfig;
///
/// let config = LayeredConfig::load().expect("configuration should load");
/// let active = config.resolve_flag("jira.connector.isActive").expect("flag");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredConfig {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl LayeredConfig {
    /// Loads the embedded defaults plus `tattle.toml` when it exists in the
    /// working directory.
    ///
    /// A missing override file is not an error; the layer is simply absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when either document fails to read or parse.
    pub fn load() -> Result<Self, ConfigError> {
        let override_path = Utf8Path::new(OVERRIDE_FILE_NAME);
        if override_path.exists() {
            Self::from_override_file(override_path)
        } else {
            tracing::info!("no {OVERRIDE_FILE_NAME} found; using framework defaults only");
            Self::from_toml(EMBEDDED_DEFAULTS, None)
        }
    }

    /// Loads the embedded defaults plus an explicitly named override file.
    ///
    /// Unlike [`LayeredConfig::load`], a missing file here is an error: the
    /// caller asked for that file by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_override_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::FileUnreadable {
            path: path.to_string(),
            message: error.to_string(),
        })?;
        tracing::info!("loaded project configuration overrides from {path}");
        Self::from_toml(EMBEDDED_DEFAULTS, Some(text.as_str()))
    }

    /// Builds a configuration directly from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when either document fails to parse or
    /// contains an unsupported leaf value.
    pub fn from_toml(defaults: &str, overrides: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            defaults: parse_layer(DEFAULTS_FILE_NAME, defaults)?,
            overrides: overrides
                .map(|text| parse_layer(OVERRIDE_FILE_NAME, text))
                .transpose()?
                .unwrap_or_default(),
        })
    }

    /// Resolves a key, override layer first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] naming the key and the defaults
    /// document when neither layer holds the key.
    pub fn resolve(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_owned(),
            file: DEFAULTS_FILE_NAME.to_owned(),
        })
    }

    /// Non-failing lookup with the same precedence as [`LayeredConfig::resolve`].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides
            .get(key)
            .or_else(|| self.defaults.get(key))
            .map(String::as_str)
    }

    /// Resolves a key and parses it as a boolean flag.
    ///
    /// Accepts `true`/`false` in any casing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] when the key is absent and
    /// [`ConfigError::InvalidValue`] when the value is not a boolean.
    pub fn resolve_flag(&self, key: &str) -> Result<bool, ConfigError> {
        let value = self.resolve(key)?;
        match value.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
                reason: "expected 'true' or 'false'".to_owned(),
            }),
        }
    }

    /// Sets a value in the override layer.
    ///
    /// The override layer always exists in memory, even when no override file
    /// was loaded, so runtime mutation is always valid. Values are never
    /// written back to disk.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.overrides.insert(key.into(), value.into());
    }

    /// Timeout applied to the reporting HTTP clients.
    ///
    /// Reads `http.timeoutSeconds`; an absent or unparsable value falls back
    /// to 30 seconds.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        let seconds = self
            .get("http.timeoutSeconds")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(seconds)
    }
}

fn parse_layer(file: &str, text: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let document: toml::Table =
        toml::from_str(text).map_err(|error| ConfigError::ParseFailed {
            file: file.to_owned(),
            message: error.to_string(),
        })?;

    let mut flattened = BTreeMap::new();
    flatten_table(&document, "", &mut flattened)?;
    Ok(flattened)
}

fn flatten_table(
    table: &toml::Table,
    prefix: &str,
    into: &mut BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    for (name, value) in table {
        let mut key = String::with_capacity(prefix.len() + name.len() + 1);
        if !prefix.is_empty() {
            key.push_str(prefix);
            key.push('.');
        }
        key.push_str(name);

        match value {
            toml::Value::Table(nested) => flatten_table(nested, key.as_str(), into)?,
            toml::Value::String(text) => {
                into.insert(key, text.clone());
            }
            toml::Value::Boolean(flag) => {
                into.insert(key, flag.to_string());
            }
            toml::Value::Integer(number) => {
                into.insert(key, number.to_string());
            }
            toml::Value::Float(number) => {
                into.insert(key, number.to_string());
            }
            toml::Value::Array(_) | toml::Value::Datetime(_) => {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                    reason: "arrays and datetimes are not supported as values".to_owned(),
                });
            }
        }
    }
    Ok(())
}
