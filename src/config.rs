//! Component configuration.
//!
//! The platform drops a `config.json` into the data directory:
//!
//! ```json
//! {
//!   "action": "run",
//!   "parameters": {
//!     "embedColumn": "review_text",
//!     "#apiKey": "sk-...",
//!     "model": "small_03",
//!     "outputFormat": "vector_store",
//!     "destination": { "output_table_name": "reviews_vectors" }
//!   },
//!   "storage": {
//!     "input": { "tables": [{ "source": "in.c-main.reviews", "destination": "reviews.csv" }] }
//!   }
//! }
//! ```
//!
//! Parsing is lenient (the `listColumns` action runs before the user has picked
//! a column); [`Settings::from_config`] is where required fields are enforced.
//! Process-level settings (`KBC_DATADIR`, `KBC_URL`, `KBC_TOKEN`) come from the
//! environment via [`RuntimeEnv::load`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use embed::{EmbedConfig, EmbeddingModel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("missing required configuration parameter: {0}")]
    MissingField(&'static str),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("failed to read environment: {0}")]
    Environment(#[from] config::ConfigError),
}

/// A string that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    #[default]
    Run,
    ListColumns,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    #[serde(alias = "lance")]
    VectorStore,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::VectorStore => f.write_str("vector_store"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Destination {
    #[serde(default)]
    pub output_table_name: Option<String>,
}

/// `parameters` block as the UI saves it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Parameters {
    #[serde(rename = "embedColumn", default)]
    pub embed_column: Option<String>,

    #[serde(rename = "#apiKey", default)]
    pub api_key: Option<Secret>,

    #[serde(default)]
    pub model: Option<EmbeddingModel>,

    #[serde(rename = "outputFormat", default)]
    pub output_format: Option<OutputFormat>,

    #[serde(default)]
    pub output_table_name: Option<String>,

    /// Newer UIs nest the table name here; it wins over the flat field.
    #[serde(default)]
    pub destination: Option<Destination>,

    #[serde(default)]
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableMapping {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputMapping {
    #[serde(default)]
    pub tables: Vec<TableMapping>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageMapping {
    #[serde(default)]
    pub input: InputMapping,
}

/// Top-level `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentConfig {
    #[serde(default)]
    pub action: Action,

    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default)]
    pub storage: StorageMapping,
}

impl ComponentConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Storage id of the first mapped input table, if any.
    pub fn input_table_id(&self) -> Option<&str> {
        self.storage
            .input
            .tables
            .first()
            .and_then(|t| t.source.as_deref())
    }
}

/// Validated, immutable run settings. Built once, then passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub embed_column: String,
    pub embed: EmbedConfig,
    pub output_format: OutputFormat,
    pub output_table_name: Option<String>,
}

impl Settings {
    pub fn from_config(cfg: &ComponentConfig) -> Result<Self, ConfigError> {
        let params = &cfg.parameters;

        let embed_column = params
            .embed_column
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::MissingField("embedColumn"))?
            .to_string();
        let api_key = params
            .api_key
            .as_ref()
            .map(|k| k.expose().trim())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingField("#apiKey"))?
            .to_string();
        let model = params.model.ok_or(ConfigError::MissingField("model"))?;
        let output_format = params
            .output_format
            .ok_or(ConfigError::MissingField("outputFormat"))?;

        let output_table_name = params
            .destination
            .as_ref()
            .and_then(|d| d.output_table_name.clone())
            .or_else(|| params.output_table_name.clone())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut embed = EmbedConfig {
            api_key,
            model,
            ..EmbedConfig::default()
        };
        let api_base_url = params.api_base_url.as_deref().map(str::trim);
        if let Some(url) = api_base_url.filter(|u| !u.is_empty()) {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Validation(format!(
                    "api_base_url must be an http(s) URL, got '{url}'"
                )));
            }
            embed.api_base_url = url.to_string();
        }

        Ok(Self {
            embed_column,
            embed,
            output_format,
            output_table_name,
        })
    }
}

/// Process environment the platform provides, read with the `KBC_` prefix.
#[derive(Clone, Deserialize)]
pub struct RuntimeEnv {
    /// Data directory root (`KBC_DATADIR`).
    #[serde(default = "default_data_dir")]
    pub datadir: PathBuf,
    /// Storage API root (`KBC_URL`).
    #[serde(default)]
    pub url: Option<String>,
    /// Storage API token (`KBC_TOKEN`).
    #[serde(default)]
    pub token: Option<Secret>,
}

impl RuntimeEnv {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like [`RuntimeEnv::load`], reading `vars` instead of the process
    /// environment when given.
    pub fn load_from(vars: Option<config::Map<String, String>>) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::Environment::with_prefix("KBC").source(vars));
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Storage API url and token, when both are set.
    pub fn storage_api(&self) -> Option<(&str, &Secret)> {
        match (self.url.as_deref(), self.token.as_ref()) {
            (Some(url), Some(token)) if !url.is_empty() && !token.expose().is_empty() => {
                Some((url, token))
            }
            _ => None,
        }
    }
}

impl Default for RuntimeEnv {
    fn default() -> Self {
        Self {
            datadir: default_data_dir(),
            url: None,
            token: None,
        }
    }
}

impl fmt::Debug for RuntimeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeEnv")
            .field("datadir", &self.datadir)
            .field("url", &self.url)
            .field("token", &self.token)
            .finish()
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/data")
}
