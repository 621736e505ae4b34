use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "campus.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Unset means the transport default applies.
    pub request_timeout_secs: Option<u64>,
    /// Automatic retries for read queries; writes are never retried.
    pub query_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    pub default_academic_year: String,
    pub academic_years: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CampusConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub application: ApplicationConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_secs: None,
            query_retries: 1,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let base = env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        SessionConfig {
            path: base.join(".campus").join("session.json"),
        }
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig {
            name: "Campus Portal".to_string(),
            default_academic_year: "2024-2025".to_string(),
            academic_years: vec!["2024-2025".to_string(), "2023-2024".to_string()],
        }
    }
}

impl CampusConfig {
    /// Load configuration from file with environment variable overrides.
    ///
    /// The file is `$CAMPUS_CONFIG` when set, else `campus.toml` in the
    /// working directory. A missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var_os("CAMPUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            tracing::warn!("⚠️ Could not find {}, using defaults", path.display());
            CampusConfig::default()
        };

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides looked up by variable name. Unparsable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CAMPUS_API_URL") {
            self.api.base_url = url;
        }
        if let Some(path) = lookup("CAMPUS_SESSION_PATH") {
            self.session.path = PathBuf::from(path);
        }
        if let Some(year) = lookup("CAMPUS_ACADEMIC_YEAR") {
            self.application.default_academic_year = year;
        }
        if let Some(retries) = lookup("CAMPUS_QUERY_RETRIES") {
            match retries.parse() {
                Ok(n) => self.api.query_retries = n,
                Err(_) => tracing::warn!("Ignoring CAMPUS_QUERY_RETRIES={}", retries),
            }
        }
        if let Some(secs) = lookup("CAMPUS_REQUEST_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(n) => self.api.request_timeout_secs = Some(n),
                Err(_) => tracing::warn!("Ignoring CAMPUS_REQUEST_TIMEOUT_SECS={}", secs),
            }
        }
    }
}
