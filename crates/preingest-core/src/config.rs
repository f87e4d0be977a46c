use crate::error::{PreingestError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServiceEndpoint
// ---------------------------------------------------------------------------

/// Host and port of one of the remote computation services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `http://host:port`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self::new("localhost", 0)
    }
}

// ---------------------------------------------------------------------------
// ServicesConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Antivirus scanner.
    #[serde(default)]
    pub clam: ServiceEndpoint,
    /// XSL transformation service.
    #[serde(default)]
    pub xslweb: ServiceEndpoint,
    /// Format identification service.
    #[serde(default)]
    pub droid: ServiceEndpoint,
    /// Utilities service; hosts the fixity endpoints.
    #[serde(default)]
    pub utilities: ServiceEndpoint,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Process-wide settings, read once at startup.
///
/// Settings are shared behind an `Arc` and never mutated after `load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Origins allowed to call the service front door.
    #[serde(default)]
    pub with_origins: Vec<String>,
    /// Root folder holding submitted collections and per-session output.
    pub data_folder: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prewash_folder: Option<PathBuf>,
    /// SQLite file for action records. Defaults to `<data_folder>/preingest.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub services: ServicesConfig,
}

fn default_request_timeout() -> u64 {
    300
}

impl Settings {
    pub fn new(data_folder: impl Into<PathBuf>) -> Self {
        Self {
            with_origins: Vec::new(),
            data_folder: data_folder.into(),
            prewash_folder: None,
            database: None,
            request_timeout_secs: default_request_timeout(),
            services: ServicesConfig::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PreingestError::SettingsNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&data)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| paths::default_database(&self.data_folder))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check the settings for problems that would make steps fail at runtime.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.data_folder.is_dir() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "data folder '{}' does not exist",
                    self.data_folder.display()
                ),
            });
        }

        if let Some(prewash) = &self.prewash_folder {
            if !prewash.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("prewash folder '{}' does not exist", prewash.display()),
                });
            }
        }

        if self.request_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "request_timeout_secs must be greater than zero".to_string(),
            });
        }

        let services = [
            ("clam", &self.services.clam),
            ("xslweb", &self.services.xslweb),
            ("droid", &self.services.droid),
            ("utilities", &self.services.utilities),
        ];
        for (name, endpoint) in services {
            if endpoint.host.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("services.{name}.host is empty"),
                });
            }
            if endpoint.port == 0 {
                // Only the utilities service is used by the fixity step.
                let level = if name == "utilities" {
                    WarnLevel::Error
                } else {
                    WarnLevel::Warning
                };
                warnings.push(ConfigWarning {
                    level,
                    message: format!("services.{name}.port is not configured"),
                });
            }
        }

        warnings
    }

    /// Like [`Settings::validate`], but fails on the first `Error`-level
    /// finding. Returns the remaining warnings.
    pub fn ensure_valid(&self) -> Result<Vec<ConfigWarning>> {
        let warnings = self.validate();
        if let Some(error) = warnings.iter().find(|w| w.level == WarnLevel::Error) {
            return Err(PreingestError::InvalidSettings(error.message.clone()));
        }
        Ok(warnings)
    }
}
