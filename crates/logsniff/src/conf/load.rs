//! Load — config loading from file and environment variables.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use super::model::LogsniffConfig;
use crate::parser::{formats, ConfigurationError, FormatDescriptor, PatternRegistry, YearPolicy};

pub const CONFIG_FILE_ENV: &str = "LOGSNIFF_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "/etc/logsniff/logsniff.toml";

#[derive(Debug, Error)]
pub enum ConfError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl LogsniffConfig {
    /// Load configuration from file and environment variables.
    /// Priority: Environment Variables > Config File > Defaults
    ///
    /// An explicit `path` must exist. Otherwise `LOGSNIFF_CONFIG_FILE` (or the
    /// default location) is read only if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let config_path = std::env::var(CONFIG_FILE_ENV)
                    .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
                if Path::new(&config_path).exists() {
                    Self::from_file(&config_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(|source| ConfError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply `LOGSNIFF_*` overrides, looking each variable up with `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup("LOGSNIFF_POLICY") {
            self.policy = policy
                .parse()
                .map_err(|reason| ConfError::Env { var: "LOGSNIFF_POLICY", reason })?;
        }
        if let Some(year) = lookup("LOGSNIFF_YEAR_POLICY") {
            self.year_policy = year
                .parse()
                .map_err(|reason| ConfError::Env { var: "LOGSNIFF_YEAR_POLICY", reason })?;
        }
        if let Some(file) = lookup("LOGSNIFF_LOG_FILE") {
            self.logging.file = if file.is_empty() { None } else { Some(file) };
        }
        if let Some(size) = lookup("LOGSNIFF_MAX_LINE_SIZE") {
            self.max_line_size = size.trim().parse().map_err(|e| ConfError::Env {
                var: "LOGSNIFF_MAX_LINE_SIZE",
                reason: format!("{}", e),
            })?;
        }
        if let Some(strip) = lookup("LOGSNIFF_STRIP_ANSI") {
            self.strip_ansi = parse_bool(&strip).ok_or_else(|| ConfError::Env {
                var: "LOGSNIFF_STRIP_ANSI",
                reason: format!("expected a boolean, got {:?}", strip),
            })?;
        }
        Ok(())
    }

    /// Check that configuration values are sane
    pub fn validate(&self) -> Result<(), ConfError> {
        if self.max_line_size == 0 {
            return Err(ConfError::Invalid("max_line_size must be > 0".to_string()));
        }
        if let YearPolicy::Fixed(year) = self.year_policy {
            if !(1..=9999).contains(&year) {
                return Err(ConfError::Invalid(format!(
                    "year_policy fixed year {} is out of range 1..=9999",
                    year
                )));
            }
        }

        let mut seen = HashSet::new();
        for name in &self.formats {
            if !formats::BUILTIN_NAMES.contains(&name.as_str()) {
                return Err(ConfError::Invalid(format!(
                    "unknown format {:?} (expected one of {})",
                    name,
                    formats::BUILTIN_NAMES.join(", ")
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfError::Invalid(format!("format {:?} listed twice", name)));
            }
        }

        for custom in &self.custom_formats {
            if custom.name.trim().is_empty() {
                return Err(ConfError::Invalid("custom_formats.name must not be empty".to_string()));
            }
            if custom.pattern.is_empty() {
                return Err(ConfError::Invalid(format!(
                    "custom format {:?} has an empty pattern",
                    custom.name
                )));
            }
        }

        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            ConfError::Invalid(format!("logging.level {:?}: {}", self.logging.level, e))
        })?;
        Ok(())
    }
}

impl PatternRegistry {
    /// Registry described by `config`: custom formats first, then the enabled
    /// built-ins in configured order.
    pub fn from_config(config: &LogsniffConfig) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for custom in &config.custom_formats {
            registry.register(FormatDescriptor::from_pattern(
                &custom.name,
                &custom.pattern,
                custom.layout,
            )?)?;
        }
        for key in &config.formats {
            registry.register(formats::builtin(key)?)?;
        }
        Ok(registry)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
