//! Model — LogsniffConfig and related structs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analyze::AnalysisPolicy;
use crate::parser::{formats::BUILTIN_NAMES, TimestampLayout, YearPolicy, MAX_LINE_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsniffConfig {
    pub policy: AnalysisPolicy,
    /// `"current_year"`, `"ambiguous"` or `{ fixed = 2024 }`
    pub year_policy: YearPolicy,
    pub strip_ansi: bool,
    pub max_line_size: usize,
    /// Built-in formats to enable, in detection order
    pub formats: Vec<String>,
    /// Regex formats tried before any built-in
    pub custom_formats: Vec<CustomFormatConfig>,
    pub logging: LoggingConfig,
    /// File this configuration was read from, if any. Reported once logging
    /// is up.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// A user-defined grammar. `pattern` must contain a `timestamp` named group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFormatConfig {
    pub name: String,
    pub pattern: String,
    pub layout: TimestampLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Also write diagnostics to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LogsniffConfig {
    fn default() -> Self {
        Self {
            policy: AnalysisPolicy::FirstLineOnly,
            year_policy: YearPolicy::CurrentYear,
            strip_ansi: true,
            max_line_size: MAX_LINE_SIZE,
            formats: BUILTIN_NAMES.iter().map(|s| s.to_string()).collect(),
            custom_formats: Vec::new(),
            logging: LoggingConfig::default(),
            source: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "logsniff=warn".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ─────────────────────────────────────────────────

    #[test]
    fn test_config_defaults() {
        let cfg = LogsniffConfig::default();
        assert_eq!(cfg.policy, AnalysisPolicy::FirstLineOnly);
        assert_eq!(cfg.year_policy, YearPolicy::CurrentYear);
        assert!(cfg.strip_ansi);
        assert_eq!(cfg.max_line_size, MAX_LINE_SIZE);
        assert!(cfg.custom_formats.is_empty());
    }

    #[test]
    fn test_default_formats_in_detection_order() {
        let cfg = LogsniffConfig::default();
        assert_eq!(cfg.formats, vec!["rfc5424", "rfc3164", "json", "logfmt"]);
    }

    #[test]
    fn test_logging_defaults() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "logsniff=warn");
        assert!(logging.file.is_none());
    }

    // ── Deserialization ──────────────────────────────────────────

    #[test]
    fn test_deserialize_partial_toml() {
        let cfg: LogsniffConfig = toml::from_str(r#"policy = "all_lines""#).expect("Should accept partial TOML");
        assert_eq!(cfg.policy, AnalysisPolicy::AllLines);
        assert_eq!(cfg.formats.len(), 4); // default
        assert!(cfg.strip_ansi); // default
    }

    #[test]
    fn test_deserialize_year_policies() {
        let cfg: LogsniffConfig = toml::from_str(r#"year_policy = "ambiguous""#).unwrap();
        assert_eq!(cfg.year_policy, YearPolicy::Ambiguous);

        let cfg: LogsniffConfig = toml::from_str("year_policy = { fixed = 2019 }").unwrap();
        assert_eq!(cfg.year_policy, YearPolicy::Fixed(2019));
    }

    #[test]
    fn test_deserialize_custom_formats_and_logging() {
        let toml_str = r#"
            formats = ["rfc3164"]

            [[custom_formats]]
            name = "Nginx error"
            pattern = '(?P<timestamp>\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}) \[(?P<level>\w+)\] (?P<message>.*)'
            layout = "rfc3339_or_epoch"

            [logging]
            level = "logsniff=debug"
            file = "/tmp/logsniff.log"
        "#;
        let cfg: LogsniffConfig = toml::from_str(toml_str).expect("Should parse full config");
        assert_eq!(cfg.formats, vec!["rfc3164"]);
        assert_eq!(cfg.custom_formats.len(), 1);
        assert_eq!(cfg.custom_formats[0].name, "Nginx error");
        assert_eq!(cfg.custom_formats[0].layout, TimestampLayout::Rfc3339OrEpoch);
        assert_eq!(cfg.logging.level, "logsniff=debug");
        assert_eq!(cfg.logging.file.as_deref(), Some("/tmp/logsniff.log"));
    }

    #[test]
    fn test_custom_format_requires_layout() {
        let toml_str = r#"
            [[custom_formats]]
            name = "x"
            pattern = "(?P<timestamp>\\d+)"
        "#;
        assert!(toml::from_str::<LogsniffConfig>(toml_str).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let cfg = LogsniffConfig::default();
        let toml_str = toml::to_string(&cfg).expect("Should serialize to TOML");
        let back: LogsniffConfig = toml::from_str(&toml_str).expect("Should deserialize from TOML");
        assert_eq!(back.formats, cfg.formats);
        assert_eq!(back.year_policy, cfg.year_policy);
        assert_eq!(back.max_line_size, cfg.max_line_size);
    }
}
