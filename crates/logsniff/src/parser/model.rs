use std::fmt;
use thiserror::Error;
use serde::Serialize;
use chrono::{DateTime, Utc};
use super::serde_utils::serialize_fields_as_map;
use super::timestamp::TimestampLayout;

/// Label printed when no registered grammar matched a line.
pub const UNKNOWN_FORMAT: &str = "Unknown Format";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DetectedFormat {
    /// Name of the descriptor that matched
    Known(String),
    /// No descriptor matched the line
    Unknown,
}

impl DetectedFormat {
    pub fn as_str(&self) -> &str {
        match self {
            DetectedFormat::Known(name) => name,
            DetectedFormat::Unknown => UNKNOWN_FORMAT,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, DetectedFormat::Known(_))
    }
}

impl fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DetectedFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Where the year of a normalized timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "year")]
pub enum YearSource {
    /// The timestamp text carried its own year
    Explicit,
    /// The layout has no year; this one was filled in by policy
    Assumed(i32),
    /// The layout has no year and the policy refused to guess
    Ambiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizedTimestamp {
    /// Absolute instant. `None` only when `year` is `Ambiguous`.
    pub instant: Option<DateTime<Utc>>,
    pub year: YearSource,
}

impl NormalizedTimestamp {
    pub fn explicit(instant: DateTime<Utc>) -> Self {
        Self { instant: Some(instant), year: YearSource::Explicit }
    }

    pub fn assumed(instant: DateTime<Utc>, year: i32) -> Self {
        Self { instant: Some(instant), year: YearSource::Assumed(year) }
    }

    pub fn ambiguous() -> Self {
        Self { instant: None, year: YearSource::Ambiguous }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("cannot parse {raw:?} as {layout}: {reason}")]
pub struct TimestampParseFailure {
    pub raw: String,
    pub layout: TimestampLayout,
    pub reason: String,
}

impl TimestampParseFailure {
    pub fn new(raw: &str, layout: TimestampLayout, reason: impl Into<String>) -> Self {
        Self {
            raw: raw.to_string(),
            layout,
            reason: reason.into(),
        }
    }
}

/// Result of normalizing the timestamp captured from a matched line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TimestampOutcome {
    /// No timestamp was captured
    Absent,
    Parsed(NormalizedTimestamp),
    /// The grammar matched but the timestamp text did not fit its layout
    Unparsable(TimestampParseFailure),
}

impl TimestampOutcome {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            TimestampOutcome::Parsed(ts) => ts.instant,
            _ => None,
        }
    }
}

/// Named captures produced by a successful grammar match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineCaptures {
    pub timestamp: Option<String>,
    /// Other named fields (hostname, app, procid, message, ...) in capture order
    pub fields: Vec<(String, String)>,
}

impl LineCaptures {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub format: DetectedFormat,
    pub raw_timestamp: Option<String>,
    pub timestamp: TimestampOutcome,
    #[serde(serialize_with = "serialize_fields_as_map")]
    pub fields: Vec<(String, String)>,
}

impl DetectionResult {
    pub fn unknown() -> Self {
        Self {
            format: DetectedFormat::Unknown,
            raw_timestamp: None,
            timestamp: TimestampOutcome::Absent,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Registry construction errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("format {0:?} is already registered")]
    DuplicateFormat(String),

    #[error("format name must not be empty")]
    EmptyName,

    #[error("invalid pattern for format {name:?}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern for format {0:?} has no named `timestamp` group")]
    MissingTimestampGroup(String),

    #[error("unknown built-in format {0:?}")]
    UnknownBuiltin(String),
}
