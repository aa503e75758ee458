/// Built-in grammars

pub mod json;
pub mod logfmt;
pub mod syslog;

use super::registry::FormatDescriptor;
use super::traits::ConfigurationError;

pub use json::JsonMatcher;
pub use logfmt::LogfmtMatcher;
pub use syslog::SyslogMatcher;

/// Configuration keys of the built-in grammars, in default priority order.
/// Most constrained first: the syslog headers, then the generic shapes.
pub const BUILTIN_NAMES: [&str; 4] = ["rfc5424", "rfc3164", "json", "logfmt"];

/// Build the built-in descriptor registered under `key`.
pub fn builtin(key: &str) -> Result<FormatDescriptor, ConfigurationError> {
    match key {
        "rfc5424" => syslog::rfc5424(),
        "rfc3164" => syslog::rfc3164(),
        "json" => Ok(json::json_lines()),
        "logfmt" => Ok(logfmt::logfmt()),
        other => Err(ConfigurationError::UnknownBuiltin(other.to_string())),
    }
}
