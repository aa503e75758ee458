use crate::parser::registry::{FormatDescriptor, RegexMatcher};
use crate::parser::timestamp::TimestampLayout;
use crate::parser::traits::{ConfigurationError, LineCaptures, LineMatcher};

pub const RFC5424_NAME: &str = "RFC 5424 (Structured Data)";
pub const RFC3164_NAME: &str = "RFC 3164 (Traditional Format)";

/// `[<PRI>VERSION ]TIMESTAMP HOST APP PROCID [MSGID ](SD|-)[ MESSAGE]`
const RFC5424_PATTERN: &str = concat!(
    r"(?:<(?P<pri>\d{1,3})>(?P<version>\d{1,2}) )?",
    r"(?P<timestamp>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,6})?(?:Z|[+-]\d{2}:\d{2})) ",
    r"(?P<hostname>[\w.:-]+) ",
    r"(?P<app>[\w.-]+) ",
    r"(?P<procid>\d+|-) ",
    r"(?:(?P<msgid>[\w.-]+) )?",
    r#"(?P<structured_data>(?:\[(?:[^\]\\]|\\.)*\])+|-)"#,
    r"(?: (?P<message>.*))?",
);

/// `[<PRI>]TIMESTAMP HOST [TAG[PID]: ]MESSAGE`
const RFC3164_PATTERN: &str = concat!(
    r"(?:<(?P<pri>\d{1,3})>)?",
    r"(?P<timestamp>[A-Za-z]{3} {1,2}\d{1,2} \d{2}:\d{2}:\d{2}) ",
    r"(?P<hostname>[\w.-]+) ",
    r"(?:(?P<app>[^\s\[\]:]+)(?:\[(?P<procid>\d+)\])?: )?",
    r"(?P<message>.+)",
);

/// Header fields where RFC 5424 writes `-` for "absent".
const NILVALUE_FIELDS: [&str; 4] = ["hostname", "app", "procid", "msgid"];

/// Syslog severity levels (RFC 5424 §6.2.1)
const SYSLOG_SEVERITIES: [&str; 8] = [
    "emergency", "alert", "critical", "error",
    "warning", "notice", "info", "debug",
];

/// Syslog facility names (RFC 5424 §6.2.1)
const SYSLOG_FACILITIES: [&str; 24] = [
    "kern", "user", "mail", "daemon", "auth", "syslog", "lpr", "news",
    "uucp", "cron", "authpriv", "ftp", "ntp", "audit", "alert2", "clock",
    "local0", "local1", "local2", "local3", "local4", "local5", "local6", "local7",
];

/// Syslog grammar: a regex matcher that also decodes `<PRI>` into
/// facility and severity names.
pub struct SyslogMatcher {
    inner: RegexMatcher,
}

impl SyslogMatcher {
    fn new(name: &str, pattern: &str) -> Result<Self, ConfigurationError> {
        Ok(Self {
            inner: RegexMatcher::new(name, pattern)?,
        })
    }
}

impl LineMatcher for SyslogMatcher {
    fn captures(&self, line: &str) -> Option<LineCaptures> {
        let mut captures = self.inner.captures(line)?;

        captures
            .fields
            .retain(|(k, v)| !(v == "-" && NILVALUE_FIELDS.contains(&k.as_str())));

        if let Some(pri) = captures.field("pri").and_then(|p| p.parse::<usize>().ok()) {
            if let Some(facility) = SYSLOG_FACILITIES.get(pri >> 3) {
                captures.fields.push(("facility".to_string(), facility.to_string()));
            }
            captures.fields.push(("severity".to_string(), SYSLOG_SEVERITIES[pri & 0x07].to_string()));
        }

        Some(captures)
    }
}

pub fn rfc5424() -> Result<FormatDescriptor, ConfigurationError> {
    Ok(FormatDescriptor::new(
        RFC5424_NAME,
        SyslogMatcher::new(RFC5424_NAME, RFC5424_PATTERN)?,
        TimestampLayout::Rfc5424,
    ))
}

pub fn rfc3164() -> Result<FormatDescriptor, ConfigurationError> {
    Ok(FormatDescriptor::new(
        RFC3164_NAME,
        SyslogMatcher::new(RFC3164_NAME, RFC3164_PATTERN)?,
        TimestampLayout::Rfc3164,
    ))
}
