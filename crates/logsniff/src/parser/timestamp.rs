//! Timestamp layouts and the normalizer that turns a captured timestamp
//! substring into an absolute UTC instant.
//!
//! Parsing is strict: the raw text must have exactly the shape its layout
//! declares, and calendar ranges are validated by `chrono`. Layouts without a
//! year (RFC 3164) get one from the configured [`YearPolicy`].

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::model::{NormalizedTimestamp, TimestampParseFailure};

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Year used to range-check yearless dates when no year is assumed.
/// A leap year, so that `Feb 29` is accepted.
const VALIDATION_LEAP_YEAR: i32 = 2000;

/// How far back `CurrentYear` looks for a year in which a date exists.
const LEAP_CYCLE_YEARS: i32 = 4;

/// Nanosecond value chrono uses to carry a leap second in `:59`.
const LEAP_SECOND_NANOS: u32 = 1_000_000_000;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun",
    "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampLayout {
    /// `YYYY-MM-DDThh:mm:ss[.ffffff](Z|+hh:mm)`, 1-6 fractional digits
    Rfc5424,
    /// `Mon D hh:mm:ss`, no year, no zone
    Rfc3164,
    /// Any RFC 3339 timestamp, or integer Unix seconds / milliseconds
    Rfc3339OrEpoch,
}

impl TimestampLayout {
    pub fn name(&self) -> &'static str {
        match self {
            TimestampLayout::Rfc5424 => "YYYY-MM-DDThh:mm:ss[.ffffff]Z",
            TimestampLayout::Rfc3164 => "Mon D hh:mm:ss",
            TimestampLayout::Rfc3339OrEpoch => "RFC 3339 or Unix epoch",
        }
    }

    pub fn has_year(&self) -> bool {
        !matches!(self, TimestampLayout::Rfc3164)
    }
}

impl fmt::Display for TimestampLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How to fill in the year for layouts that do not carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearPolicy {
    /// Year of the reference instant; the previous year if that would put the
    /// timestamp more than a day after the reference.
    CurrentYear,
    /// Always this year
    Fixed(i32),
    /// Produce no instant; the result is flagged ambiguous
    Ambiguous,
}

impl Default for YearPolicy {
    fn default() -> Self {
        YearPolicy::CurrentYear
    }
}

impl std::str::FromStr for YearPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current_year" | "current" => Ok(YearPolicy::CurrentYear),
            "ambiguous" | "none" => Ok(YearPolicy::Ambiguous),
            other => other
                .parse::<i32>()
                .map(YearPolicy::Fixed)
                .map_err(|_| format!("invalid year policy {:?}", s)),
        }
    }
}

/// Pure timestamp normalizer.
///
/// The reference instant is captured once, so repeated calls on the same
/// input always agree.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    policy: YearPolicy,
    reference: DateTime<Utc>,
}

impl Normalizer {
    pub fn new(policy: YearPolicy) -> Self {
        Self::with_reference(policy, Utc::now())
    }

    pub fn with_reference(policy: YearPolicy, reference: DateTime<Utc>) -> Self {
        Self { policy, reference }
    }

    pub fn policy(&self) -> YearPolicy {
        self.policy
    }

    pub fn reference(&self) -> DateTime<Utc> {
        self.reference
    }

    pub fn normalize(
        &self,
        raw: &str,
        layout: TimestampLayout,
    ) -> Result<NormalizedTimestamp, TimestampParseFailure> {
        match layout {
            TimestampLayout::Rfc5424 => parse_rfc5424(raw),
            TimestampLayout::Rfc3164 => self.parse_rfc3164(raw),
            TimestampLayout::Rfc3339OrEpoch => parse_rfc3339_or_epoch(raw),
        }
    }

    fn parse_rfc3164(&self, raw: &str) -> Result<NormalizedTimestamp, TimestampParseFailure> {
        let fail = |reason: &str| TimestampParseFailure::new(raw, TimestampLayout::Rfc3164, reason);

        let caps = rfc3164_shape()
            .captures(raw)
            .ok_or_else(|| fail("expected `Mon D hh:mm:ss`"))?;

        let month_name = caps["month"].to_ascii_lowercase();
        let month = MONTHS
            .iter()
            .position(|m| *m == month_name)
            .map(|idx| idx as u32 + 1)
            .ok_or_else(|| fail("unknown month name"))?;
        let day: u32 = caps["day"].parse().map_err(|_| fail("invalid day"))?;
        let time = parse_hms(&caps["hour"], &caps["minute"], &caps["second"])
            .ok_or_else(|| fail("time of day out of range"))?;

        let build = |year: i32| {
            NaiveDate::from_ymd_opt(year, month, day).map(|date| Utc.from_utc_datetime(&date.and_time(time)))
        };

        match self.policy {
            YearPolicy::Ambiguous => {
                build(VALIDATION_LEAP_YEAR).ok_or_else(|| fail("day out of range for month"))?;
                Ok(NormalizedTimestamp::ambiguous())
            }
            YearPolicy::Fixed(year) => build(year)
                .map(|instant| NormalizedTimestamp::assumed(instant, year))
                .ok_or_else(|| fail("day out of range for month")),
            YearPolicy::CurrentYear => {
                let year = self.reference.year();
                let Some(instant) = build(year) else {
                    // Feb 29 outside a leap year: the most recent year that has it
                    return (1..=LEAP_CYCLE_YEARS)
                        .map(|back| year - back)
                        .find_map(|y| build(y).map(|instant| NormalizedTimestamp::assumed(instant, y)))
                        .ok_or_else(|| fail("day out of range for month"));
                };
                if instant > self.reference + Duration::days(1) {
                    if let Some(previous) = build(year - 1) {
                        return Ok(NormalizedTimestamp::assumed(previous, year - 1));
                    }
                }
                Ok(NormalizedTimestamp::assumed(instant, year))
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(YearPolicy::default())
    }
}

/// Normalize with the default policy and the current time as reference.
pub fn normalize(raw: &str, layout: TimestampLayout) -> Result<NormalizedTimestamp, TimestampParseFailure> {
    Normalizer::default().normalize(raw, layout)
}

fn parse_rfc5424(raw: &str) -> Result<NormalizedTimestamp, TimestampParseFailure> {
    let fail = |reason: String| TimestampParseFailure::new(raw, TimestampLayout::Rfc5424, reason);

    if !rfc5424_shape().is_match(raw) {
        return Err(fail("expected `YYYY-MM-DDThh:mm:ss[.ffffff]Z`".into()));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| NormalizedTimestamp::explicit(dt.with_timezone(&Utc)))
        .map_err(|e| fail(e.to_string()))
}

fn parse_rfc3339_or_epoch(raw: &str) -> Result<NormalizedTimestamp, TimestampParseFailure> {
    let fail = |reason: &str| TimestampParseFailure::new(raw, TimestampLayout::Rfc3339OrEpoch, reason);

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(NormalizedTimestamp::explicit(dt.with_timezone(&Utc)));
    }

    let epoch: i64 = raw
        .parse()
        .map_err(|_| fail("neither RFC 3339 nor an integer epoch"))?;
    let instant = if epoch > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    };

    instant
        .map(NormalizedTimestamp::explicit)
        .ok_or_else(|| fail("epoch out of range"))
}

fn parse_hms(hour: &str, minute: &str, second: &str) -> Option<NaiveTime> {
    let (hour, minute, second): (u32, u32, u32) =
        (hour.parse().ok()?, minute.parse().ok()?, second.parse().ok()?);
    if second == 60 {
        // leap second, as RFC 3339 parsing allows it
        NaiveTime::from_hms_nano_opt(hour, minute, 59, LEAP_SECOND_NANOS)
    } else {
        NaiveTime::from_hms_opt(hour, minute, second)
    }
}

fn rfc5424_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,6})?(?:Z|[+-]\d{2}:\d{2})$")
            .expect("static RFC 5424 timestamp regex")
    })
}

fn rfc3164_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^(?P<month>[A-Za-z]{3}) {1,2}(?P<day>\d{1,2}) (?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})$")
            .expect("static RFC 3164 timestamp regex")
    })
}

/// Human-readable UTC rendering; microseconds are shown only when present.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    // a leap second carries 1_000_000_000 extra nanos and still prints as `:60`
    if instant.timestamp_subsec_nanos() % LEAP_SECOND_NANOS == 0 {
        instant.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    } else {
        instant.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string()
    }
}
