use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::parser::{DetectedFormat, DetectionResult, TimestampOutcome, YearSource};

/// Lines attributed to one named format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatCount {
    pub format: String,
    pub lines: u64,
}

/// Timestamp outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimestampCounts {
    pub parsed: u64,
    /// Parsed, but the year could not be settled so there is no instant
    pub ambiguous: u64,
    pub unparsable: u64,
    pub absent: u64,
}

/// Aggregate view over an analysis run.
///
/// Built incrementally with [`AnalysisSummary::record`]; the `formats` list
/// keeps the order in which each format was first seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub lines: u64,
    pub formats: Vec<FormatCount>,
    pub unknown: u64,
    pub timestamps: TimestampCounts,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl AnalysisSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &DetectionResult) {
        self.lines += 1;

        match &result.format {
            DetectedFormat::Known(name) => {
                match self.formats.iter_mut().find(|c| &c.format == name) {
                    Some(count) => count.lines += 1,
                    None => self.formats.push(FormatCount {
                        format: name.clone(),
                        lines: 1,
                    }),
                }
            }
            DetectedFormat::Unknown => self.unknown += 1,
        }

        match &result.timestamp {
            TimestampOutcome::Absent => self.timestamps.absent += 1,
            TimestampOutcome::Unparsable(_) => self.timestamps.unparsable += 1,
            TimestampOutcome::Parsed(ts) => {
                self.timestamps.parsed += 1;
                if ts.year == YearSource::Ambiguous {
                    self.timestamps.ambiguous += 1;
                }
            }
        }

        if let Some(instant) = result.timestamp.instant() {
            self.earliest = Some(self.earliest.map_or(instant, |e| e.min(instant)));
            self.latest = Some(self.latest.map_or(instant, |l| l.max(instant)));
        }
    }

    /// Format with the most lines. Ties go to the one seen first.
    pub fn dominant_format(&self) -> Option<&str> {
        let mut best: Option<&FormatCount> = None;
        for count in &self.formats {
            if best.map_or(true, |b| count.lines > b.lines) {
                best = Some(count);
            }
        }
        best.map(|c| c.format.as_str())
    }

    /// Number of lines attributed to `format`.
    pub fn count(&self, format: &str) -> u64 {
        self.formats
            .iter()
            .find(|c| c.format == format)
            .map_or(0, |c| c.lines)
    }
}
