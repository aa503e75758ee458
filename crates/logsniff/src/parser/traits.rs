pub use super::model::{
    DetectedFormat, DetectionResult, LineCaptures, NormalizedTimestamp, TimestampOutcome,
    TimestampParseFailure, ConfigurationError,
};

/// A grammar matcher: attempt to match a whole line and return its captures.
pub trait LineMatcher: Send + Sync {
    /// `None` when the line does not conform to the grammar.
    fn captures(&self, line: &str) -> Option<LineCaptures>;
}

impl<F> LineMatcher for F
where
    F: Fn(&str) -> Option<LineCaptures> + Send + Sync,
{
    fn captures(&self, line: &str) -> Option<LineCaptures> {
        self(line)
    }
}
