use tracing::{debug, trace};

use super::registry::{FormatDescriptor, PatternRegistry};
use super::timestamp::Normalizer;
use super::traits::*;

/// Format detector: walks the registry in order and stops at the first
/// descriptor whose grammar accepts the whole line.
///
/// First-match-wins, not best-match. A later descriptor that would also
/// accept the line is never consulted.
///
/// Holds no mutable state; share it behind `&` or `Arc` across threads.
#[derive(Debug)]
pub struct FormatDetector {
    registry: PatternRegistry,
    normalizer: Normalizer,
    max_line_size: usize,
}

impl FormatDetector {
    pub fn new(registry: PatternRegistry, normalizer: Normalizer) -> Self {
        Self {
            registry,
            normalizer,
            max_line_size: super::MAX_LINE_SIZE,
        }
    }

    /// Lines longer than `max` bytes are reported as unknown without matching.
    pub fn with_max_line_size(mut self, max: usize) -> Self {
        self.max_line_size = max;
        self
    }

    pub fn max_line_size(&self) -> usize {
        self.max_line_size
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// The winning descriptor and its captures, without normalizing.
    pub fn match_line(&self, line: &str) -> Option<(&FormatDescriptor, LineCaptures)> {
        if line.len() > self.max_line_size {
            debug!("Skipping line of {} bytes (max: {})", line.len(), self.max_line_size);
            return None;
        }

        self.registry
            .all()
            .find_map(|descriptor| descriptor.captures(line).map(|caps| (descriptor, caps)))
    }

    pub fn detect(&self, line: &str) -> DetectionResult {
        let Some((descriptor, captures)) = self.match_line(line) else {
            trace!("No format matched line");
            return DetectionResult::unknown();
        };

        let timestamp = match captures.timestamp.as_deref() {
            None => TimestampOutcome::Absent,
            Some(raw) => match self.normalizer.normalize(raw, descriptor.layout()) {
                Ok(ts) => TimestampOutcome::Parsed(ts),
                Err(failure) => {
                    debug!("{} matched but {}", descriptor.name(), failure);
                    TimestampOutcome::Unparsable(failure)
                }
            },
        };

        trace!("Detected {}", descriptor.name());

        DetectionResult {
            format: DetectedFormat::Known(descriptor.name().to_string()),
            raw_timestamp: captures.timestamp,
            timestamp,
            fields: captures.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::formats::syslog::{RFC3164_NAME, RFC5424_NAME};
    use crate::parser::timestamp::{TimestampLayout, YearPolicy};
    use crate::parser::YearSource;
    use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
    use proptest::prelude::*;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()
    }

    fn detector() -> FormatDetector {
        FormatDetector::new(
            PatternRegistry::with_builtins().unwrap(),
            Normalizer::with_reference(YearPolicy::CurrentYear, reference()),
        )
    }

    #[test]
    fn test_detect_rfc3164() {
        let result = detector().detect("<34>Oct 11 22:14:15 mymachine su: failure");
        assert_eq!(result.format.as_str(), "RFC 3164 (Traditional Format)");
        assert_eq!(result.raw_timestamp.as_deref(), Some("Oct 11 22:14:15"));

        let instant = result.timestamp.instant().unwrap();
        assert_eq!((instant.month(), instant.day()), (10, 11));
        assert_eq!((instant.hour(), instant.minute(), instant.second()), (22, 14, 15));
        assert!(matches!(result.timestamp, TimestampOutcome::Parsed(ts) if ts.year == YearSource::Assumed(2025)));
    }

    #[test]
    fn test_detect_rfc5424() {
        let result = detector().detect("<34>1 2025-04-02T10:15:30.123456Z myhost myapp 1234 - - message body");
        assert_eq!(result.format.as_str(), "RFC 5424 (Structured Data)");
        assert_eq!(result.raw_timestamp.as_deref(), Some("2025-04-02T10:15:30.123456Z"));

        let expected = Utc.with_ymd_and_hms(2025, 4, 2, 10, 15, 30).unwrap() + Duration::microseconds(123_456);
        assert_eq!(result.timestamp.instant(), Some(expected));
        assert_eq!(result.field("hostname"), Some("myhost"));
    }

    #[test]
    fn test_detect_unknown() {
        let result = detector().detect("hello world");
        assert_eq!(result, DetectionResult::unknown());
        assert_eq!(result.format.to_string(), "Unknown Format");
    }

    #[test]
    fn test_detect_json_and_logfmt() {
        let d = detector();
        let json = d.detect(r#"{"level":"info","msg":"hi","ts":"2026-01-30T12:00:00Z"}"#);
        assert_eq!(json.format.as_str(), "JSON Lines");
        assert!(json.timestamp.instant().is_some());

        let logfmt = d.detect("level=info msg=hello ts=2026-01-29T00:00:00Z");
        assert_eq!(logfmt.format.as_str(), "Logfmt (key=value)");
        assert!(logfmt.timestamp.instant().is_some());
    }

    #[test]
    fn test_format_detected_timestamp_unparsable() {
        let result = detector().detect("<34>Foo 11 22:14:15 mymachine su: failure");
        assert_eq!(result.format.as_str(), RFC3164_NAME);
        assert_eq!(result.raw_timestamp.as_deref(), Some("Foo 11 22:14:15"));
        match result.timestamp {
            TimestampOutcome::Unparsable(failure) => {
                assert_eq!(failure.raw, "Foo 11 22:14:15");
                assert_eq!(failure.layout, TimestampLayout::Rfc3164);
            }
            other => panic!("expected unparsable timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_rfc5424_out_of_range_date_is_unparsable() {
        let result = detector().detect("2025-02-30T10:15:30Z host app 1 - message");
        assert_eq!(result.format.as_str(), RFC5424_NAME);
        assert!(matches!(result.timestamp, TimestampOutcome::Unparsable(_)));
    }

    #[test]
    fn test_json_without_timestamp_is_absent() {
        let result = detector().detect(r#"{"level":"info"}"#);
        assert_eq!(result.format.as_str(), "JSON Lines");
        assert_eq!(result.raw_timestamp, None);
        assert_eq!(result.timestamp, TimestampOutcome::Absent);
    }

    #[test]
    fn test_first_match_wins_over_later_superset() {
        let mut registry = PatternRegistry::new();
        registry.register(crate::parser::formats::builtin("rfc3164").unwrap()).unwrap();
        registry
            .register(
                FormatDescriptor::from_pattern(
                    "Anything With Three Words",
                    r"(?:<\d+>)?(?P<timestamp>\S+ +\S+ \S+) .+",
                    TimestampLayout::Rfc3164,
                )
                .unwrap(),
            )
            .unwrap();
        let d = FormatDetector::new(registry, Normalizer::with_reference(YearPolicy::CurrentYear, reference()));

        let result = d.detect("<34>Oct 11 22:14:15 mymachine su: failure");
        assert_eq!(result.format.as_str(), RFC3164_NAME);

        // the superset still catches what RFC 3164 rejects
        let result = d.detect("one two three four");
        assert_eq!(result.format.as_str(), "Anything With Three Words");
    }

    #[test]
    fn test_registration_order_decides() {
        let superset = || {
            FormatDescriptor::from_pattern("Greedy", r"(?P<timestamp>.+)", TimestampLayout::Rfc3339OrEpoch).unwrap()
        };
        let mut registry = PatternRegistry::new();
        registry.register(superset()).unwrap();
        registry.register(crate::parser::formats::builtin("rfc3164").unwrap()).unwrap();
        let d = FormatDetector::new(registry, Normalizer::default());

        let result = d.detect("<34>Oct 11 22:14:15 mymachine su: failure");
        assert_eq!(result.format.as_str(), "Greedy");
    }

    #[test]
    fn test_empty_registry_reports_unknown() {
        let d = FormatDetector::new(PatternRegistry::new(), Normalizer::default());
        assert_eq!(d.detect("<34>Oct 11 22:14:15 mymachine su: failure"), DetectionResult::unknown());
    }

    #[test]
    fn test_oversized_line_is_unknown() {
        let d = detector().with_max_line_size(16);
        let result = d.detect("<34>Oct 11 22:14:15 mymachine su: failure");
        assert_eq!(result, DetectionResult::unknown());
    }

    #[test]
    fn test_detector_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FormatDetector>();
    }

    proptest! {
        #[test]
        fn prop_detect_is_idempotent(line in "\\PC{0,120}") {
            let d = detector();
            prop_assert_eq!(d.detect(&line), d.detect(&line));
        }

        #[test]
        fn prop_lowercase_words_are_unknown(line in "[a-z]{1,10}( [a-z]{1,10}){0,6}") {
            let result = detector().detect(&line);
            prop_assert_eq!(result, DetectionResult::unknown());
        }

        #[test]
        fn prop_rfc5424_instant_matches_text(
            year in 1970i32..2100,
            month in 1u32..=12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
            micros in 0u32..1_000_000,
        ) {
            let line = format!(
                "<13>1 {:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}Z host app 42 - msg",
                year, month, day, hour, minute, second, micros
            );
            let result = detector().detect(&line);
            let expected = Utc.with_ymd_and_hms(year, month, day, hour, minute, second).unwrap()
                + Duration::microseconds(micros as i64);
            prop_assert_eq!(result.format.as_str(), RFC5424_NAME);
            prop_assert_eq!(result.timestamp.instant(), Some(expected));
        }

        #[test]
        fn prop_rfc3164_components_preserved(
            month_idx in 0usize..12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
        ) {
            const NAMES: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
            let line = format!(
                "<34>{} {} {:02}:{:02}:{:02} host app: text",
                NAMES[month_idx], day, hour, minute, second
            );
            let result = detector().detect(&line);
            prop_assert_eq!(result.format.as_str(), RFC3164_NAME);
            let instant = result.timestamp.instant().unwrap();
            prop_assert_eq!(instant.month(), month_idx as u32 + 1);
            prop_assert_eq!(
                (instant.day(), instant.hour(), instant.minute(), instant.second()),
                (day, hour, minute, second)
            );
        }
    }
}
