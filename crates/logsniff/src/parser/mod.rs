/// Log format classification
///
/// Decides which wire grammar a single line conforms to and turns its
/// timestamp into an absolute instant.
///
/// # Architecture
///
/// - `registry.rs`: Ordered set of format descriptors
/// - `detector.rs`: First-match-wins detection over the registry
/// - `timestamp.rs`: Layouts, year policy and the normalizer
/// - `formats/`: Built-in grammars (RFC 5424, RFC 3164, JSON Lines, logfmt)
/// - `ansi.rs`: Escape-code stripping applied before detection
///
/// Classification never fails: a line that matches nothing is reported as
/// unknown, and a timestamp that does not parse is reported alongside the
/// format that matched.

pub mod traits;
pub mod registry;
pub mod detector;
pub mod timestamp;
pub mod formats;
pub mod model;
mod ansi;
mod serde_utils;

// Re-export commonly used types
pub use traits::LineMatcher;
pub use model::{
    ConfigurationError, DetectedFormat, DetectionResult, LineCaptures, NormalizedTimestamp,
    TimestampOutcome, TimestampParseFailure, YearSource, UNKNOWN_FORMAT,
};
pub use registry::{FormatDescriptor, PatternRegistry, RegexMatcher};
pub use detector::FormatDetector;
pub use timestamp::{normalize, Normalizer, TimestampLayout, YearPolicy};
pub use ansi::strip_ansi_codes;

// Constants
pub const MAX_LINE_SIZE: usize = 1_048_576; // 1MB
