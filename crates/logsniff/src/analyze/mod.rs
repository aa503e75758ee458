//! Analyze module — streams lines from a source through the format detector.

pub mod stream;
pub mod summary;

pub use stream::{AnalysisPolicy, Analysis, AnalyzedLine, Analyzer, SourceError};
pub use summary::{AnalysisSummary, FormatCount, TimestampCounts};
