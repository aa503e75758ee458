//! Stream — lazy, pull-based classification of a line source.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::parser::{strip_ansi_codes, DetectionResult, FormatDetector};
use super::summary::AnalysisSummary;

/// How much of a source to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPolicy {
    /// Stop after the first non-empty line
    #[default]
    FirstLineOnly,
    /// Classify every non-empty line until the source is exhausted
    AllLines,
}

impl std::str::FromStr for AnalysisPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_line_only" | "first_line" | "first" => Ok(AnalysisPolicy::FirstLineOnly),
            "all_lines" | "all" => Ok(AnalysisPolicy::AllLines),
            other => Err(format!("invalid analysis policy {:?}", other)),
        }
    }
}

/// Failure of the line source itself. Terminal for the whole analysis.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed after line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// One classified, non-empty source line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedLine {
    /// 1-based position in the source, blank lines included
    pub line_number: usize,
    /// The line as classified: trimmed, and ANSI-stripped if enabled
    pub line: String,
    /// Longer than the detector's size limit. `line` then holds only the
    /// leading bytes and `detection` is unknown.
    pub oversized: bool,
    pub detection: DetectionResult,
}

#[derive(Debug, Clone, Copy)]
pub struct Analyzer<'d> {
    detector: &'d FormatDetector,
    strip_ansi: bool,
}

impl<'d> Analyzer<'d> {
    pub fn new(detector: &'d FormatDetector) -> Self {
        Self {
            detector,
            strip_ansi: true,
        }
    }

    pub fn strip_ansi(mut self, enabled: bool) -> Self {
        self.strip_ansi = enabled;
        self
    }

    /// Classify lines pulled from `source`. Nothing is read until the
    /// returned iterator is advanced.
    pub fn analyze<R: BufRead>(&self, source: R, policy: AnalysisPolicy) -> Analysis<'d, R> {
        Analysis {
            detector: self.detector,
            source,
            policy,
            strip_ansi: self.strip_ansi,
            line_number: 0,
            buf: Vec::new(),
            finished: false,
        }
    }

    pub fn analyze_path(
        &self,
        path: impl AsRef<Path>,
        policy: AnalysisPolicy,
    ) -> Result<Analysis<'d, BufReader<File>>, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Analyzing {} ({:?})", path.display(), policy);
        Ok(self.analyze(BufReader::new(file), policy))
    }
}

/// Lazy sequence of classified lines.
///
/// Not restartable: advancing it consumes the underlying source. After a read
/// error has been yielded, it yields nothing more.
pub struct Analysis<'d, R> {
    detector: &'d FormatDetector,
    source: R,
    policy: AnalysisPolicy,
    strip_ansi: bool,
    line_number: usize,
    buf: Vec<u8>,
    finished: bool,
}

impl<'d, R: BufRead> Analysis<'d, R> {
    /// Drain the remaining lines into a summary.
    pub fn summarize(self) -> Result<AnalysisSummary, SourceError> {
        let mut summary = AnalysisSummary::default();
        for item in self {
            summary.record(&item?.detection);
        }
        Ok(summary)
    }

    /// Read the next line, decoded and cleaned, and whether it overran the
    /// size limit. `None` at end of input.
    ///
    /// At most `max_line_size + 1` bytes of a line are buffered; the rest of
    /// an oversized line is skipped in place.
    fn next_line(&mut self) -> Option<Result<(String, bool), SourceError>> {
        self.buf.clear();
        let limit = (self.detector.max_line_size() as u64).saturating_add(1);
        let read = (&mut self.source).take(limit).read_until(b'\n', &mut self.buf);

        match read {
            Ok(0) => return None,
            Ok(_) => self.line_number += 1,
            Err(source) => {
                return Some(Err(SourceError::Read {
                    line: self.line_number,
                    source,
                }))
            }
        }

        let oversized = self.buf.len() as u64 == limit && self.buf.last() != Some(&b'\n');
        if oversized {
            if let Err(source) = self.skip_rest_of_line() {
                return Some(Err(SourceError::Read {
                    line: self.line_number,
                    source,
                }));
            }
        }

        let decoded = String::from_utf8_lossy(&self.buf);
        let trimmed = decoded.trim();
        let line = if self.strip_ansi {
            strip_ansi_codes(trimmed).trim().to_string()
        } else {
            trimmed.to_string()
        };
        Some(Ok((line, oversized)))
    }

    /// Discard input up to and including the next newline.
    fn skip_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let (used, found) = {
                let available = match self.source.fill_buf() {
                    Ok(available) => available,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                if available.is_empty() {
                    return Ok(());
                }
                match available.iter().position(|&b| b == b'\n') {
                    Some(idx) => (idx + 1, true),
                    None => (available.len(), false),
                }
            };
            self.source.consume(used);
            if found {
                return Ok(());
            }
        }
    }
}

impl<'d, R: BufRead> Iterator for Analysis<'d, R> {
    type Item = Result<AnalyzedLine, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let (line, oversized) = match self.next_line() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(e)) => {
                    warn!("Stopping analysis: {}", e);
                    self.finished = true;
                    return Some(Err(e));
                }
                Some(Ok(next)) => next,
            };

            if line.is_empty() && !oversized {
                continue;
            }

            let detection = if oversized {
                debug!(
                    "Line {} exceeds {} bytes, not matched",
                    self.line_number,
                    self.detector.max_line_size()
                );
                DetectionResult::unknown()
            } else {
                self.detector.detect(&line)
            };
            debug!("Line {}: {}", self.line_number, detection.format);

            if self.policy == AnalysisPolicy::FirstLineOnly {
                self.finished = true;
            }

            return Some(Ok(AnalyzedLine {
                line_number: self.line_number,
                line,
                oversized,
                detection,
            }));
        }
    }
}

impl<'d, R: BufRead> FusedIterator for Analysis<'d, R> {}
