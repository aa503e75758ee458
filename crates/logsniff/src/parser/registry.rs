//! Pattern registry: the ordered set of format descriptors the detector walks.
//!
//! Order is a public contract. The detector reports the first descriptor whose
//! matcher accepts a line, so stricter grammars must be registered before
//! looser ones.

use std::fmt;

use regex::Regex;
use tracing::debug;

use super::formats;
use super::timestamp::TimestampLayout;
use super::traits::{ConfigurationError, LineCaptures, LineMatcher};

/// Name of the capture group every regex grammar must define.
pub const TIMESTAMP_GROUP: &str = "timestamp";

pub struct FormatDescriptor {
    name: String,
    matcher: Box<dyn LineMatcher>,
    layout: TimestampLayout,
}

impl FormatDescriptor {
    pub fn new(
        name: impl Into<String>,
        matcher: impl LineMatcher + 'static,
        layout: TimestampLayout,
    ) -> Self {
        Self {
            name: name.into(),
            matcher: Box::new(matcher),
            layout,
        }
    }

    /// Build a descriptor from a regex grammar with a named `timestamp` group.
    pub fn from_pattern(
        name: impl Into<String>,
        pattern: &str,
        layout: TimestampLayout,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let matcher = RegexMatcher::new(&name, pattern)?;
        Ok(Self::new(name, matcher, layout))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> TimestampLayout {
        self.layout
    }

    pub fn captures(&self, line: &str) -> Option<LineCaptures> {
        self.matcher.captures(line)
    }
}

impl fmt::Debug for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatDescriptor")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Regex grammar anchored to the whole line.
///
/// Every named group other than `timestamp` that took part in the match is
/// reported as a field.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(name: &str, pattern: &str) -> Result<Self, ConfigurationError> {
        let anchored = format!("^(?:{})$", pattern);
        let regex = Regex::new(&anchored).map_err(|source| ConfigurationError::InvalidPattern {
            name: name.to_string(),
            source,
        })?;

        if !regex.capture_names().flatten().any(|n| n == TIMESTAMP_GROUP) {
            return Err(ConfigurationError::MissingTimestampGroup(name.to_string()));
        }

        Ok(Self { regex })
    }
}

impl LineMatcher for RegexMatcher {
    fn captures(&self, line: &str) -> Option<LineCaptures> {
        let caps = self.regex.captures(line)?;
        let mut captures = LineCaptures::default();

        for group in self.regex.capture_names().flatten() {
            let Some(m) = caps.name(group) else {
                continue;
            };
            if group == TIMESTAMP_GROUP {
                captures.timestamp = Some(m.as_str().to_string());
            } else {
                captures.fields.push((group.to_string(), m.as_str().to_string()));
            }
        }

        Some(captures)
    }
}

#[derive(Debug, Default)]
pub struct PatternRegistry {
    descriptors: Vec<FormatDescriptor>,
}

impl PatternRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in grammar in its default order.
    pub fn with_builtins() -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for name in formats::BUILTIN_NAMES {
            registry.register(formats::builtin(name)?)?;
        }
        Ok(registry)
    }

    /// Append a descriptor. Names must be unique and non-empty.
    pub fn register(&mut self, descriptor: FormatDescriptor) -> Result<(), ConfigurationError> {
        if descriptor.name().trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }
        if self.get(descriptor.name()).is_some() {
            return Err(ConfigurationError::DuplicateFormat(descriptor.name().to_string()));
        }

        debug!(
            "Registered format {:?} at position {} (layout: {})",
            descriptor.name(),
            self.descriptors.len(),
            descriptor.layout()
        );
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Descriptors in registration order.
    pub fn all(&self) -> std::slice::Iter<'_, FormatDescriptor> {
        self.descriptors.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FormatDescriptor> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
