//! Command denylist.
//!
//! A coarse, case-insensitive substring filter applied before any process is
//! spawned. It is advisory only: equivalent destructive commands spelled
//! differently are not caught, and benign commands that happen to contain a
//! pattern are rejected.

/// Built-in patterns rejected regardless of configuration.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "format",
    "del /s",
    "rmdir /s",
    "rd /s",
    "shutdown",
    "taskkill /f",
    "reg delete",
];

/// Immutable set of lower-cased substrings that block execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist {
    patterns: Vec<String>,
}

impl Denylist {
    /// Build a denylist from arbitrary patterns.
    ///
    /// Patterns are lower-cased; blank patterns are dropped since they would
    /// match every command.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self {
            patterns: Vec::new(),
        };
        list.extend(patterns);
        list
    }

    /// Denylist containing only [`DEFAULT_DENYLIST`].
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_DENYLIST)
    }

    /// Append extra patterns, skipping blanks and duplicates.
    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref().trim().to_lowercase();
            if pattern.is_empty() || self.patterns.contains(&pattern) {
                continue;
            }
            self.patterns.push(pattern);
        }
    }

    /// Return the first pattern contained in `command`, if any.
    pub fn matched(&self, command: &str) -> Option<&str> {
        let lowered = command.to_lowercase();
        self.patterns
            .iter()
            .find(|pattern| lowered.contains(pattern.as_str()))
            .map(String::as_str)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::with_defaults()
    }
}
