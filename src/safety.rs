//! Cost/safety deny-list.
//!
//! A pure predicate over operation names, consulted before dispatch: denied
//! operations are recorded as Skipped and never reach the invoker. This is
//! best-effort protection against operations that cost money or mutate
//! state, not a guarantee.

/// Operation-name prefixes denied by default.
pub const DEFAULT_DENIED_PREFIXES: &[&str] = &["open", "purchase"];

#[derive(Debug, Clone)]
pub struct SafetyFilter {
    denied_prefixes: Vec<String>,
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self {
            denied_prefixes: DEFAULT_DENIED_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl SafetyFilter {
    /// A filter with exactly the given prefixes, replacing the defaults.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { denied_prefixes: prefixes.into_iter().map(Into::into).collect() }
    }

    /// Extends the current deny-list with additional prefixes.
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied_prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// True when the operation may be invoked.
    pub fn permits(&self, operation: &str) -> bool {
        !self.denied_prefixes.iter().any(|prefix| operation.starts_with(prefix.as_str()))
    }

    pub fn denied_prefixes(&self) -> &[String] {
        &self.denied_prefixes
    }
}
