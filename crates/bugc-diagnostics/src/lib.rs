//! The error model shared by every compilation stage (component C11).
//!
//! Each stage never aborts on its own — it records diagnostics and keeps
//! going where it safely can (§7). The driver (`bugc::compile`) is the one
//! that decides to stop the pipeline once an [`Severity::Error`] diagnostic
//! has been recorded.

use bugc_ast::Span;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Diagnostic severity. Ordered so `Error < Warning < Info` sorts the most
/// severe diagnostics first when a caller wants a single flat, sorted list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A structured diagnostic code, e.g. `TYPE_UNDEFINED_VARIABLE` or `EVM004`.
/// Each producing crate owns its own namespace (`PARSE_*`, `TYPE_*`,
/// `IRGEN_*`, `EVM_*`/`EVM001`-`EVM999`) and lists its codes as `const`s, so
/// the set of codes a stage can emit is grep-able in one place rather than
/// scattered string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Code(pub &'static str);

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single diagnostic: a severity-tagged message, carrying an optional
/// source location and, for type errors, the expected/actual type strings
/// that made the message concrete (spec.md §6.4).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Code,
    pub message: String,
    pub location: Option<Span>,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: Code, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            code,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
        }
    }

    pub fn error(code: Code, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: Code, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: Code, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn with_location(mut self, span: Span) -> Self {
        self.location = Some(span);
        self
    }

    pub fn with_types(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " (expected {expected}, found {actual})")?;
        }
        Ok(())
    }
}

/// An append-only accumulator threaded through a stage, grouped by severity
/// on demand rather than continuously, so insertion order within a severity
/// is preserved (spec.md §5: "iteration over ordered sequences uses
/// insertion order").
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.items.push(diag);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// All diagnostics of a given severity, in insertion order.
    pub fn by_severity(&self, severity: Severity) -> Vec<&Diagnostic> {
        self.items.iter().filter(|d| d.severity == severity).collect()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Diagnostics {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPE_UNDEFINED_VARIABLE: Code = Code("TYPE_UNDEFINED_VARIABLE");

    #[test]
    fn has_errors_reflects_severity() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());
        diags.push(Diagnostic::warning(Code("TYPE_UNUSED"), "unused local `x`"));
        assert!(!diags.has_errors());
        diags.push(Diagnostic::error(TYPE_UNDEFINED_VARIABLE, "undefined variable `y`"));
        assert!(diags.has_errors());
    }

    #[test]
    fn by_severity_preserves_insertion_order() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error(Code("A"), "first"));
        diags.push(Diagnostic::error(Code("B"), "second"));
        let errors = diags.by_severity(Severity::Error);
        assert_eq!(errors[0].message, "first");
        assert_eq!(errors[1].message, "second");
    }
}
