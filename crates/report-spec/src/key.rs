use std::fmt;

use crate::counters::occurrence_suffix;

/// Structured column/value key rendered as `<scope>[_m].<field>[_n]`.
///
/// `scope` is a subtest or assessment id (or a workflow id for messages),
/// `n` the prototype occurrence and `m` the occurrence of the enclosing
/// workflow child. Keys without a scope render as the bare field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    scope: String,
    scope_occurrence: usize,
    field: String,
    occurrence: usize,
}

impl ColumnKey {
    pub fn new(scope: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            scope_occurrence: 0,
            field: field.into(),
            occurrence: 0,
        }
    }

    pub fn bare(field: impl Into<String>) -> Self {
        Self::new(String::new(), field)
    }

    pub fn with_occurrence(mut self, occurrence: usize) -> Self {
        self.occurrence = occurrence;
        self
    }

    pub fn in_scope_occurrence(mut self, scope_occurrence: usize) -> Self {
        self.scope_occurrence = scope_occurrence;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Field with its occurrence suffix, used as the display label.
    pub fn label(&self) -> String {
        format!("{}{}", self.field, occurrence_suffix(self.occurrence))
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scope.is_empty() {
            write!(
                f,
                "{}{}.",
                self.scope,
                occurrence_suffix(self.scope_occurrence)
            )?;
        }
        write!(f, "{}{}", self.field, occurrence_suffix(self.occurrence))
    }
}
