use thiserror::Error;

/// Kind of document a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Assessment,
    Subtest,
    Question,
    Result,
    Workflow,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Assessment => "assessment",
            DocumentKind::Subtest => "subtest",
            DocumentKind::Question => "question",
            DocumentKind::Result => "result",
            DocumentKind::Workflow => "workflow",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures that abort a header or flattening pass.
///
/// Timestamp window violations are not errors; they travel as data on
/// [`crate::window::Validation`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: DocumentKind, id: String },
    #[error("malformed {kind} '{id}': {reason}")]
    MalformedInput {
        kind: DocumentKind,
        id: String,
        reason: String,
    },
    #[error("document store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    pub fn not_found(kind: DocumentKind, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn malformed(kind: DocumentKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::MalformedInput {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn store(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        EngineError::Store(Box::new(source))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
