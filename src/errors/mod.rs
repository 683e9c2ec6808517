//! Error handling for pseudoc
//!
//! Provides structured error types with source location tracking
//! for helpful diagnostic messages.

mod diagnostic;

use std::ops::Range;
use thiserror::Error;

pub use diagnostic::{format_error, offset_to_line_col, print_error};

/// A span in the source code, represented as a byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl SourceSpan {
    /// Create a new source span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Get the length of this span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl From<Range<usize>> for SourceSpan {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<SourceSpan> for Range<usize> {
    fn from(span: SourceSpan) -> Self {
        span.start..span.end
    }
}

/// The main error type for pseudoc operations
#[derive(Error, Debug)]
pub enum PseudocError {
    /// Malformed block structure: a closer with no matching opener, a closer
    /// of the wrong kind, or an opener still unclosed at end-of-input.
    #[error("Structure error: {message}")]
    Structure { message: String, span: SourceSpan },

    /// A TIMEOUT/RETRY directive with no following FUNCTION to attach to,
    /// or a contract annotation in a position where it cannot apply.
    #[error("Directive error: {message}")]
    Directive { message: String, span: SourceSpan },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PseudocError {
    /// Get the source span associated with this error, if any
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            PseudocError::Structure { span, .. } => Some(*span),
            PseudocError::Directive { span, .. } => Some(*span),
            PseudocError::Io(_) => None,
        }
    }

    /// Create a structure error
    pub fn structure(message: impl Into<String>, span: SourceSpan) -> Self {
        PseudocError::Structure {
            message: message.into(),
            span,
        }
    }

    /// Create a directive error
    pub fn directive(message: impl Into<String>, span: SourceSpan) -> Self {
        PseudocError::Directive {
            message: message.into(),
            span,
        }
    }
}

/// Result type alias for pseudoc operations
pub type PseudocResult<T> = Result<T, PseudocError>;
