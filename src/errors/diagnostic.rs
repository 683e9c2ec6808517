//! Pretty error reporting using ariadne
//!
//! Provides colorful, user-friendly error messages with source context.

use crate::errors::PseudocError;
use ariadne::{Color, Label, Report, ReportKind, Source};

/// Print an error with source context
pub fn print_error(source: &str, _filename: &str, error: &PseudocError) {
    let (message, span, kind) = match error {
        PseudocError::Structure { message, span } => (message.as_str(), *span, "Structure error"),
        PseudocError::Directive { message, span } => (message.as_str(), *span, "Directive error"),
        PseudocError::Io(e) => {
            eprintln!("IO error: {}", e);
            return;
        }
    };

    Report::build(ReportKind::Error, span.start..span.end)
        .with_message(kind)
        .with_label(
            Label::new(span.start..span.end)
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish()
        .eprint(Source::from(source))
        .expect("failed to print error report");
}

/// Format an error as a string (for testing)
pub fn format_error(source: &str, _filename: &str, error: &PseudocError) -> String {
    let (message, span, kind) = match error {
        PseudocError::Structure { message, span } => (message.as_str(), *span, "Structure error"),
        PseudocError::Directive { message, span } => (message.as_str(), *span, "Directive error"),
        PseudocError::Io(e) => return format!("IO error: {}", e),
    };

    let mut output = Vec::new();

    Report::build(ReportKind::Error, span.start..span.end)
        .with_message(kind)
        .with_label(
            Label::new(span.start..span.end)
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish()
        .write(Source::from(source), &mut output)
        .expect("failed to write error report");

    String::from_utf8(output).expect("error report should be valid UTF-8")
}

/// Get the line and column for a byte offset
pub fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceSpan;

    #[test]
    fn test_offset_to_line_col() {
        let source = "line1\nline2\nline3";

        assert_eq!(offset_to_line_col(source, 0), (1, 1));
        assert_eq!(offset_to_line_col(source, 5), (1, 6));
        assert_eq!(offset_to_line_col(source, 6), (2, 1));
        assert_eq!(offset_to_line_col(source, 12), (3, 1));
    }

    #[test]
    fn test_format_error_mentions_message() {
        let source = "ENDIF\n";
        let err = PseudocError::structure("ENDIF with no matching IF", SourceSpan::new(0, 5));
        let report = format_error(source, "input.pseudo", &err);
        assert!(report.contains("ENDIF with no matching IF"));
    }
}
