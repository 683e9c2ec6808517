//! pseudoc - Line-oriented pseudocode to Python translator
//!
//! This crate translates a restricted pseudocode language (FUNCTION, SET,
//! IF/ELSE, FOR EACH, PARALLEL FOR EACH, WHILE, TRY/CATCH, contract
//! annotations, and TIMEOUT/RETRY decorators) into executable Python with
//! correct indentation and contract/timeout/retry wrapping. Unrecognized
//! lines pass through unchanged, so host-language snippets can be embedded
//! directly in the pseudocode.

pub mod assembler;
pub mod errors;
pub mod recognizer;

// Re-export commonly used types
pub use assembler::{translate, Translator};
pub use errors::{PseudocError, PseudocResult, SourceSpan};
pub use recognizer::{classify, to_snake, Emission, LineClass};
