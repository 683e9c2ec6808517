//! Block assembler for the pseudocode translator
//!
//! Drives the line recognizer over a full source text, tracking block
//! nesting for indentation, buffering postconditions, and holding pending
//! timeout/retry directives until the next function header.

mod translator;

pub use translator::{translate, BlockKind, Translator};
