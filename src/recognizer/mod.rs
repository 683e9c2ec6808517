//! Line recognizer for the pseudocode grammar
//!
//! Hand-written, per-line keyword matching: each trimmed input line is
//! classified against a fixed, ordered set of patterns, and every match
//! knows how to render its Python payload.

mod classify;
mod ident;

pub use classify::{classify, Emission, LineClass};
pub use ident::{canonicalize_expr, to_snake};
