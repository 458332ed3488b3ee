//! # textpeel-extract
//!
//! The recursive extraction engine and output formatters for textpeel.
//!
//! [`Extractor`] walks a decomposition tree depth-first: every node is
//! MIME-typed, text leaves are normalized to UTF-8 and emitted, and container
//! nodes are handed to the best-bidding decomposer. [`Formatter`]
//! implementations render the emitted leaves as JSON or plain text.

pub mod extractor;
pub mod format;

pub use extractor::Extractor;
pub use format::{Formatter, JsonFormatter, TextFormatter};
