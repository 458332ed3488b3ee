//! # textpeel-core
//!
//! Core types and traits for the textpeel recursive text extraction engine.
//!
//! This crate provides the foundational abstractions used throughout
//! textpeel:
//!
//! - **Data Model**: [`Data`] nodes carrying content, MIME types, metadata
//!   attributes, lineage, and resource bounds
//! - **Decomposition**: the [`Decomposer`] trait implemented by every format
//!   handler, with [`Children`] as the output sink
//! - **Resource Bounds**: [`TimeValue`] budgets and human-readable size
//!   parsing
//! - **Encoding**: byte-to-UTF-8 normalization for plain-text leaves
//! - **MIME Detection**: an extension registry with magic-byte sniffing
//!
//! ## Architecture
//!
//! The engine walks a decomposition tree:
//!
//! ```text
//! Data → Decomposer → Children (Data…) → Decomposer → …
//!                        ↓ (text/plain leaves)
//!                  normalized UTF-8 text
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Data`] | One node in the decomposition tree |
//! | [`Content`] | Body storage (in-memory, caller file, or spill file) |
//! | [`Attributes`] | Typed metadata attached to a node |
//! | [`Children`] | Output sink applying the parent-to-child merge contract |
//! | [`TimeValue`] | A possibly-unbounded time budget |
//! | [`MimeRegistry`] | Extension-to-MIME mapping with content sniffing |
//!
//! ## Related Crates
//!
//! - `textpeel-decompose`: Built-in format handlers and their registry
//! - `textpeel-extract`: The recursive extraction engine and output formatters
//! - `textpeel`: Command-line interface

pub mod attributes;
pub mod content;
pub mod data;
pub mod decomposer;
pub mod encoding;
pub mod error;
pub mod limits;
pub mod mime;
pub mod uri;

pub use attributes::{AttributeValue, Attributes};
pub use content::Content;
pub use data::{Children, Data, Lineage, Screenshot};
pub use decomposer::Decomposer;
pub use error::{DecomposeError, ExtractError, Result};
pub use limits::{min_size, parse_size, TimeValue};
pub use mime::MimeRegistry;
