//! # textpeel-decompose
//!
//! Built-in format decomposers for the textpeel extraction engine, plus the
//! registry that turns configured name patterns into live instances.
//!
//! ## Decomposers
//!
//! | Name | Handles |
//! |------|---------|
//! | `csv` | Comma-separated values |
//! | `gzip` | Gzip-compressed streams (`.gz`, `.tgz`) |
//! | `tar` | Tar archives |
//! | `zip` | Zip archives |
//! | `xml` | Generic XML character data |
//! | `opendocument-*` | ODF text, presentation, and spreadsheet documents |
//! | `office-open-xml-*` | Word, PowerPoint, and Excel documents |
//! | `http-server` | Catch-all delegation to an external extraction server |
//!
//! Structural decomposers bid a score of `-1`; the `http-server` delegate
//! bids `100` so it only runs when nothing structural matched.

pub mod csv;
pub mod gzip;
pub mod http_server;
pub mod office_open_xml;
pub mod opendocument;
pub mod registry;
pub mod tar;
pub mod xml;
pub mod zip;

pub use registry::{DecomposerRegistry, Factory, Options, RegistryError};
