//! Batch XML `name`-attribute transformer.
//!
//! Processes a configured list of XML files, rewriting or stripping the
//! `name` attribute of selected tags, and writes the results to an output
//! directory:
//!
//! - Rename rules synthesize sequential values (`Tb1`, `Tb2`, ...) from a
//!   per-tag counter that restarts for every document
//! - Delete rules strip the `name` attribute from matching tags
//! - Everything else round-trips untouched: whitespace, comments, CDATA,
//!   attribute order
//!
//! ## Configuration Example
//!
//! ```yaml
//! files:
//!   - reports/example.xml
//! output_dir: output
//! rename:
//!   - tag: crosstab
//!     prefix: "Tb"
//! delete:
//!   - table
//! ```

pub mod config;
pub mod document;
pub mod rules;
pub mod runner;
pub mod transformer;

pub use config::TransformConfig;
pub use document::{Document, DocumentError};
pub use rules::{RuleEngine, RuleError, TagAction};
pub use runner::{BatchRunner, RunSummary};
pub use transformer::{ProcessingReport, Warning};
