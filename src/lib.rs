//! Analyzers and code fixes for C# source.
//!
//! Two rules are provided:
//!
//! * `DS0001` flags constructors whose declaration line is longer than the
//!   configured maximum and offers to put each parameter on its own line.
//! * `DS0052` flags private fields that a constructor assigns but nothing
//!   reads, and offers to remove the field together with its assignments and
//!   the parameters that only fed them.
//!
//! Sources are parsed with tree-sitter. Rules report [`rules::Issue`]s; fixes
//! are byte-range edits produced against the same immutable snapshot and
//! applied by [`autofix::apply_fix`].

pub mod analyzer;
pub mod autofix;
pub mod config;
pub mod error;
pub mod rules;
pub mod semantic;
pub mod source;
pub mod syntax;
pub mod walker;

pub use analyzer::Analyzer;
pub use config::Config;
pub use error::{Error, NotApplicable, Result};
