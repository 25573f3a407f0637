//! Tree-sitter based symbol extraction for codelink.
//!
//! Turns Python source text into [`SourceRecord`](codelink_core::record::SourceRecord)s
//! (imports, classes, functions, call sites) and drives whole-project parsing
//! into a record store.

pub mod extract;
pub mod languages;
pub mod project;
pub mod treesitter;

pub use extract::{ExtractionError, extract, extract_or_failed};
pub use project::{
    ParseSummary, SourceFile, collect_source_files, get_file_record, parse_project, parse_sources,
};
