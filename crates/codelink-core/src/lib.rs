//! Core types and storage for codelink.
//!
//! Provides the per-file extraction record ([`record::SourceRecord`]), the
//! dependency graph ([`graph::DependencyGraph`]), the record store abstraction,
//! JSON persistence for built graphs, and project configuration.

pub mod config;
pub mod graph;
pub mod paths;
pub mod record;
pub mod schema;
pub mod storage;
pub mod store;
