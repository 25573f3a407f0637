//! Dependency graph construction for codelink.
//!
//! [`builder`] turns a project's source records into a [`DependencyGraph`]
//! in two passes; [`resolution`] holds the name-based lookup tables used by
//! the second pass; [`cache`] keeps built graphs per project.
//!
//! [`DependencyGraph`]: codelink_core::graph::DependencyGraph

pub mod builder;
pub mod cache;
pub mod resolution;

pub use builder::{build_graph, build_project_graph};
pub use cache::GraphCache;
