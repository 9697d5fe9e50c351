//! Composite template resolution for Compositor.
//!
//! This crate ties together document parsing, builder-matrix assembly, and
//! per-component dispatch into a single render (see [`Template::render`]).

pub mod document;
pub mod matrix;
pub mod registry;
pub mod render;

#[cfg(test)]
mod testing;

pub use document::parse_document;
pub use matrix::{BuilderMap, CatalogBuilderMap, assemble, validate_catalogs};
pub use registry::{BuilderFactory, BuilderRegistry};
pub use render::{PlannedComponent, ProgressReporter, RenderSummary, SilentProgress, Template};
