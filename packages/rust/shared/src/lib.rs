//! Shared types, error model, and configuration for Compositor.
//!
//! This crate is the foundation depended on by all other Compositor crates.
//! It provides:
//! - [`CompositeError`]: the unified error type
//! - Document types ([`CatalogConfig`], [`CompositeConfig`], [`TemplateDefinition`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{CatalogFieldErrors, CompositeError, Result};
pub use types::{
    BASIC_BUILDER_SCHEMA, BuildStrategy, CATALOG_SCHEMA, COMPOSITE_SCHEMA, CUSTOM_BUILDER_SCHEMA,
    Catalog, CatalogConfig, CatalogDestination, Component, ComponentDestination,
    CompositeConfig, DocumentKind, OutputType, RAW_BUILDER_SCHEMA, SEMVER_BUILDER_SCHEMA,
    SchemaDocument, TemplateDefinition,
};
