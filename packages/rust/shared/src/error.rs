//! Error types for Compositor.
//!
//! Library crates use [`CompositeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::types::DocumentKind;

/// Field validation failures collected for a single catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFieldErrors {
    /// Name of the offending catalog.
    pub catalog: String,
    /// One message per failed field check.
    pub errors: Vec<String>,
}

/// Top-level error type for all Compositor operations.
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Transport failure while fetching a remote document.
    #[error("fetching remote config file {url:?}: {message}")]
    Fetch { url: String, message: String },

    /// Bytes are neither YAML nor JSON.
    #[error("decoding {document} config: {message}")]
    Decode {
        document: DocumentKind,
        message: String,
    },

    /// Document decoded but does not match the expected shape.
    #[error("unmarshalling {document} config: {source}")]
    Unmarshal {
        document: DocumentKind,
        source: serde_json::Error,
    },

    /// The document's `schema` field is not the expected constant.
    #[error("{document} configuration file has unknown schema {found:?}, should be {expected:?}")]
    SchemaMismatch {
        document: DocumentKind,
        expected: &'static str,
        found: String,
    },

    /// One or more catalogs failed required-field validation.
    #[error(
        "catalog configuration file field validation failed: {}",
        render_field_errors(.catalogs)
    )]
    FieldValidation { catalogs: Vec<CatalogFieldErrors> },

    /// No builder factory is registered for a schema.
    #[error("unknown schema {schema:?}")]
    UnknownSchema { schema: String },

    /// A catalog declared a builder that could not be constructed.
    #[error("getting builder {schema:?} for catalog {catalog:?}: {source}")]
    BuilderSetup {
        catalog: String,
        schema: String,
        source: Box<CompositeError>,
    },

    /// A component names a catalog missing from the catalog configuration.
    #[error(
        "building component {component:?}: component does not exist in the catalog configuration. Available components are: [{}]",
        .available.join(", ")
    )]
    UnknownComponentCatalog {
        component: String,
        available: Vec<String>,
    },

    /// A component requests a schema its catalog does not declare.
    #[error("building component {component:?}: no builder found for template schema {schema:?}")]
    UnknownComponentSchema { component: String, schema: String },

    /// The builder failed to build a component.
    #[error("building component {component:?}: {source}")]
    Build {
        component: String,
        source: Box<CompositeError>,
    },

    /// The builder failed to validate a component's output.
    #[error("validating component {component:?}: {source}")]
    Validate {
        component: String,
        source: Box<CompositeError>,
    },

    /// A builder's template input or configuration is unusable.
    #[error("template error: {message}")]
    Template { message: String },

    /// An external command run by a builder failed.
    #[error("command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// The render was cancelled before the builder could run.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CompositeError>;

impl CompositeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a template error from any displayable message.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn render_field_errors(catalogs: &[CatalogFieldErrors]) -> String {
    let mut out = String::new();
    for entry in catalogs {
        let _ = writeln!(out, "\nCatalog {}:", entry.catalog);
        for err in &entry.errors {
            let _ = writeln!(out, "  - {err}");
        }
    }
    out
}
