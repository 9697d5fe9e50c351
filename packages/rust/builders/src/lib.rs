//! Catalog builders and the capability boundary the render core drives.
//!
//! This crate provides:
//! - [`Builder`]: the `build` / `validate` capability each strategy implements
//! - [`BuildContext`]: cancellation shared by one render
//! - [`ImageRegistry`]: opaque bundle-image capability passed through to builders
//! - Default strategies: [`BasicBuilder`], [`SemverBuilder`], [`RawBuilder`], [`CustomBuilder`]

mod basic;
mod custom;
pub mod declcfg;
mod raw;
mod semver_template;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use compositor_shared::{CompositeError, OutputType, Result, TemplateDefinition};

pub use basic::BasicBuilder;
pub use custom::CustomBuilder;
pub use raw::RawBuilder;
pub use semver_template::SemverBuilder;

// ---------------------------------------------------------------------------
// BuildContext
// ---------------------------------------------------------------------------

/// Per-render context threaded through to every builder call.
///
/// Clones share the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    cancelled: Arc<AtomicBool>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Builders observe it at their next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fail with [`CompositeError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(CompositeError::Cancelled);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ImageRegistry
// ---------------------------------------------------------------------------

/// Access to bundle images referenced by templates.
///
/// The render core never calls this; it only hands a reference to builders.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Render the `olm.bundle` declarative config object for an image reference.
    async fn render_bundle(&self, ctx: &BuildContext, image: &str) -> Result<serde_json::Value>;
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Settings every builder is constructed with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Catalog working directory; component destinations are relative to it.
    pub working_dir: PathBuf,
    /// Format of the files the builder writes.
    pub output_type: OutputType,
}

impl BuilderConfig {
    /// Resolve a component destination against the working directory.
    pub fn output_dir(&self, destination: &Path) -> PathBuf {
        self.working_dir.join(destination)
    }
}

/// A strategy that materializes catalog content for one template schema.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Render `template` into `destination`.
    async fn build(
        &self,
        ctx: &BuildContext,
        registry: Option<&dyn ImageRegistry>,
        destination: &Path,
        template: &TemplateDefinition,
    ) -> Result<()>;

    /// Check the content previously written to `destination`.
    async fn validate(&self, ctx: &BuildContext, destination: &Path) -> Result<()>;

    /// Human-readable builder name for tracing.
    fn name(&self) -> &str;
}

/// Decode a builder's `config` value into its typed settings.
pub(crate) fn parse_template_config<T: serde::de::DeserializeOwned>(
    builder: &str,
    template: &TemplateDefinition,
) -> Result<T> {
    serde_json::from_value(template.config.clone()).map_err(|e| {
        CompositeError::template(format!("invalid config for {builder}: {e}"))
    })
}

/// Shared `validate` behaviour: every output file in the destination must
/// hold well-formed declarative config.
pub(crate) fn validate_destination(config: &BuilderConfig, destination: &Path) -> Result<()> {
    let dir = config.output_dir(destination);
    let files = declcfg::output_files(&dir, config.output_type)?;
    if files.is_empty() {
        return Err(CompositeError::template(format!(
            "no {} catalog files found in {}",
            config.output_type,
            dir.display()
        )));
    }
    for file in files {
        let objects = declcfg::read_objects(&file)?;
        declcfg::validate_objects(&objects).map_err(|e| {
            CompositeError::template(format!("{}: {e}", file.display()))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_clones_share_cancellation() {
        let ctx = BuildContext::new();
        let other = ctx.clone();
        assert!(ctx.check().is_ok());
        other.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check(), Err(CompositeError::Cancelled)));
    }

    #[test]
    fn output_dir_joins_working_dir() {
        let config = BuilderConfig {
            working_dir: PathBuf::from("/tmp/catalog"),
            output_type: OutputType::Yaml,
        };
        assert_eq!(
            config.output_dir(Path::new("stable/pkg")),
            PathBuf::from("/tmp/catalog/stable/pkg")
        );
    }

    #[test]
    fn template_config_errors_name_the_builder() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Needs {
            input: String,
        }
        let template = TemplateDefinition {
            schema: "olm.builder.basic".into(),
            config: serde_json::json!({"output": "x"}),
        };
        let err = parse_template_config::<Needs>("olm.builder.basic", &template).unwrap_err();
        assert!(err.to_string().contains("invalid config for olm.builder.basic"));
    }
}
