//! `olm.builder.basic`: renders an `olm.template.basic` document.
//!
//! The template lists declarative config entries verbatim. Bundle entries
//! given only by `image` are rendered through the image registry.

use std::path::Path;

use async_trait::async_trait;
use compositor_shared::{CompositeError, Result, TemplateDefinition};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::declcfg::{self, BUNDLE_SCHEMA};
use crate::{
    BuildContext, Builder, BuilderConfig, ImageRegistry, parse_template_config,
    validate_destination,
};

/// Schema the input template must declare.
pub const BASIC_TEMPLATE_SCHEMA: &str = "olm.template.basic";

const NAME: &str = "olm.builder.basic";

#[derive(Debug, Deserialize)]
struct BasicConfig {
    /// Path to the template document.
    input: String,
    /// Output file stem; defaults to `catalog`.
    #[serde(default)]
    output: Option<String>,
}

/// Builder for basic templates.
#[derive(Debug, Clone)]
pub struct BasicBuilder {
    config: BuilderConfig,
}

impl BasicBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Builder for BasicBuilder {
    #[instrument(skip_all, fields(builder = NAME, destination = %destination.display()))]
    async fn build(
        &self,
        ctx: &BuildContext,
        registry: Option<&dyn ImageRegistry>,
        destination: &Path,
        template: &TemplateDefinition,
    ) -> Result<()> {
        ctx.check()?;
        let settings: BasicConfig = parse_template_config(NAME, template)?;

        let objects = declcfg::read_objects(Path::new(&settings.input))?;
        let template_doc = objects.into_iter().next().ok_or_else(|| {
            CompositeError::template(format!("{}: template is empty", settings.input))
        })?;
        let schema = declcfg::schema_of(&template_doc).unwrap_or_default();
        if schema != BASIC_TEMPLATE_SCHEMA {
            return Err(CompositeError::template(format!(
                "{}: template has schema {schema:?}, expected {BASIC_TEMPLATE_SCHEMA:?}",
                settings.input
            )));
        }

        let entries = match template_doc.get("entries") {
            Some(Value::Array(entries)) => entries.clone(),
            Some(_) => {
                return Err(CompositeError::template(format!(
                    "{}: entries must be a list",
                    settings.input
                )));
            }
            None => Vec::new(),
        };

        let mut rendered = Vec::with_capacity(entries.len());
        for entry in entries {
            rendered.push(render_entry(ctx, registry, entry).await?);
        }

        let dir = self.config.output_dir(destination);
        let stem = settings.output.as_deref().unwrap_or("catalog");
        let path = declcfg::write_objects(&dir, stem, self.config.output_type, &rendered)?;
        info!(path = %path.display(), objects = rendered.len(), "basic template rendered");
        Ok(())
    }

    async fn validate(&self, ctx: &BuildContext, destination: &Path) -> Result<()> {
        ctx.check()?;
        validate_destination(&self.config, destination)
    }

    fn name(&self) -> &str {
        NAME
    }
}

/// Expand an image-only bundle entry; pass everything else through.
async fn render_entry(
    ctx: &BuildContext,
    registry: Option<&dyn ImageRegistry>,
    entry: Value,
) -> Result<Value> {
    let is_bundle = declcfg::schema_of(&entry) == Some(BUNDLE_SCHEMA);
    let has_name = entry.get("name").and_then(Value::as_str).is_some();
    let image = entry.get("image").and_then(Value::as_str);

    match (is_bundle, has_name, image) {
        (true, false, Some(image)) => {
            let registry = registry.ok_or_else(|| {
                CompositeError::template(format!(
                    "bundle image {image:?} cannot be rendered without an image registry"
                ))
            })?;
            debug!(%image, "rendering bundle image");
            registry.render_bundle(ctx, image).await
        }
        _ => Ok(entry),
    }
}
