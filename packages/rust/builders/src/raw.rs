//! `olm.builder.raw`: copies an existing declarative config stream.

use std::path::Path;

use async_trait::async_trait;
use compositor_shared::{Result, TemplateDefinition};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::declcfg;
use crate::{
    BuildContext, Builder, BuilderConfig, ImageRegistry, parse_template_config,
    validate_destination,
};

const NAME: &str = "olm.builder.raw";

#[derive(Debug, Deserialize)]
struct RawConfig {
    input: String,
    #[serde(default)]
    output: Option<String>,
}

/// Builder that re-emits its input in the configured output format.
#[derive(Debug, Clone)]
pub struct RawBuilder {
    config: BuilderConfig,
}

impl RawBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Builder for RawBuilder {
    #[instrument(skip_all, fields(builder = NAME, destination = %destination.display()))]
    async fn build(
        &self,
        ctx: &BuildContext,
        _registry: Option<&dyn ImageRegistry>,
        destination: &Path,
        template: &TemplateDefinition,
    ) -> Result<()> {
        ctx.check()?;
        let settings: RawConfig = parse_template_config(NAME, template)?;
        let objects = declcfg::read_objects(Path::new(&settings.input))?;

        let dir = self.config.output_dir(destination);
        let stem = settings.output.as_deref().unwrap_or("catalog");
        let path = declcfg::write_objects(&dir, stem, self.config.output_type, &objects)?;
        info!(path = %path.display(), objects = objects.len(), "raw catalog copied");
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

#[cfg(test)]
mod tests {
    use super::*;
    use compositor_shared::OutputType;
    use serde_json::json;

    #[tokio::test]
    async fn converts_json_input_to_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.json");
        std::fs::write(
            &input,
            r#"{"schema": "olm.package", "name": "foo"}
{"schema": "olm.channel", "name": "stable", "package": "foo", "entries": []}"#,
        )
        .unwrap();

        let builder = RawBuilder::new(BuilderConfig {
            working_dir: dir.path().to_path_buf(),
            output_type: OutputType::Yaml,
        });
        let template = TemplateDefinition {
            schema: NAME.into(),
            config: json!({"input": input.to_str().unwrap()}),
        };
        let ctx = BuildContext::new();
        builder
            .build(&ctx, None, Path::new("stable/foo"), &template)
            .await
            .unwrap();

        let written = declcfg::read_objects(&dir.path().join("stable/foo/catalog.yaml")).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[1]["name"], "stable");
        builder.validate(&ctx, Path::new("stable/foo")).await.unwrap();
    }

    #[tokio::test]
    async fn validate_flags_objects_without_schema() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("foo");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("catalog.json"), r#"{"name": "foo"}"#).unwrap();

        let builder = RawBuilder::new(BuilderConfig {
            working_dir: dir.path().to_path_buf(),
            output_type: OutputType::Json,
        });
        let err = builder
            .validate(&BuildContext::new(), Path::new("foo"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("has no schema"));
    }
}
