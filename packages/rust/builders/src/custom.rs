//! `olm.builder.custom`: runs a user command and captures its stdout as catalog content.
//!
//! The command is spawned directly (no shell) with the component's output
//! directory as its working directory.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use compositor_shared::{CompositeError, Result, TemplateDefinition};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::declcfg;
use crate::{
    BuildContext, Builder, BuilderConfig, ImageRegistry, parse_template_config,
    validate_destination,
};

const NAME: &str = "olm.builder.custom";

#[derive(Debug, Deserialize)]
struct CustomConfig {
    /// Program to execute (in PATH or absolute).
    command: String,
    #[serde(default)]
    args: Vec<String>,
    /// Output file stem.
    output: String,
}

/// Builder that delegates rendering to an external command.
#[derive(Debug, Clone)]
pub struct CustomBuilder {
    config: BuilderConfig,
}

impl CustomBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Builder for CustomBuilder {
    #[instrument(skip_all, fields(builder = NAME, destination = %destination.display()))]
    async fn build(
        &self,
        ctx: &BuildContext,
        _registry: Option<&dyn ImageRegistry>,
        destination: &Path,
        template: &TemplateDefinition,
    ) -> Result<()> {
        ctx.check()?;
        let settings: CustomConfig = parse_template_config(NAME, template)?;
        if settings.command.is_empty() {
            return Err(CompositeError::template(format!(
                "invalid config for {NAME}: command must not be empty"
            )));
        }

        let dir = self.config.output_dir(destination);
        std::fs::create_dir_all(&dir).map_err(|e| CompositeError::io(&dir, e))?;

        debug!(command = %settings.command, args = ?settings.args, "running custom command");
        let output = Command::new(&settings.command)
            .args(&settings.args)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CompositeError::Command {
                command: settings.command.clone(),
                message: format!("failed to spawn: {e}"),
            })?;

        if !output.status.success() {
            return Err(CompositeError::Command {
                command: settings.command,
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let objects = declcfg::decode_stream(&output.stdout).map_err(|e| {
            CompositeError::template(format!("output of `{}`: {e}", settings.command))
        })?;
        let path =
            declcfg::write_objects(&dir, &settings.output, self.config.output_type, &objects)?;
        info!(path = %path.display(), objects = objects.len(), "custom command rendered");
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
