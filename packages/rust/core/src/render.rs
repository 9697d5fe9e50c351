//! End-to-end render: documents → builder matrix → per-component build.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use compositor_builders::{BuildContext, Builder, BuilderConfig, ImageRegistry};
use compositor_fetch::ConfigReader;
use compositor_shared::{CatalogConfig, CompositeConfig, CompositeError, OutputType, Result};
use tracing::{debug, info, instrument};

use crate::document::parse_document;
use crate::matrix::{self, CatalogBuilderMap};
use crate::registry::BuilderRegistry;

/// Progress callback for reporting render status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a component's build succeeds.
    fn component_built(&self, component: &str, current: usize, total: usize);
    /// Called after a component's validation succeeds.
    fn component_validated(&self, component: &str, current: usize, total: usize);
    /// Called when the render completes.
    fn done(&self, summary: &RenderSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn component_built(&self, _component: &str, _current: usize, _total: usize) {}
    fn component_validated(&self, _component: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RenderSummary) {}
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    /// Number of components built.
    pub components: usize,
    /// Whether each component was also validated.
    pub validated: bool,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// A component's resolved dispatch, as reported by [`Template::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedComponent {
    pub component: String,
    pub schema: String,
    pub builder: String,
    pub destination: String,
}

/// A composite template render.
///
/// Each configuration document is consumed by the first call to
/// [`Template::render`] or [`Template::check`].
pub struct Template {
    catalog_file: Option<ConfigReader>,
    contribution_file: Option<ConfigReader>,
    output_type: OutputType,
    image_registry: Option<Arc<dyn ImageRegistry>>,
    builders: BuilderRegistry,
    progress: Arc<dyn ProgressReporter>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// A template with the default builders and no documents.
    pub fn new() -> Self {
        Self {
            catalog_file: None,
            contribution_file: None,
            output_type: OutputType::default(),
            image_registry: None,
            builders: BuilderRegistry::default(),
            progress: Arc::new(SilentProgress),
        }
    }

    pub fn with_catalog_file(mut self, reader: impl Read + Send + 'static) -> Self {
        self.catalog_file = Some(Box::new(reader));
        self
    }

    pub fn with_contribution_file(mut self, reader: impl Read + Send + 'static) -> Self {
        self.contribution_file = Some(Box::new(reader));
        self
    }

    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    /// Image registry handed to every builder call.
    pub fn with_image_registry(mut self, registry: Arc<dyn ImageRegistry>) -> Self {
        self.image_registry = Some(registry);
        self
    }

    /// Replace the builder registry wholesale.
    pub fn with_builders(mut self, builders: BuilderRegistry) -> Self {
        self.builders = builders;
        self
    }

    /// Register (or override) a single builder factory.
    pub fn with_builder<F>(mut self, schema: impl Into<String>, factory: F) -> Self
    where
        F: Fn(BuilderConfig) -> Box<dyn Builder> + Send + Sync + 'static,
    {
        self.builders.register(schema, factory);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Build every component in document order, validating each one after
    /// its build when `validate` is set. Stops at the first failure.
    #[instrument(skip_all, fields(validate = validate))]
    pub async fn render(&mut self, ctx: &BuildContext, validate: bool) -> Result<RenderSummary> {
        let start = Instant::now();

        self.progress.phase("Parsing configuration");
        let (catalog_config, composite_config) = self.parse_documents()?;

        self.progress.phase("Assembling builders");
        let matrix = matrix::assemble(&catalog_config.catalogs, self.output_type, &self.builders)?;

        self.progress.phase("Building components");
        let total = composite_config.components.len();
        info!(components = total, "rendering components");

        for (i, component) in composite_config.components.iter().enumerate() {
            let builder = matrix.builder_for(component)?;
            let destination = Path::new(&component.destination.path);
            let template = &component.strategy.template;

            debug!(
                component = %component.name,
                schema = %template.schema,
                destination = %component.destination.path,
                "building component"
            );
            builder
                .build(ctx, self.image_registry.as_deref(), destination, template)
                .await
                .map_err(|e| CompositeError::Build {
                    component: component.name.clone(),
                    source: Box::new(e),
                })?;
            self.progress.component_built(&component.name, i + 1, total);

            if validate {
                builder
                    .validate(ctx, destination)
                    .await
                    .map_err(|e| CompositeError::Validate {
                        component: component.name.clone(),
                        source: Box::new(e),
                    })?;
                self.progress.component_validated(&component.name, i + 1, total);
            }
        }

        let summary = RenderSummary {
            components: total,
            validated: validate,
            elapsed: start.elapsed(),
        };
        info!(
            components = summary.components,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "render complete"
        );
        self.progress.done(&summary);
        Ok(summary)
    }

    /// Resolve every component's builder without building anything.
    #[instrument(skip_all)]
    pub fn check(&mut self) -> Result<Vec<PlannedComponent>> {
        let (catalog_config, composite_config) = self.parse_documents()?;
        let matrix = matrix::assemble(&catalog_config.catalogs, self.output_type, &self.builders)?;
        plan(&matrix, &composite_config)
    }

    fn parse_documents(&mut self) -> Result<(CatalogConfig, CompositeConfig)> {
        let catalog_file = self
            .catalog_file
            .take()
            .ok_or_else(|| CompositeError::config("no catalog configuration provided"))?;
        let contribution_file = self
            .contribution_file
            .take()
            .ok_or_else(|| CompositeError::config("no composite configuration provided"))?;

        let catalog_config: CatalogConfig = parse_document(catalog_file)?;
        let composite_config: CompositeConfig = parse_document(contribution_file)?;
        debug!(
            catalogs = catalog_config.catalogs.len(),
            components = composite_config.components.len(),
            "configuration documents parsed"
        );
        Ok((catalog_config, composite_config))
    }
}

fn plan(matrix: &CatalogBuilderMap, composite: &CompositeConfig) -> Result<Vec<PlannedComponent>> {
    composite
        .components
        .iter()
        .map(|component| {
            let builder = matrix.builder_for(component)?;
            Ok(PlannedComponent {
                component: component.name.clone(),
                schema: component.strategy.template.schema.clone(),
                builder: builder.name().to_string(),
                destination: component.destination.path.clone(),
            })
        })
        .collect()
}
