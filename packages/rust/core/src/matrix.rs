//! Catalog → schema → builder matrix assembly.
//!
//! Catalog field validation is collected across every catalog before
//! failing; builder resolution stops at the first unknown schema.

use std::collections::HashMap;
use std::path::PathBuf;

use compositor_builders::{Builder, BuilderConfig};
use compositor_shared::{Catalog, CatalogFieldErrors, CompositeError, Component, OutputType, Result};
use tracing::{debug, info};

use crate::registry::BuilderRegistry;

/// Builders for one catalog, keyed by schema.
pub type BuilderMap = HashMap<String, Box<dyn Builder>>;

/// Builders for every catalog, keyed by catalog name.
#[derive(Default)]
pub struct CatalogBuilderMap {
    catalogs: HashMap<String, BuilderMap>,
}

impl CatalogBuilderMap {
    /// The builder map for a catalog, if it was declared.
    pub fn get(&self, catalog: &str) -> Option<&BuilderMap> {
        self.catalogs.get(catalog)
    }

    /// Declared catalog names, sorted.
    pub fn catalog_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.catalogs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    /// Find the builder a component asks for.
    pub fn builder_for(&self, component: &Component) -> Result<&dyn Builder> {
        let builders = self
            .get(&component.name)
            .ok_or_else(|| CompositeError::UnknownComponentCatalog {
                component: component.name.clone(),
                available: self.catalog_names(),
            })?;

        let schema = &component.strategy.template.schema;
        builders
            .get(schema)
            .map(|builder| &**builder)
            .ok_or_else(|| CompositeError::UnknownComponentSchema {
                component: component.name.clone(),
                schema: schema.clone(),
            })
    }
}

/// Field errors for one catalog; empty when the catalog is valid.
fn catalog_field_errors(catalog: &Catalog) -> Vec<String> {
    let mut errs = Vec::new();
    if catalog.destination.working_dir.is_empty() {
        errs.push("destination.workingDir must not be an empty string".to_string());
    }
    errs
}

/// Check required fields of every catalog, reporting all failures together.
pub fn validate_catalogs(catalogs: &[Catalog]) -> Result<()> {
    let mut failed: Vec<CatalogFieldErrors> = Vec::new();
    for catalog in catalogs {
        let errors = catalog_field_errors(catalog);
        if errors.is_empty() {
            continue;
        }
        // A repeated name reports its latest definition.
        match failed.iter_mut().find(|f| f.catalog == catalog.name) {
            Some(existing) => existing.errors = errors,
            None => failed.push(CatalogFieldErrors {
                catalog: catalog.name.clone(),
                errors,
            }),
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CompositeError::FieldValidation { catalogs: failed })
    }
}

/// Validate `catalogs` and construct a builder for every declared schema.
///
/// The first definition of a repeated catalog name wins.
pub fn assemble(
    catalogs: &[Catalog],
    output_type: OutputType,
    registry: &BuilderRegistry,
) -> Result<CatalogBuilderMap> {
    validate_catalogs(catalogs)?;

    let mut matrix = CatalogBuilderMap::default();
    for catalog in catalogs {
        if matrix.catalogs.contains_key(&catalog.name) {
            debug!(catalog = %catalog.name, "duplicate catalog definition ignored");
            continue;
        }

        let mut builders = BuilderMap::new();
        for schema in &catalog.builders {
            let config = BuilderConfig {
                working_dir: PathBuf::from(&catalog.destination.working_dir),
                output_type,
            };
            let builder = registry
                .resolve(schema, config)
                .map_err(|e| CompositeError::BuilderSetup {
                    catalog: catalog.name.clone(),
                    schema: schema.clone(),
                    source: Box::new(e),
                })?;
            builders.insert(schema.clone(), builder);
        }
        debug!(catalog = %catalog.name, builders = builders.len(), "catalog builders ready");
        matrix.catalogs.insert(catalog.name.clone(), builders);
    }

    info!(catalogs = matrix.len(), "catalog builder matrix assembled");
    Ok(matrix)
}
