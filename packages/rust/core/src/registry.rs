//! Schema-keyed builder factories.
//!
//! A [`BuilderRegistry`] is a plain value: the default one is seeded from a
//! static table, and callers extend or override entries by registering before
//! rendering. Nothing here is global.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use compositor_builders::{
    BasicBuilder, Builder, BuilderConfig, CustomBuilder, RawBuilder, SemverBuilder,
};
use compositor_shared::{
    BASIC_BUILDER_SCHEMA, CUSTOM_BUILDER_SCHEMA, CompositeError, RAW_BUILDER_SCHEMA, Result,
    SEMVER_BUILDER_SCHEMA,
};

/// Constructs a builder from its configuration. Must not perform I/O.
pub type BuilderFactory = Arc<dyn Fn(BuilderConfig) -> Box<dyn Builder> + Send + Sync>;

/// Builders available without any registration.
const DEFAULT_BUILDERS: &[(&str, fn(BuilderConfig) -> Box<dyn Builder>)] = &[
    (BASIC_BUILDER_SCHEMA, basic),
    (SEMVER_BUILDER_SCHEMA, semver),
    (RAW_BUILDER_SCHEMA, raw),
    (CUSTOM_BUILDER_SCHEMA, custom),
];

fn basic(config: BuilderConfig) -> Box<dyn Builder> {
    Box::new(BasicBuilder::new(config))
}
fn semver(config: BuilderConfig) -> Box<dyn Builder> {
    Box::new(SemverBuilder::new(config))
}
fn raw(config: BuilderConfig) -> Box<dyn Builder> {
    Box::new(RawBuilder::new(config))
}
fn custom(config: BuilderConfig) -> Box<dyn Builder> {
    Box::new(CustomBuilder::new(config))
}

/// Maps builder schema identifiers to factories.
#[derive(Clone)]
pub struct BuilderRegistry {
    factories: HashMap<String, BuilderFactory>,
}

impl BuilderRegistry {
    /// A registry with no builders at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` for `schema`, replacing any existing entry.
    pub fn register<F>(&mut self, schema: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(BuilderConfig) -> Box<dyn Builder> + Send + Sync + 'static,
    {
        self.factories.insert(schema.into(), Arc::new(factory));
        self
    }

    /// Construct the builder registered for `schema`.
    pub fn resolve(&self, schema: &str, config: BuilderConfig) -> Result<Box<dyn Builder>> {
        let factory = self
            .factories
            .get(schema)
            .ok_or_else(|| CompositeError::UnknownSchema {
                schema: schema.to_string(),
            })?;
        Ok(factory(config))
    }

    pub fn contains(&self, schema: &str) -> bool {
        self.factories.contains_key(schema)
    }

    /// Registered schema identifiers, sorted.
    pub fn schemas(&self) -> Vec<&str> {
        let mut schemas: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        schemas.sort_unstable();
        schemas
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (schema, factory) in DEFAULT_BUILDERS {
            registry.register(*schema, *factory);
        }
        registry
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("schemas", &self.schemas())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBuilder;

    #[test]
    fn default_registry_has_four_builders() {
        let registry = BuilderRegistry::default();
        assert_eq!(
            registry.schemas(),
            vec![
                BASIC_BUILDER_SCHEMA,
                CUSTOM_BUILDER_SCHEMA,
                RAW_BUILDER_SCHEMA,
                SEMVER_BUILDER_SCHEMA,
            ]
        );
    }

    #[test]
    fn resolve_builds_matching_builder() {
        let registry = BuilderRegistry::default();
        let builder = registry
            .resolve(SEMVER_BUILDER_SCHEMA, BuilderConfig::default())
            .unwrap();
        assert_eq!(builder.name(), SEMVER_BUILDER_SCHEMA);
    }

    #[test]
    fn resolve_unknown_schema_fails() {
        let registry = BuilderRegistry::default();
        let err = match registry.resolve("olm.builder.nope", BuilderConfig::default()) {
            Ok(_) => panic!("expected error"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            CompositeError::UnknownSchema { schema } if schema == "olm.builder.nope"
        ));
    }

    #[test]
    fn register_overrides_default() {
        let log = crate::testing::CallLog::default();
        let mut registry = BuilderRegistry::default();
        let factory_log = log.clone();
        registry.register(BASIC_BUILDER_SCHEMA, move |_config| {
            Box::new(RecordingBuilder::new("override", factory_log.clone()))
        });

        let builder = registry
            .resolve(BASIC_BUILDER_SCHEMA, BuilderConfig::default())
            .unwrap();
        assert_eq!(builder.name(), "override");
        assert_eq!(registry.schemas().len(), 4);
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = BuilderRegistry::empty();
        assert!(!registry.contains(BASIC_BUILDER_SCHEMA));
        assert!(registry.resolve(BASIC_BUILDER_SCHEMA, BuilderConfig::default()).is_err());
    }
}
