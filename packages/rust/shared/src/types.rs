//! Document types for the catalog and composite configuration files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CompositeError;

/// Expected `schema` of a catalog configuration document.
pub const CATALOG_SCHEMA: &str = "olm.composite.catalogs";

/// Expected `schema` of a composite (contribution) configuration document.
pub const COMPOSITE_SCHEMA: &str = "olm.composite";

/// Builder schema identifiers registered by default.
pub const BASIC_BUILDER_SCHEMA: &str = "olm.builder.basic";
pub const SEMVER_BUILDER_SCHEMA: &str = "olm.builder.semver";
pub const RAW_BUILDER_SCHEMA: &str = "olm.builder.raw";
pub const CUSTOM_BUILDER_SCHEMA: &str = "olm.builder.custom";

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

/// Which of the two configuration documents is being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Catalog,
    Composite,
}

impl DocumentKind {
    /// The `schema` value a document of this kind must declare.
    pub fn expected_schema(self) -> &'static str {
        match self {
            Self::Catalog => CATALOG_SCHEMA,
            Self::Composite => COMPOSITE_SCHEMA,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => f.write_str("catalog"),
            Self::Composite => f.write_str("composite"),
        }
    }
}

/// A configuration document with a `schema` discriminator.
pub trait SchemaDocument {
    /// Which document this is.
    const KIND: DocumentKind;

    /// The `schema` value found in the decoded document.
    fn schema(&self) -> &str;
}

/// Treat an explicit `null` (e.g. a YAML key with no value) like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Catalog configuration
// ---------------------------------------------------------------------------

/// Root of the catalog configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub catalogs: Vec<Catalog>,
}

impl SchemaDocument for CatalogConfig {
    const KIND: DocumentKind = DocumentKind::Catalog;

    fn schema(&self) -> &str {
        &self.schema
    }
}

/// A named catalog and the builder schemas it supports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub destination: CatalogDestination,
    #[serde(default, deserialize_with = "null_as_default")]
    pub builders: Vec<String>,
}

/// Where a catalog's content is assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDestination {
    #[serde(default, deserialize_with = "null_as_default")]
    pub working_dir: String,
}

// ---------------------------------------------------------------------------
// Composite configuration
// ---------------------------------------------------------------------------

/// Root of the composite (contribution) configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub components: Vec<Component>,
}

impl SchemaDocument for CompositeConfig {
    const KIND: DocumentKind = DocumentKind::Composite;

    fn schema(&self) -> &str {
        &self.schema
    }
}

/// A contribution to one catalog, rendered by one builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Name of the catalog this component contributes to.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub destination: ComponentDestination,
    #[serde(default, deserialize_with = "null_as_default")]
    pub strategy: BuildStrategy,
}

/// Where a component's builder writes its output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDestination {
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
}

/// How a component is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStrategy {
    /// Informational strategy name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub template: TemplateDefinition,
}

/// Builder selection plus the builder-specific configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    /// Builder schema, e.g. `olm.builder.basic`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema: String,
    /// Opaque, builder-specific settings.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

// ---------------------------------------------------------------------------
// OutputType
// ---------------------------------------------------------------------------

/// Serialization format builders write catalog content in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Json,
    Yaml,
}

impl OutputType {
    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputType {
    type Err = CompositeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(CompositeError::config(format!(
                "invalid output type {other:?}, must be one of: json, yaml"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_config_uses_camel_case_working_dir() {
        let json = r#"{
            "schema": "olm.composite.catalogs",
            "catalogs": [
                {"name": "stable", "destination": {"workingDir": "/tmp/x"}, "builders": ["olm.builder.basic"]}
            ]
        }"#;
        let parsed: CatalogConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.catalogs[0].destination.working_dir, "/tmp/x");
        assert_eq!(parsed.catalogs[0].builders, vec![BASIC_BUILDER_SCHEMA]);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let parsed: CatalogConfig =
            serde_json::from_str(r#"{"catalogs": [{"name": "stable"}]}"#).expect("deserialize");
        assert!(parsed.schema.is_empty());
        assert!(parsed.catalogs[0].destination.working_dir.is_empty());
        assert!(parsed.catalogs[0].builders.is_empty());
    }

    #[test]
    fn null_fields_default_to_empty() {
        let parsed: CompositeConfig = serde_json::from_str(
            r#"{"schema": null, "components": [
                {"name": "stable", "destination": null, "strategy": {"name": null, "template": null}}
            ]}"#,
        )
        .expect("deserialize");
        assert!(parsed.schema.is_empty());
        assert!(parsed.components[0].destination.path.is_empty());
        assert!(parsed.components[0].strategy.template.schema.is_empty());

        let parsed: CatalogConfig =
            serde_json::from_str(r#"{"catalogs": null}"#).expect("deserialize");
        assert!(parsed.catalogs.is_empty());
    }

    #[test]
    fn component_template_keeps_opaque_config() {
        let json = r#"{
            "name": "stable",
            "destination": {"path": "stable/pkg"},
            "strategy": {
                "name": "basic",
                "template": {"schema": "olm.builder.basic", "config": {"input": "pkg.yaml"}}
            }
        }"#;
        let component: Component = serde_json::from_str(json).expect("deserialize");
        assert_eq!(component.strategy.template.schema, BASIC_BUILDER_SCHEMA);
        assert_eq!(component.strategy.template.config["input"], "pkg.yaml");
        assert_eq!(component.destination.path, "stable/pkg");
    }

    #[test]
    fn output_type_parse() {
        assert_eq!("yaml".parse::<OutputType>().unwrap(), OutputType::Yaml);
        assert_eq!(OutputType::default(), OutputType::Json);
        assert!("toml".parse::<OutputType>().is_err());
    }

    #[test]
    fn document_kind_expected_schema() {
        assert_eq!(DocumentKind::Catalog.expected_schema(), CATALOG_SCHEMA);
        assert_eq!(CompositeConfig::KIND.expected_schema(), COMPOSITE_SCHEMA);
    }
}
