//! `olm.builder.semver`: renders an `olm.semver` template.
//!
//! Bundles are listed per stability archetype (candidate, fast, stable).
//! Each bundle image is rendered through the image registry; channels are
//! generated from the bundles' versions, with every entry replacing the
//! previous one in version order.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use compositor_shared::{CompositeError, Result, TemplateDefinition};
use semver::Version;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::declcfg::{self, CHANNEL_SCHEMA, PACKAGE_SCHEMA};
use crate::{
    BuildContext, Builder, BuilderConfig, ImageRegistry, parse_template_config,
    validate_destination,
};

/// Schema the input template must declare.
pub const SEMVER_TEMPLATE_SCHEMA: &str = "olm.semver";

const NAME: &str = "olm.builder.semver";

#[derive(Debug, Deserialize)]
struct SemverConfig {
    input: String,
    #[serde(default)]
    output: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SemverTemplate {
    #[serde(default)]
    generate_major_channels: Option<bool>,
    #[serde(default)]
    generate_minor_channels: Option<bool>,
    #[serde(default)]
    candidate: ArchetypeBundles,
    #[serde(default)]
    fast: ArchetypeBundles,
    #[serde(default)]
    stable: ArchetypeBundles,
}

#[derive(Debug, Default, Deserialize)]
struct ArchetypeBundles {
    #[serde(default)]
    bundles: Vec<BundleRef>,
}

#[derive(Debug, Deserialize)]
struct BundleRef {
    image: String,
}

/// A rendered bundle with the fields channel generation needs.
#[derive(Debug, Clone)]
struct ResolvedBundle {
    name: String,
    package: String,
    version: Version,
    object: Value,
}

/// Builder for semver templates.
#[derive(Debug, Clone)]
pub struct SemverBuilder {
    config: BuilderConfig,
}

impl SemverBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Builder for SemverBuilder {
    #[instrument(skip_all, fields(builder = NAME, destination = %destination.display()))]
    async fn build(
        &self,
        ctx: &BuildContext,
        registry: Option<&dyn ImageRegistry>,
        destination: &Path,
        template: &TemplateDefinition,
    ) -> Result<()> {
        ctx.check()?;
        let settings: SemverConfig = parse_template_config(NAME, template)?;

        let objects = declcfg::read_objects(Path::new(&settings.input))?;
        let doc = objects.into_iter().next().ok_or_else(|| {
            CompositeError::template(format!("{}: template is empty", settings.input))
        })?;
        let schema = declcfg::schema_of(&doc).unwrap_or_default();
        if schema != SEMVER_TEMPLATE_SCHEMA {
            return Err(CompositeError::template(format!(
                "{}: template has schema {schema:?}, expected {SEMVER_TEMPLATE_SCHEMA:?}",
                settings.input
            )));
        }
        let parsed: SemverTemplate = serde_json::from_value(doc).map_err(|e| {
            CompositeError::template(format!("{}: {e}", settings.input))
        })?;

        let rendered = render(ctx, registry, &parsed).await?;

        let dir = self.config.output_dir(destination);
        let stem = settings.output.as_deref().unwrap_or("catalog");
        let path = declcfg::write_objects(&dir, stem, self.config.output_type, &rendered)?;
        info!(path = %path.display(), objects = rendered.len(), "semver template rendered");
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

/// Channel naming mode derived from the template flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelNaming {
    Plain,
    Major,
    Minor,
}

impl ChannelNaming {
    fn from_template(template: &SemverTemplate) -> Self {
        let minor = template.generate_minor_channels.unwrap_or(false);
        let major = template.generate_major_channels.unwrap_or(!minor);
        match (major, minor) {
            (_, true) => Self::Minor,
            (true, false) => Self::Major,
            (false, false) => Self::Plain,
        }
    }

    fn channel_name(self, archetype: &str, version: &Version) -> String {
        match self {
            Self::Plain => archetype.to_string(),
            Self::Major => format!("{archetype}-v{}", version.major),
            Self::Minor => format!("{archetype}-v{}.{}", version.major, version.minor),
        }
    }
}

async fn render(
    ctx: &BuildContext,
    registry: Option<&dyn ImageRegistry>,
    template: &SemverTemplate,
) -> Result<Vec<Value>> {
    let naming = ChannelNaming::from_template(template);
    // Ordered from least to most stable; the default channel comes from the last one present.
    let archetypes = [
        ("candidate", &template.candidate),
        ("fast", &template.fast),
        ("stable", &template.stable),
    ];

    let mut bundles: BTreeMap<String, ResolvedBundle> = BTreeMap::new();
    let mut channels: BTreeMap<String, Vec<ResolvedBundle>> = BTreeMap::new();
    let mut default_channel: Option<(String, Version)> = None;

    for (archetype, refs) in archetypes {
        let mut best: Option<(String, Version)> = None;
        for bundle_ref in &refs.bundles {
            ctx.check()?;
            let bundle = resolve_bundle(ctx, registry, &bundle_ref.image).await?;
            let channel = naming.channel_name(archetype, &bundle.version);
            if best.as_ref().is_none_or(|(_, v)| bundle.version > *v) {
                best = Some((channel.clone(), bundle.version.clone()));
            }
            channels.entry(channel).or_default().push(bundle.clone());
            bundles.entry(bundle.name.clone()).or_insert(bundle);
        }
        if best.is_some() {
            default_channel = best;
        }
    }

    let Some((default_channel, _)) = default_channel else {
        return Err(CompositeError::template("semver template lists no bundles"));
    };

    let mut packages = bundles.values().map(|b| b.package.as_str());
    let package = packages.next().unwrap_or_default().to_string();
    if let Some(other) = packages.find(|p| *p != package) {
        return Err(CompositeError::template(format!(
            "semver template mixes packages {package:?} and {other:?}"
        )));
    }

    let mut objects = vec![json!({
        "schema": PACKAGE_SCHEMA,
        "name": package,
        "defaultChannel": default_channel,
    })];

    for (name, mut members) in channels {
        members.sort_by(|a, b| a.version.cmp(&b.version));
        members.dedup_by(|a, b| a.name == b.name);
        let mut entries = Vec::with_capacity(members.len());
        let mut previous: Option<&str> = None;
        for member in &members {
            let mut entry = json!({"name": member.name});
            if let Some(prev) = previous {
                entry["replaces"] = json!(prev);
            }
            entries.push(entry);
            previous = Some(member.name.as_str());
        }
        debug!(channel = %name, entries = entries.len(), "generated channel");
        objects.push(json!({
            "schema": CHANNEL_SCHEMA,
            "name": name,
            "package": package,
            "entries": entries,
        }));
    }

    objects.extend(bundles.into_values().map(|b| b.object));
    Ok(objects)
}

async fn resolve_bundle(
    ctx: &BuildContext,
    registry: Option<&dyn ImageRegistry>,
    image: &str,
) -> Result<ResolvedBundle> {
    let registry = registry.ok_or_else(|| {
        CompositeError::template(format!(
            "bundle image {image:?} cannot be rendered without an image registry"
        ))
    })?;
    let object = registry.render_bundle(ctx, image).await?;

    let field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
    let name = field("name")
        .ok_or_else(|| CompositeError::template(format!("bundle {image:?} has no name")))?;
    let package = field("package")
        .ok_or_else(|| CompositeError::template(format!("bundle {image:?} has no package")))?;

    let raw_version = object
        .get("properties")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|p| p.get("type").and_then(Value::as_str) == Some(PACKAGE_SCHEMA))
        .and_then(|p| p.pointer("/value/version"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CompositeError::template(format!("bundle {image:?} has no olm.package version"))
        })?;
    let version = Version::parse(raw_version).map_err(|e| {
        CompositeError::template(format!("bundle {image:?} version {raw_version:?}: {e}"))
    })?;

    Ok(ResolvedBundle {
        name,
        package,
        version,
        object,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use compositor_shared::OutputType;

    /// Derives bundle metadata from images tagged `<repo>:v<version>`.
    struct TaggedRegistry;

    #[async_trait]
    impl ImageRegistry for TaggedRegistry {
        async fn render_bundle(&self, _ctx: &BuildContext, image: &str) -> Result<Value> {
            let version = image.rsplit_once(":v").map(|(_, v)| v).unwrap_or("0.0.0");
            Ok(json!({
                "schema": "olm.bundle",
                "name": format!("foo.v{version}"),
                "package": "foo",
                "image": image,
                "properties": [
                    {"type": "olm.package", "value": {"packageName": "foo", "version": version}}
                ],
            }))
        }
    }

    fn write_template(dir: &Path, body: &str) -> TemplateDefinition {
        let input = dir.join("semver.yaml");
        std::fs::write(&input, body).unwrap();
        TemplateDefinition {
            schema: NAME.into(),
            config: json!({"input": input.to_str().unwrap(), "output": "foo"}),
        }
    }

    #[test]
    fn channel_naming_defaults_to_major() {
        let template = SemverTemplate::default();
        assert_eq!(ChannelNaming::from_template(&template), ChannelNaming::Major);

        let template = SemverTemplate {
            generate_minor_channels: Some(true),
            ..Default::default()
        };
        let naming = ChannelNaming::from_template(&template);
        assert_eq!(
            naming.channel_name("stable", &Version::new(1, 2, 3)),
            "stable-v1.2"
        );
    }

    #[tokio::test]
    async fn generates_replaces_chain_in_version_order() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(
            dir.path(),
            "\
schema: olm.semver
generateMajorChannels: true
candidate:
  bundles:
    - image: quay.io/example/foo-bundle:v1.1.0
    - image: quay.io/example/foo-bundle:v1.0.0
stable:
  bundles:
    - image: quay.io/example/foo-bundle:v1.0.0
",
        );

        let builder = SemverBuilder::new(BuilderConfig {
            working_dir: dir.path().to_path_buf(),
            output_type: OutputType::Yaml,
        });
        let ctx = BuildContext::new();
        builder
            .build(&ctx, Some(&TaggedRegistry), Path::new("out"), &template)
            .await
            .unwrap();

        let objects = declcfg::read_objects(&dir.path().join("out/foo.yaml")).unwrap();
        assert_eq!(objects[0]["schema"], "olm.package");
        assert_eq!(objects[0]["defaultChannel"], "stable-v1");

        let candidate = objects
            .iter()
            .find(|o| o["name"] == "candidate-v1")
            .expect("candidate channel");
        assert_eq!(candidate["entries"][0], json!({"name": "foo.v1.0.0"}));
        assert_eq!(
            candidate["entries"][1],
            json!({"name": "foo.v1.1.0", "replaces": "foo.v1.0.0"})
        );

        let bundle_count = objects.iter().filter(|o| o["schema"] == "olm.bundle").count();
        assert_eq!(bundle_count, 2);

        builder.validate(&ctx, Path::new("out")).await.unwrap();
    }

    #[tokio::test]
    async fn empty_template_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path(), "schema: olm.semver\n");
        let builder = SemverBuilder::new(BuilderConfig {
            working_dir: dir.path().to_path_buf(),
            output_type: OutputType::Json,
        });
        let err = builder
            .build(&BuildContext::new(), Some(&TaggedRegistry), Path::new("out"), &template)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("lists no bundles"));
    }
}
