//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use compositor_builders::BuildContext;
use compositor_core::{ProgressReporter, RenderSummary, Template};
use compositor_fetch::{FetchOptions, ReqwestGetter, fetch_config};
use compositor_shared::{AppConfig, OutputType, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Compositor: build catalogs from a composite template.
#[derive(Parser)]
#[command(
    name = "compositor",
    version,
    about = "Render composite catalog templates by dispatching each component to its builder.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Catalog output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Json,
    Yaml,
}

impl From<OutputFormat> for OutputType {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => OutputType::Json,
            OutputFormat::Yaml => OutputType::Yaml,
        }
    }
}

/// Where to read the two configuration documents from.
#[derive(clap::Args)]
pub(crate) struct DocumentArgs {
    /// Catalog configuration file path or URL.
    #[arg(short = 'f', long)]
    pub catalog_config: Option<String>,

    /// Composite configuration file path or URL.
    #[arg(short = 'c', long)]
    pub composite_config: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build every component of the composite template.
    ///
    /// No image registry is attached: semver templates, and basic templates
    /// with image-only bundle entries, fail with "cannot be rendered without
    /// an image registry".
    Render {
        #[command(flatten)]
        documents: DocumentArgs,

        /// Output format for generated catalogs.
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Validate each component after building it.
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        validate: Option<bool>,
    },

    /// Resolve every component's builder without building anything.
    Check {
        #[command(flatten)]
        documents: DocumentArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "compositor=info",
        1 => "compositor=debug",
        _ => "compositor=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Render {
            documents,
            output,
            validate,
        } => cmd_render(&documents, output, validate).await,
        Command::Check { documents } => cmd_check(&documents).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Fetch both documents, falling back to configured defaults.
async fn load_template(config: &AppConfig, documents: &DocumentArgs) -> Result<Template> {
    let catalog_path = documents
        .catalog_config
        .as_deref()
        .unwrap_or(&config.defaults.catalog_config);
    let composite_path = documents
        .composite_config
        .as_deref()
        .unwrap_or(&config.defaults.composite_config);

    let getter = ReqwestGetter::new(&FetchOptions::from(config))?;
    let catalog_file = fetch_config(catalog_path, &getter).await?;
    let contribution_file = fetch_config(composite_path, &getter).await?;

    info!(
        catalog_config = catalog_path,
        composite_config = composite_path,
        "configuration documents loaded"
    );

    Ok(Template::new()
        .with_catalog_file(catalog_file)
        .with_contribution_file(contribution_file))
}

async fn cmd_render(
    documents: &DocumentArgs,
    output: Option<OutputFormat>,
    validate: Option<bool>,
) -> Result<()> {
    let config = load_config()?;
    let output_type = output.map(OutputType::from).unwrap_or(config.defaults.output);
    let validate = validate.unwrap_or(config.defaults.validate);

    let reporter = Arc::new(CliProgress::new());
    let mut template = load_template(&config, documents)
        .await?
        .with_output_type(output_type)
        .with_progress(reporter.clone());

    let ctx = BuildContext::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling render");
            interrupt.cancel();
        }
    });

    let summary = match template.render(&ctx, validate).await {
        Ok(summary) => summary,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    println!();
    println!("  Composite template rendered.");
    println!("  Components: {}", summary.components);
    println!("  Output:     {output_type}");
    println!(
        "  Validated:  {}",
        if summary.validated { "yes" } else { "no" }
    );
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_check(documents: &DocumentArgs) -> Result<()> {
    let config = load_config()?;
    let mut template = load_template(&config, documents)
        .await?
        .with_output_type(config.defaults.output);

    let plan = template.check()?;
    if plan.is_empty() {
        return Err(eyre!("composite configuration declares no components"));
    }

    println!();
    for entry in &plan {
        println!(
            "  {:<20} {:<24} -> {}",
            entry.component, entry.schema, entry.destination
        );
    }
    println!();
    println!("  {} component(s) resolved.", plan.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn component_built(&self, component: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Built [{current}/{total}] {component}"));
    }

    fn component_validated(&self, component: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Validated [{current}/{total}] {component}"));
    }

    fn done(&self, _summary: &RenderSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_help_mentions_missing_image_registry() {
        let mut cmd = Cli::command();
        let render = cmd
            .find_subcommand_mut("render")
            .expect("render subcommand");
        let help = render.render_long_help().to_string();
        assert!(help.contains("No image registry is attached"));
    }

    #[test]
    fn render_flags_parse() {
        let cli = Cli::parse_from([
            "compositor",
            "render",
            "-f",
            "catalogs.yaml",
            "-o",
            "yaml",
            "--validate",
            "false",
        ]);
        match cli.command {
            Command::Render {
                documents,
                output,
                validate,
            } => {
                assert_eq!(documents.catalog_config.as_deref(), Some("catalogs.yaml"));
                assert!(documents.composite_config.is_none());
                assert!(matches!(output, Some(OutputFormat::Yaml)));
                assert_eq!(validate, Some(false));
            }
            _ => panic!("expected render"),
        }
    }
}
