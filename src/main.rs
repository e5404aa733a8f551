// cvsurface command line interface
// Generate renamed binding surfaces from native structure/constant descriptions

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cvsurface::pipeline::{self, Destination};
use cvsurface::{
    resolve, CaseStyle, EmitOptions, EmitTarget, Emitter, NamingRule, SourceFormat, SurfaceConfig,
};

#[derive(Parser)]
#[command(name = "cvsurface")]
#[command(about = "Binding-surface generator for opaque native structures and enumeration constants", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log resolution details (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every surface profile of a configuration file
    Generate {
        /// Configuration file
        #[arg(long, short)]
        config: PathBuf,

        /// Native description; overrides `catalog.path`
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Only generate this profile
        #[arg(long)]
        profile: Option<String>,
    },

    /// Emit one surface to standard output
    Emit {
        /// Native description (.h or .json)
        catalog: PathBuf,

        /// Output syntax
        #[arg(long, default_value = "c")]
        target: EmitTarget,

        /// Allow emitting a surface with no entries
        #[arg(long)]
        allow_empty: bool,

        #[command(flatten)]
        naming: NamingArgs,
    },

    /// Load and resolve a description without emitting anything
    Check {
        /// Native description (.h or .json)
        catalog: PathBuf,

        #[command(flatten)]
        naming: NamingArgs,
    },
}

#[derive(Args)]
struct NamingArgs {
    /// Prefix removed from native names that start with it
    #[arg(long, default_value = "")]
    prefix_strip: String,

    /// Prefix prepended to every target identifier
    #[arg(long, default_value = "")]
    prefix_add: String,

    /// Case of the native stem (preserve, upper, lower)
    #[arg(long = "case", default_value = "preserve")]
    case_style: CaseStyle,

    /// Description format (header, json); inferred from the extension by default
    #[arg(long, value_parser = parse_format)]
    format: Option<SourceFormat>,
}

impl NamingArgs {
    fn rule(&self) -> NamingRule {
        NamingRule::new()
            .with_prefix_strip(self.prefix_strip.as_str())
            .with_prefix_add(self.prefix_add.as_str())
            .with_case_style(self.case_style)
    }
}

fn parse_format(s: &str) -> Result<SourceFormat, String> {
    match s {
        "header" => Ok(SourceFormat::Header),
        "json" => Ok(SourceFormat::Json),
        other => Err(format!("unknown format `{other}` (expected header or json)")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate { config, catalog, profile } => {
            run_generate(&config, catalog.as_deref(), profile.as_deref())
        }
        Commands::Emit { catalog, target, allow_empty, naming } => {
            let loaded = pipeline::load_catalog(&catalog, naming.format)
                .with_context(|| format!("loading {}", catalog.display()))?;
            let surface = resolve(&loaded, &naming.rule())?;
            if surface.is_empty() && allow_empty {
                tracing::warn!(catalog = %catalog.display(), "emitting an empty surface");
            }
            let text = Emitter::new(EmitOptions::new(target).allow_empty(allow_empty)).emit(&surface)?;
            std::io::stdout().write_all(text.as_bytes())?;
            Ok(())
        }
        Commands::Check { catalog, naming } => {
            let loaded = pipeline::load_catalog(&catalog, naming.format)
                .with_context(|| format!("loading {}", catalog.display()))?;
            let surface = resolve(&loaded, &naming.rule())?;
            println!("{} types, {} constants", surface.type_count(), surface.constant_count());
            Ok(())
        }
    }
}

fn run_generate(config_path: &Path, catalog: Option<&Path>, profile: Option<&str>) -> anyhow::Result<()> {
    let config = SurfaceConfig::from_path(config_path)?;
    let catalog_path = match catalog {
        Some(path) => path.to_path_buf(),
        None => config
            .catalog_path()
            .context("no catalog given: set `catalog.path` or pass --catalog")?,
    };
    let catalog = pipeline::load_catalog(&catalog_path, config.catalog.format)
        .with_context(|| format!("loading {}", catalog_path.display()))?;

    let profiles = match profile {
        Some(name) => vec![config.profile(name)?.clone()],
        None => config.surfaces.clone(),
    };

    // Nothing is written unless every profile succeeded.
    let generated = pipeline::generate_all(&catalog, &profiles)?;
    let destinations = pipeline::destinations(&config, &generated)?;

    let mut stdout = std::io::stdout().lock();
    for (surface, destination) in generated.iter().zip(destinations) {
        match destination {
            Destination::File(path) => pipeline::write_surface(&path, surface)?,
            Destination::Stdout => stdout.write_all(surface.text.as_bytes())?,
        }
        eprintln!(
            "{}: {} types, {} constants",
            surface.profile, surface.types, surface.constants
        );
    }
    Ok(())
}
