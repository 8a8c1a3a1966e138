//! wtypes CLI
//!
//! Checks schemas against the Draft 7 meta-schema and validates instances.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wtypes::{HookManager, JsonSchemaBackend, StringFormat, Trait, WtypesConfig};

#[derive(Parser)]
#[command(name = "wtypes")]
#[command(about = "Check JSON schemas and validate JSON data against them")]
struct Cli {
    /// Explicit config file, layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an instance document against a schema
    Validate {
        /// Schema file (JSON)
        #[arg(short, long)]
        schema: PathBuf,
        /// Instance file (JSON)
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Check a schema against the Draft 7 meta-schema
    CheckSchema {
        /// Schema file (JSON)
        schema: PathBuf,
    },

    /// List the supported string formats
    Formats,

    /// Show the effective configuration
    Config {
        /// Write the default configuration to this path instead
        #[arg(long)]
        init: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match WtypesConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli.command, config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn schema_name(path: &Path, schema: &Value) -> String {
    schema
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "schema".to_string())
}

fn hooks(config: &WtypesConfig) -> HookManager {
    let manager = HookManager::new();
    manager.register(Arc::new(JsonSchemaBackend::new(config.validation.clone())));
    manager
}

/// Returns whether the checked document was valid
fn run(command: Commands, config: WtypesConfig) -> Result<bool> {
    match command {
        Commands::Validate { schema, instance } => {
            let hooks = hooks(&config);
            let raw = read_json(&schema)?;
            let kind = Trait::create_with(&hooks, schema_name(&schema, &raw), raw)?;
            let data = read_json(&instance)?;
            debug!(schema = %schema.display(), instance = %instance.display(), "validating");

            match kind.validate_with(&hooks, &data) {
                Ok(()) => {
                    println!("✅ {} is a valid {}", instance.display(), kind.title());
                    Ok(true)
                }
                Err(e) if e.is_validation() => {
                    println!("❌ {}", e);
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        }

        Commands::CheckSchema { schema } => {
            let hooks = hooks(&config);
            let raw = read_json(&schema)?;
            match hooks.validate_type(&raw) {
                Ok(()) => {
                    println!("✅ {} is a valid Draft 7 schema", schema.display());
                    Ok(true)
                }
                Err(e) => {
                    println!("❌ {}", e);
                    Ok(false)
                }
            }
        }

        Commands::Formats => {
            for format in StringFormat::ALL {
                println!("{:<24} {}", format.as_str(), format.type_name());
            }
            Ok(true)
        }

        Commands::Config { init } => {
            if let Some(path) = init {
                if Path::new(&path).exists() {
                    bail!("{} already exists", path);
                }
                WtypesConfig::default()
                    .save(&path)
                    .with_context(|| format!("writing {}", path))?;
                println!("✅ Wrote default configuration to {}", path);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(true)
        }
    }
}
