//! Saltforge CLI - compile node manifests into state files
//!
//! Provides subcommands for compiling a manifest, listing registered resource
//! types and writing a default configuration.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use saltforge::api::ErrorResponse;
use saltforge::compiler::{Action, Context, Manifest, NodeInfo, ProcessorCatalog};
use saltforge::{CompilerConfig, Pipeline};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "saltforge")]
#[command(about = "Compile node manifests into configuration-management state files", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a manifest into a directory of state files
    Compile {
        /// Manifest file (JSON object of name -> declaration)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output directory (default: configured output root)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target node id
        #[arg(long, default_value = "local")]
        node: String,

        /// Action parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Facts file (JSON object) merged into the context
        #[arg(long)]
        facts: Option<PathBuf>,

        /// Also write the top file
        #[arg(long)]
        top: bool,
    },

    /// List registered resource types
    Types,

    /// Write the default configuration
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CompilerConfig::load(path)?,
        None => CompilerConfig::default(),
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile {
            manifest,
            output,
            node,
            params,
            facts,
            top,
        } => {
            let text = std::fs::read_to_string(&manifest)
                .with_context(|| format!("Failed to read manifest: {:?}", manifest))?;
            let manifest = match Manifest::from_json_str(&text) {
                Ok(manifest) => manifest,
                Err(err) => return Ok(report_failure(ErrorResponse::from(err))),
            };

            let directory = output.unwrap_or_else(|| config.output_root.clone());
            std::fs::create_dir_all(&directory)
                .with_context(|| format!("Failed to create directory: {:?}", directory))?;

            let mut action = Action::new("configuration/generate");
            for (key, value) in params {
                action.data.insert(key, Value::String(value));
            }

            let mut context = Context::new(NodeInfo {
                id: node,
                ..NodeInfo::default()
            });
            if let Some(facts) = facts {
                let data = std::fs::read(&facts)
                    .with_context(|| format!("Failed to read facts: {:?}", facts))?;
                let facts: Value =
                    serde_json::from_slice(&data).context("Failed to parse facts")?;
                context.merge_facts(&facts, true);
            }

            let config = CompilerConfig {
                write_top_file: config.write_top_file || top,
                ..config
            };
            let pipeline = Pipeline::new(config);

            match pipeline.compile_report(&manifest, &mut action, &mut context, &directory) {
                Ok(report) => {
                    for artifact in &report.artifacts {
                        println!("{}  {}", artifact.digest, artifact.path.display());
                    }
                    if let Some(top_file) = &report.top_file {
                        println!("top  {}", top_file.display());
                    }
                }
                Err(err) => return Ok(report_failure(ErrorResponse::from(err))),
            }
        }

        Commands::Types => {
            for resource_type in ProcessorCatalog::global().snapshot().list_types() {
                println!("{}", resource_type);
            }
        }

        Commands::InitConfig { path } => {
            CompilerConfig::default().save(&path)?;
            println!("Wrote default configuration to {:?}", path);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn report_failure(response: ErrorResponse) -> ExitCode {
    eprintln!("{}", response.to_json());
    ExitCode::FAILURE
}
