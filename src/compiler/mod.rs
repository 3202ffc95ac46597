//! Manifest compilation pipeline
//!
//! The [`Pipeline`] drives one manifest through the processor registry in
//! declaration order, writing one artifact per resource. The first failure
//! aborts the run; artifacts already written stay on disk.

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub mod action;
pub mod artifact;
pub mod error;
pub mod merge;
pub mod processors;
pub mod registry;
pub mod resource;
pub mod step_log;

pub use action::{Action, ActionScope, Context, NodeInfo};
pub use artifact::{ArtifactWriter, StateDocument};
pub use error::{CompileError, CompileResult, ErrorKind, Family, HttpError, HttpResult};
pub use processors::ResourceProcessor;
pub use registry::{ProcessorCatalog, ProcessorHandle, ProcessorRegistry};
pub use resource::{Manifest, Resource};

/// Name of the top file, without extension
pub const TOP_FILE_NAME: &str = "top";

/// Configuration for the compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Output directory used when the caller does not pass one
    pub output_root: PathBuf,

    /// Artifact file extension
    pub extension: String,

    /// Pretty-print indent width
    pub indent: usize,

    /// Write artifacts via temp file and rename
    pub atomic_writes: bool,

    /// Emit a top file listing every compiled resource
    pub write_top_file: bool,

    /// Top file environment key
    pub environment: String,

    /// Top file target pattern
    pub target: String,

    /// Default log level for binaries
    pub log_level: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("states"),
            extension: artifact::DEFAULT_EXTENSION.to_string(),
            indent: artifact::DEFAULT_INDENT,
            atomic_writes: true,
            write_top_file: false,
            environment: "base".to_string(),
            target: "*".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: CompilerConfig =
            serde_json::from_slice(&data).context("Failed to deserialize config")?;
        Ok(config)
    }

    /// Write configuration to a JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let writer = ArtifactWriter::new("json", 2, true);
        let data = writer
            .encode("config", self)
            .context("Failed to serialize config")?;
        writer
            .write(path, &data)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Artifact writer for these settings
    pub fn writer(&self) -> ArtifactWriter {
        ArtifactWriter::new(self.extension.clone(), self.indent, self.atomic_writes)
    }
}

/// One artifact produced by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Resource name
    pub name: String,
    /// Resource type
    pub resource_type: String,
    /// Artifact path
    pub path: PathBuf,
    /// Blake3 hex digest of the artifact bytes
    pub digest: String,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileReport {
    /// Run identifier
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Per-resource artifacts in manifest order
    pub artifacts: Vec<ArtifactRecord>,
    /// Top file, when enabled
    pub top_file: Option<PathBuf>,
}

impl CompileReport {
    /// Artifact paths in manifest order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.artifacts.iter().map(|a| a.path.clone()).collect()
    }
}

/// Drives manifests through the processor registry
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: ProcessorRegistry,
    config: CompilerConfig,
    writer: ArtifactWriter,
}

impl Pipeline {
    /// Pipeline over a snapshot of the global catalog
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_registry(ProcessorCatalog::global().snapshot(), config)
    }

    /// Pipeline over an explicit registry
    pub fn with_registry(registry: ProcessorRegistry, config: CompilerConfig) -> Self {
        let writer = config.writer();
        Self {
            registry,
            config,
            writer,
        }
    }

    /// Registry used for dispatch
    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `manifest` into `directory`, returning artifact paths in order
    pub fn compile(
        &self,
        manifest: &Manifest,
        action: &mut Action,
        context: &mut Context,
        directory: &Path,
    ) -> CompileResult<Vec<PathBuf>> {
        self.compile_report(manifest, action, context, directory)
            .map(|report| report.paths())
    }

    /// Compile `manifest` into `directory` and describe what was written.
    ///
    /// Every resource type is resolved before anything is written, so an
    /// unregistered type fails the run without touching the directory.
    pub fn compile_report(
        &self,
        manifest: &Manifest,
        action: &mut Action,
        context: &mut Context,
        directory: &Path,
    ) -> CompileResult<CompileReport> {
        tracing::info!(
            run_id = %context.run_id,
            resources = manifest.len(),
            directory = %directory.display(),
            "compiling manifest"
        );

        let plan = self.plan(manifest).inspect_err(|err| {
            tracing::error!(run_id = %context.run_id, "manifest rejected: {}", err);
        })?;

        let mut artifacts = Vec::with_capacity(plan.len());
        for (name, resource, processor) in plan {
            let written = processor
                .process(action, name, resource, context, directory, &self.writer)
                .inspect_err(|err| {
                    tracing::error!(
                        run_id = %context.run_id,
                        resource = name,
                        "aborting run: {}",
                        err
                    );
                })?;

            context.record_compiled(name, &resource.resource_type, &written.path);
            artifacts.push(ArtifactRecord {
                name: name.to_string(),
                resource_type: resource.resource_type.clone(),
                path: written.path,
                digest: written.digest,
            });
        }

        let top_file = if self.config.write_top_file {
            Some(self.write_top_file(manifest, directory)?)
        } else {
            None
        };

        tracing::info!(
            run_id = %context.run_id,
            artifacts = artifacts.len(),
            "manifest compiled"
        );

        Ok(CompileReport {
            run_id: context.run_id,
            started_at: context.started_at,
            finished_at: Utc::now(),
            artifacts,
            top_file,
        })
    }

    fn plan<'m>(
        &self,
        manifest: &'m Manifest,
    ) -> CompileResult<Vec<(&'m str, &'m Resource, &ProcessorHandle)>> {
        let mut plan = Vec::with_capacity(manifest.len());
        for (name, resource) in manifest.iter() {
            resource::validate_name(name)?;
            if self.config.write_top_file && name == TOP_FILE_NAME {
                return Err(HttpError::invalid_argument(format!(
                    "resource name '{}' is reserved for the top file",
                    TOP_FILE_NAME
                ))
                .into());
            }
            let processor = self.registry.dispatch(&resource.resource_type)?;
            plan.push((name, resource, processor));
        }
        Ok(plan)
    }

    fn write_top_file(&self, manifest: &Manifest, directory: &Path) -> CompileResult<PathBuf> {
        let names: Vec<Value> = manifest
            .names()
            .into_iter()
            .map(|name| Value::String(name.to_string()))
            .collect();

        let mut targets = Map::new();
        targets.insert(self.config.target.clone(), Value::Array(names));
        let mut top = Map::new();
        top.insert(self.config.environment.clone(), Value::Object(targets));

        let path = self.writer.path_for(directory, TOP_FILE_NAME);
        let data = self.writer.encode(TOP_FILE_NAME, &Value::Object(top))?;
        self.writer.write(&path, &data)?;
        Ok(path)
    }
}

/// Run one compilation on the blocking pool.
///
/// Independent runs may proceed concurrently as long as each uses its own
/// output directory; they share only the pipeline's read-only registry.
pub fn spawn_compile(
    pipeline: Arc<Pipeline>,
    manifest: Manifest,
    mut action: Action,
    mut context: Context,
    directory: PathBuf,
) -> JoinHandle<CompileResult<CompileReport>> {
    tokio::task::spawn_blocking(move || {
        pipeline.compile_report(&manifest, &mut action, &mut context, &directory)
    })
}
