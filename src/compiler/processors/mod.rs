//! Resource processors
//!
//! A processor turns one resource declaration into one state document. The
//! shared steps (name check, document rendering, artifact write, step logging,
//! restoring the action payload) live in [`ResourceProcessor::process`];
//! implementations only provide [`ResourceProcessor::build`].

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::action::{Action, Context};
use super::artifact::{ArtifactWriter, StateDocument, digest};
use super::error::CompileResult;
use super::resource::{Resource, validate_name};
use super::step_log::StepLogger;

pub mod file;
pub mod group;
pub mod package;
pub mod service;
pub mod template;

pub use file::FileResourceProcessor;
pub use group::GroupResourceProcessor;
pub use package::PackageResourceProcessor;
pub use service::ServiceResourceProcessor;
pub use template::TemplateResourceProcessor;

/// Key under which processors expose the resource being built in `Action::data`
pub const SCRATCH_RESOURCE_KEY: &str = "resource";

/// An artifact written by a processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    /// Path of the artifact file
    pub path: PathBuf,
    /// Blake3 hex digest of the bytes written
    pub digest: String,
}

/// Capability to compile resources of one type
pub trait ResourceProcessor: Send + Sync {
    /// Type discriminator this processor handles
    fn resource_type(&self) -> &'static str;

    /// Build the state document for `resource`.
    ///
    /// `action.data` may be used as scratch space; the caller restores it.
    fn build(
        &self,
        action: &mut Action,
        name: &str,
        resource: &Resource,
        context: &mut Context,
    ) -> CompileResult<StateDocument>;

    /// Compile `resource` into `<directory>/<name>.<extension>`.
    ///
    /// `action.data` is identical before and after the call, whatever the
    /// outcome. Write failures are returned unmodified.
    fn process(
        &self,
        action: &mut Action,
        name: &str,
        resource: &Resource,
        context: &mut Context,
        directory: &Path,
        writer: &ArtifactWriter,
    ) -> CompileResult<WrittenArtifact> {
        let mut scope = action.scope();
        let log = StepLogger::new(context.run_id, name, self.resource_type());
        let path = writer.path_for(directory, name);
        log.start(format_args!("Compiling resource into file {}", path.display()));

        let result = (|| -> CompileResult<WrittenArtifact> {
            validate_name(name)?;
            scope
                .data
                .insert(SCRATCH_RESOURCE_KEY.to_string(), Value::String(name.to_string()));

            let document = self.build(&mut scope, name, resource, context)?;
            let data = writer.render(&document)?;

            log.progress(format_args!(
                "Saving the generated content {} into file {}",
                document.to_value(),
                path.display()
            ));
            writer.write(&path, &data)?;

            Ok(WrittenArtifact {
                path: path.clone(),
                digest: digest(&data),
            })
        })();

        match &result {
            Ok(_) => log.done(),
            Err(err) => log.error(err),
        }
        result
    }
}

/// Processors for every built-in resource type
pub fn builtin() -> Vec<Arc<dyn ResourceProcessor>> {
    vec![
        Arc::new(ServiceResourceProcessor),
        Arc::new(PackageResourceProcessor),
        Arc::new(FileResourceProcessor),
        Arc::new(TemplateResourceProcessor),
        Arc::new(GroupResourceProcessor),
    ]
}

/// Append `{key: value}` when `value` is set
pub(crate) fn push_optional(document: &mut StateDocument, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        document.push(super::artifact::modifier(key, value));
    }
}
