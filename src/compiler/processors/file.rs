//! Managed file resources
//!
//! Also hosts the path/ownership rules shared with template resources.

use serde::Deserialize;

use super::{ResourceProcessor, push_optional};
use crate::compiler::action::{Action, Context};
use crate::compiler::artifact::{StateDocument, modifier};
use crate::compiler::error::{CompileResult, HttpError};
use crate::compiler::resource::Resource;

#[derive(Debug, Deserialize)]
struct FileProperties {
    path: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    contents: Option<String>,
    #[serde(flatten)]
    ownership: Ownership,
    #[serde(default)]
    makedirs: bool,
}

/// Owner, group and mode of a managed file
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Ownership {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

impl Ownership {
    pub(crate) fn push_into(&self, document: &mut StateDocument) {
        push_optional(document, "user", self.user.as_deref());
        push_optional(document, "group", self.group.as_deref());
        push_optional(document, "mode", self.mode.as_deref());
    }
}

/// Check and record that resource `name` manages `path` sourced from `source`.
pub(crate) fn claim_managed_path(
    context: &mut Context,
    name: &str,
    path: &str,
    source: Option<&str>,
) -> CompileResult<()> {
    if !path.starts_with('/') {
        return Err(HttpError::invalid_argument(format!(
            "resource '{}' must manage an absolute path, got '{}'",
            name, path
        ))
        .into());
    }

    if let Some(owner) = context.path_owner(path).filter(|owner| *owner != name) {
        return Err(HttpError::file_already_exist(format!(
            "file '{}' is already managed by resource '{}'",
            path, owner
        ))
        .into());
    }

    if let Some(source) = source.filter(|source| !context.file_known(source)) {
        return Err(HttpError::file_not_found(format!(
            "source '{}' of resource '{}' does not exist",
            source, name
        ))
        .into());
    }

    context.claim_path(path, name);
    Ok(())
}

/// Compiles `file` resources into the executor's `file.managed` state
#[derive(Debug, Default, Clone, Copy)]
pub struct FileResourceProcessor;

impl ResourceProcessor for FileResourceProcessor {
    fn resource_type(&self) -> &'static str {
        "file"
    }

    fn build(
        &self,
        _action: &mut Action,
        name: &str,
        resource: &Resource,
        context: &mut Context,
    ) -> CompileResult<StateDocument> {
        let properties: FileProperties = resource.properties_as(name)?;

        let content = match (&properties.source, &properties.contents) {
            (Some(source), None) => modifier("source", source.as_str()),
            (None, Some(contents)) => modifier("contents", contents.as_str()),
            _ => {
                return Err(HttpError::invalid_argument(format!(
                    "file resource '{}' needs exactly one of 'source' or 'contents'",
                    name
                ))
                .into());
            }
        };

        claim_managed_path(context, name, &properties.path, properties.source.as_deref())?;

        let mut document = StateDocument::new(name, "file");
        document.push("managed");
        document.push(modifier("name", properties.path.as_str()));
        document.push(content);
        properties.ownership.push_into(&mut document);
        document.push(modifier("makedirs", properties.makedirs));
        Ok(document)
    }
}
