//! Package resources

use serde::Deserialize;

use super::{ResourceProcessor, push_optional};
use crate::compiler::action::{Action, Context};
use crate::compiler::artifact::{StateDocument, modifier};
use crate::compiler::error::{CompileResult, HttpError};
use crate::compiler::resource::Resource;

/// Desired package state
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Any version installed
    #[default]
    Installed,
    /// Newest available version installed
    Latest,
    /// Not installed
    Removed,
}

impl Ensure {
    fn directive(self) -> &'static str {
        match self {
            Ensure::Installed => "installed",
            Ensure::Latest => "latest",
            Ensure::Removed => "removed",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackageProperties {
    package: Option<String>,
    version: Option<String>,
    ensure: Ensure,
}

/// Compiles `package` resources into the executor's `pkg` state module
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageResourceProcessor;

impl ResourceProcessor for PackageResourceProcessor {
    fn resource_type(&self) -> &'static str {
        "package"
    }

    fn build(
        &self,
        _action: &mut Action,
        name: &str,
        resource: &Resource,
        context: &mut Context,
    ) -> CompileResult<StateDocument> {
        let properties: PackageProperties = resource.properties_as(name)?;
        let package = properties.package.as_deref().unwrap_or(name);

        if properties.ensure != Ensure::Removed && !context.package_known(package) {
            return Err(HttpError::package_not_found(format!(
                "package '{}' required by resource '{}' is not available",
                package, name
            ))
            .into());
        }

        let mut document = StateDocument::new(name, "pkg");
        document.push(properties.ensure.directive());
        document.push(modifier("name", package));
        push_optional(&mut document, "version", properties.version.as_deref());
        Ok(document)
    }
}
