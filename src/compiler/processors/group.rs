//! System group resources

use serde::Deserialize;

use super::ResourceProcessor;
use crate::compiler::action::{Action, Context};
use crate::compiler::artifact::{StateDocument, modifier};
use crate::compiler::error::{CompileResult, HttpError};
use crate::compiler::resource::Resource;

fn default_present() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct GroupProperties {
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    members: Vec<String>,
    #[serde(default = "default_present")]
    present: bool,
}

/// Compiles `group` resources into the executor's `group` state module
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupResourceProcessor;

impl ResourceProcessor for GroupResourceProcessor {
    fn resource_type(&self) -> &'static str {
        "group"
    }

    fn build(
        &self,
        _action: &mut Action,
        name: &str,
        resource: &Resource,
        context: &mut Context,
    ) -> CompileResult<StateDocument> {
        let properties: GroupProperties = resource.properties_as(name)?;

        let mut document = StateDocument::new(name, "group");
        if !properties.present {
            document.push("absent");
            return Ok(document);
        }

        document.push("present");
        if let Some(gid) = properties.gid {
            if let Some(owner) = context.gid_owner(gid).filter(|owner| *owner != name) {
                return Err(HttpError::group_already_exist(format!(
                    "gid {} is already used by group '{}'",
                    gid, owner
                ))
                .into());
            }
            context.claim_gid(gid, name);
            document.push(modifier("gid", gid));
        }
        if !properties.members.is_empty() {
            document.push(modifier("members", properties.members));
        }
        Ok(document)
    }
}
