//! Templated file resources

use serde::Deserialize;
use serde_json::{Map, Value};

use super::ResourceProcessor;
use super::file::{Ownership, claim_managed_path};
use crate::compiler::action::{Action, Context};
use crate::compiler::artifact::{StateDocument, modifier};
use crate::compiler::error::CompileResult;
use crate::compiler::resource::Resource;

fn default_engine() -> String {
    "jinja".to_string()
}

#[derive(Debug, Deserialize)]
struct TemplateProperties {
    path: String,
    source: String,
    #[serde(default = "default_engine")]
    engine: String,
    #[serde(default)]
    defaults: Map<String, Value>,
    #[serde(flatten)]
    ownership: Ownership,
}

/// Compiles `template` resources into rendered `file.managed` states
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateResourceProcessor;

impl ResourceProcessor for TemplateResourceProcessor {
    fn resource_type(&self) -> &'static str {
        "template"
    }

    fn build(
        &self,
        _action: &mut Action,
        name: &str,
        resource: &Resource,
        context: &mut Context,
    ) -> CompileResult<StateDocument> {
        let properties: TemplateProperties = resource.properties_as(name)?;
        claim_managed_path(context, name, &properties.path, Some(properties.source.as_str()))?;

        let mut document = StateDocument::new(name, "file");
        document.push("managed");
        document.push(modifier("name", properties.path.as_str()));
        document.push(modifier("source", properties.source.as_str()));
        document.push(modifier("template", properties.engine.as_str()));
        properties.ownership.push_into(&mut document);
        if !properties.defaults.is_empty() {
            document.push(modifier("defaults", Value::Object(properties.defaults)));
        }
        Ok(document)
    }
}
