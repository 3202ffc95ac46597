//! Service resources
//!
//! A service resource describes a managed service on the target node:
//!
//! ```json
//! "nginx": {
//!     "type": "service",
//!     "enable": true,
//!     "reload": true,
//!     "watch": { "packages": ["nginx-pkg"] }
//! }
//! ```
//!
//! The name is also the name of the init script managing the service.

use serde::Deserialize;
use serde_json::Value;

use super::ResourceProcessor;
use crate::compiler::action::{Action, Context};
use crate::compiler::artifact::{StateDocument, modifier};
use crate::compiler::error::CompileResult;
use crate::compiler::resource::Resource;

/// Lifecycle directive asserting the service is running
pub const RUNNING: &str = "running";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceProperties {
    enable: bool,
    reload: bool,
    watch: Option<WatchProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WatchProperties {
    packages: Option<Vec<String>>,
}

/// Compiles `service` resources into the executor's `service` state module
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceResourceProcessor;

impl ResourceProcessor for ServiceResourceProcessor {
    fn resource_type(&self) -> &'static str {
        "service"
    }

    fn build(
        &self,
        _action: &mut Action,
        name: &str,
        resource: &Resource,
        _context: &mut Context,
    ) -> CompileResult<StateDocument> {
        let properties: ServiceProperties = resource.properties_as(name)?;

        let mut document = StateDocument::new(name, "service");
        document.push(RUNNING);
        document.push(modifier("enable", properties.enable));
        document.push(modifier("reload", properties.reload));

        let packages = properties
            .watch
            .and_then(|watch| watch.packages)
            .unwrap_or_default();
        if !packages.is_empty() {
            let watch: Vec<Value> = packages
                .into_iter()
                .map(|package| modifier("pkg", package))
                .collect();
            document.push(modifier("watch", watch));
        }

        Ok(document)
    }
}
