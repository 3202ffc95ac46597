//! Run-scoped execution state handed to every resource processor
//!
//! An [`Action`] carries the parameters of whatever triggered the run (for an
//! HTTP action, its request parameters). The same action is reused for every
//! resource in a manifest, so processors only see it through an
//! [`ActionScope`], which snapshots `data` on entry and restores it on drop.
//! The [`Context`] accumulates facts and claims across one run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::merge::merge_into;

/// Mutable, job-scoped payload of the action that triggered compilation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    /// Action name, e.g. `configuration/generate`
    #[serde(default)]
    pub name: String,

    /// Request parameters
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Action {
    /// Create an action with the given name and no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Map::new(),
        }
    }

    /// Add a parameter, builder style
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Enter a scope whose changes to `data` are discarded when it ends
    pub fn scope(&mut self) -> ActionScope<'_> {
        ActionScope::new(self)
    }
}

/// Guard that restores `Action::data` to its entry snapshot when dropped.
///
/// Restoration runs on every exit path, including early returns through `?`
/// and unwinding.
pub struct ActionScope<'a> {
    action: &'a mut Action,
    snapshot: Option<Map<String, Value>>,
}

impl<'a> ActionScope<'a> {
    fn new(action: &'a mut Action) -> Self {
        let snapshot = Some(action.data.clone());
        Self { action, snapshot }
    }

    /// Parameters as they were when the scope was entered
    pub fn original(&self) -> &Map<String, Value> {
        self.snapshot.as_ref().unwrap_or(&self.action.data)
    }
}

impl Deref for ActionScope<'_> {
    type Target = Action;

    fn deref(&self) -> &Action {
        &*self.action
    }
}

impl DerefMut for ActionScope<'_> {
    fn deref_mut(&mut self) -> &mut Action {
        &mut *self.action
    }
}

impl Drop for ActionScope<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.action.data = snapshot;
        }
    }
}

/// Metadata about the node the manifest targets
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Inventory id of the node
    pub id: String,
    /// Hostname, if known
    #[serde(default)]
    pub hostname: Option<String>,
    /// Group/role tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A resource that compiled successfully earlier in the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledResource {
    /// Resource name
    pub name: String,
    /// Resource type discriminator
    pub resource_type: String,
    /// Artifact path
    pub path: PathBuf,
}

/// State shared by all resources of one compilation run
#[derive(Debug, Clone)]
pub struct Context {
    /// Identifier of this run
    pub run_id: Uuid,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Target node
    pub node: NodeInfo,

    /// Accumulated facts (JSON object)
    pub facts: Map<String, Value>,

    /// Package inventory; `None` disables package existence checks
    pub known_packages: Option<BTreeSet<String>>,

    /// File inventory (template/file sources); `None` disables the check
    pub known_files: Option<BTreeSet<String>>,

    compiled: Vec<CompiledResource>,
    claimed_paths: Vec<(String, String)>,
    claimed_gids: Vec<(u32, String)>,
}

impl Context {
    /// Create a fresh context for a run against `node`
    pub fn new(node: NodeInfo) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            node,
            facts: Map::new(),
            known_packages: None,
            known_files: None,
            compiled: Vec::new(),
            claimed_paths: Vec::new(),
            claimed_gids: Vec::new(),
        }
    }

    /// Set the package inventory, builder style
    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_packages = Some(packages.into_iter().map(Into::into).collect());
        self
    }

    /// Set the file inventory, builder style
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Deep-merge `facts` into the accumulated facts.
    ///
    /// Non-object values are ignored. With `overwrite` false, existing scalar
    /// and array facts are kept.
    pub fn merge_facts(&mut self, facts: &Value, overwrite: bool) {
        if let Value::Object(source) = facts {
            merge_into(&mut self.facts, source, overwrite);
        }
    }

    /// Whether the package inventory permits `package`
    pub fn package_known(&self, package: &str) -> bool {
        self.known_packages
            .as_ref()
            .is_none_or(|packages| packages.contains(package))
    }

    /// Whether the file inventory permits `source`
    pub fn file_known(&self, source: &str) -> bool {
        self.known_files
            .as_ref()
            .is_none_or(|files| files.contains(source))
    }

    /// Resource that already claimed managed path `path`, if any
    pub fn path_owner(&self, path: &str) -> Option<&str> {
        self.claimed_paths
            .iter()
            .find(|(claimed, _)| claimed == path)
            .map(|(_, owner)| owner.as_str())
    }

    /// Record that `owner` manages `path`
    pub fn claim_path(&mut self, path: impl Into<String>, owner: impl Into<String>) {
        self.claimed_paths.push((path.into(), owner.into()));
    }

    /// Group that already claimed `gid`, if any
    pub fn gid_owner(&self, gid: u32) -> Option<&str> {
        self.claimed_gids
            .iter()
            .find(|(claimed, _)| *claimed == gid)
            .map(|(_, owner)| owner.as_str())
    }

    /// Record that group `owner` uses `gid`
    pub fn claim_gid(&mut self, gid: u32, owner: impl Into<String>) {
        self.claimed_gids.push((gid, owner.into()));
    }

    /// Record a successfully compiled resource
    pub fn record_compiled(&mut self, name: &str, resource_type: &str, path: &Path) {
        self.compiled.push(CompiledResource {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            path: path.to_path_buf(),
        });
    }

    /// Resources compiled so far, in order
    pub fn compiled(&self) -> &[CompiledResource] {
        &self.compiled
    }

    /// Whether a resource named `name` has compiled in this run
    pub fn is_compiled(&self, name: &str) -> bool {
        self.compiled.iter().any(|resource| resource.name == name)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(NodeInfo::default())
    }
}
