//! Resource declarations and manifests
//!
//! A manifest is an ordered set of named resources. Declaration order is
//! preserved from the source document and is the order resources compile in.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::error::{HttpError, HttpResult};

/// One named declaration of desired state.
///
/// The name lives in the manifest; the resource itself holds the type
/// discriminator and the type-specific properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Type discriminator selecting the processor
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Type-specific properties
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Resource {
    /// Create a resource of the given type with no properties
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
        }
    }

    /// Set a property, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Decode the properties into a typed struct.
    ///
    /// Shape mismatches are reported as `InvalidArgumentError`.
    pub fn properties_as<T: DeserializeOwned>(&self, name: &str) -> HttpResult<T> {
        serde_json::from_value(Value::Object(self.properties.clone())).map_err(|e| {
            HttpError::invalid_argument(format!(
                "invalid properties for {} resource '{}': {}",
                self.resource_type, name, e
            ))
        })
    }
}

/// Reject names that cannot serve as an artifact base filename
pub fn validate_name(name: &str) -> HttpResult<()> {
    if name.is_empty() {
        return Err(HttpError::invalid_argument("resource name must not be empty"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(HttpError::invalid_argument(format!(
            "resource name '{}' is not a valid file name",
            name
        )));
    }
    Ok(())
}

/// Ordered collection of named resources for one node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    entries: Vec<(String, Resource)>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource; names must be unique
    pub fn insert(&mut self, name: impl Into<String>, resource: Resource) -> HttpResult<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(HttpError::conflict(format!(
                "resource '{}' is declared more than once",
                name
            )));
        }
        self.entries.push((name, resource));
        Ok(())
    }

    /// Look up a resource by name
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, resource)| resource)
    }

    /// Iterate `(name, resource)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.entries
            .iter()
            .map(|(name, resource)| (name.as_str(), resource))
    }

    /// Resource names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a manifest from a JSON object of `name -> declaration`
    pub fn from_value(value: &Value) -> HttpResult<Self> {
        let Value::Object(map) = value else {
            return Err(HttpError::invalid_argument("manifest must be a JSON object"));
        };

        let mut manifest = Manifest::new();
        for (name, declaration) in map {
            let resource: Resource = serde_json::from_value(declaration.clone()).map_err(|e| {
                HttpError::invalid_argument(format!("invalid declaration for '{}': {}", name, e))
            })?;
            manifest.insert(name.clone(), resource)?;
        }
        Ok(manifest)
    }

    /// Parse a manifest from JSON text
    pub fn from_json_str(text: &str) -> HttpResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| HttpError::invalid_argument(format!("manifest is not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, resource) in &self.entries {
            map.serialize_entry(name, resource)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Manifest::from_value(&value).map_err(|e| D::Error::custom(e.message().to_string()))
    }
}
