//! State documents and artifact persistence
//!
//! Each resource compiles to one file `<directory>/<name>.<extension>` holding
//! `{ <name>: { <state module>: [modifiers...] } }`, pretty-printed with a
//! fixed indent so identical inputs produce identical bytes.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::error::{CompileError, CompileResult};

/// Default artifact extension
pub const DEFAULT_EXTENSION: &str = "sls";

/// Default pretty-print indent width
pub const DEFAULT_INDENT: usize = 4;

/// Build a single-key modifier object such as `{"enable": true}`
pub fn modifier(key: &str, value: impl Into<Value>) -> Value {
    let mut entry = Map::new();
    entry.insert(key.to_string(), value.into());
    Value::Object(entry)
}

/// Compiled state for one resource
#[derive(Debug, Clone, PartialEq)]
pub struct StateDocument {
    /// Resource name (top-level key)
    pub name: String,
    /// Executor state module, e.g. `service`, `pkg`, `file`
    pub module: String,
    /// Ordered state modifiers
    pub modifiers: Vec<Value>,
}

impl StateDocument {
    /// Start a document for `name` under state module `module`
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            modifiers: Vec::new(),
        }
    }

    /// Append a modifier
    pub fn push(&mut self, modifier: impl Into<Value>) {
        self.modifiers.push(modifier.into());
    }

    /// Render as `{ name: { module: [...] } }`
    pub fn to_value(&self) -> Value {
        let mut body = Map::new();
        body.insert(self.module.clone(), Value::Array(self.modifiers.clone()));
        let mut root = Map::new();
        root.insert(self.name.clone(), Value::Object(body));
        Value::Object(root)
    }
}

/// Serializes documents and persists them under an output directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    extension: String,
    indent: usize,
    atomic: bool,
}

impl ArtifactWriter {
    /// Create a writer
    pub fn new(extension: impl Into<String>, indent: usize, atomic: bool) -> Self {
        Self {
            extension: extension.into(),
            indent,
            atomic,
        }
    }

    /// Artifact file extension
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the artifact for resource `name`
    pub fn path_for(&self, directory: &Path, name: &str) -> PathBuf {
        directory.join(format!("{}.{}", name, self.extension))
    }

    /// Pretty-print any serializable value with the configured indent
    pub fn encode<T: Serialize>(&self, name: &str, value: &T) -> CompileResult<Vec<u8>> {
        let indent = " ".repeat(self.indent);
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        value
            .serialize(&mut serializer)
            .map_err(|source| CompileError::Encode {
                name: name.to_string(),
                source,
            })?;
        Ok(out)
    }

    /// Encode a state document
    pub fn render(&self, document: &StateDocument) -> CompileResult<Vec<u8>> {
        self.encode(&document.name, &document.to_value())
    }

    /// Write `data` to `path`, replacing any prior content
    pub fn write(&self, path: &Path, data: &[u8]) -> CompileResult<()> {
        let result = if self.atomic {
            write_atomic(path, data)
        } else {
            fs::write(path, data)
        };
        result.map_err(|source| CompileError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ArtifactWriter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION, DEFAULT_INDENT, true)
    }
}

/// Write through a sibling temp file, sync, then rename over `path`
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);

    let written = (|| -> io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
        return written;
    }

    if let Some(parent) = path.parent() {
        let dir = OpenOptions::new().read(true).open(parent)?;
        dir.sync_all()?;
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Blake3 hex digest of artifact bytes
pub fn digest(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
