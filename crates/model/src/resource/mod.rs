//! JSON attribute resource reader and writer.
//!
//! A resource document carries definitions (local items only) followed
//! by attribute instances:
//!
//! ```json
//! {
//!   "kind": "AttributeResource",
//!   "version": 1,
//!   "next_id": 6,
//!   "definitions": [
//!     { "type": "Material", "items": [ { "name": "Viscosity", "kind": "double" } ] }
//!   ],
//!   "attributes": [
//!     { "name": "att1", "type": "Material", "id": 5,
//!       "items": [ { "name": "Viscosity", "values": [0.001002] } ] }
//!   ]
//! }
//! ```
//!
//! Value slots are `null` (unset), a literal, `{"discrete": n}` or
//! `{"expression": "<attribute name>"}`.

mod read;
mod write;

use std::path::{Path, PathBuf};

use crate::error::ModelError;
use crate::manager::Manager;

pub use read::from_json;
pub use write::to_json;

/// The `kind` tag every resource document carries.
pub const RESOURCE_KIND: &str = "AttributeResource";

/// Highest document version this reader understands.
pub const FORMAT_VERSION: u64 = 1;

/// Errors reading or writing a resource document.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("could not read '{}': {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write '{}': {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document is not a resource, or a required field is missing.
    #[error("invalid resource: {0}")]
    InvalidDocument(String),

    #[error("definition #{index}: {message}")]
    InvalidDefinition { index: usize, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A manager loaded from a document, plus the per-attribute problems the
/// reader skipped over.
#[derive(Debug)]
pub struct LoadedResource {
    pub manager: Manager,
    pub diagnostics: Vec<String>,
}

impl LoadedResource {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Read and parse a resource file.
pub fn read_resource(path: &Path) -> Result<LoadedResource, ResourceError> {
    let text = std::fs::read_to_string(path).map_err(|source| ResourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| ResourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    from_json(&doc)
}

/// Write `manager` to `path` as pretty-printed JSON.
pub fn write_resource(manager: &Manager, path: &Path) -> Result<(), ResourceError> {
    let doc = to_json(manager)?;
    let mut text = serde_json::to_string_pretty(&doc)?;
    text.push('\n');
    std::fs::write(path, text).map_err(|source| ResourceError::Write {
        path: path.to_path_buf(),
        source,
    })
}
