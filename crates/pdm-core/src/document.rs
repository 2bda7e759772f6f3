#![forbid(unsafe_code)]

//! Document files: a versioned envelope around the root [`ObjectRecord`].
//!
//! Writing runs `setup_before_save` hooks first; reading rebuilds the tree,
//! resolves pointer paths against the new root and runs `init_after_read`
//! hooks. Writing a freshly read document reproduces the file byte for byte.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug_span, info};

use crate::error::{PdmError, PdmResult};
use crate::graph::ObjectGraph;
use crate::io::{ObjectRecord, finish_read, read_object, setup_before_save, write_object};
use crate::object::ObjectId;

/// Format tag written into every document.
pub const DOCUMENT_FORMAT: &str = "pdm";
/// Current document version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFile {
    pub format: String,
    pub version: u32,
    pub root: ObjectRecord,
}

/// Serialize the tree under `root` to pretty JSON.
pub fn document_to_string(graph: &mut ObjectGraph, root: ObjectId) -> PdmResult<String> {
    setup_before_save(graph, root);
    let file = DocumentFile {
        format: DOCUMENT_FORMAT.to_string(),
        version: DOCUMENT_VERSION,
        root: write_object(graph, root)?,
    };
    let mut text = serde_json::to_string_pretty(&file)?;
    text.push('\n');
    Ok(text)
}

/// Build a new tree from document text and return its root.
pub fn document_from_str(graph: &mut ObjectGraph, text: &str) -> PdmResult<ObjectId> {
    let file: DocumentFile = serde_json::from_str(text)?;
    if file.format != DOCUMENT_FORMAT || file.version > DOCUMENT_VERSION {
        return Err(PdmError::UnsupportedDocument {
            format: file.format,
            version: file.version,
        });
    }
    let root = read_object(graph, &file.root)?;
    finish_read(graph, root, root);
    Ok(root)
}

pub fn write_document(graph: &mut ObjectGraph, root: ObjectId, path: impl AsRef<Path>) -> PdmResult<()> {
    let path = path.as_ref();
    let _span = debug_span!(target: "pdm.io", "write_document", path = %path.display()).entered();
    let text = document_to_string(graph, root)?;
    fs::write(path, &text)?;
    info!(target: "pdm.io", path = %path.display(), bytes = text.len(), "document written");
    Ok(())
}

pub fn read_document(graph: &mut ObjectGraph, path: impl AsRef<Path>) -> PdmResult<ObjectId> {
    let path = path.as_ref();
    let _span = debug_span!(target: "pdm.io", "read_document", path = %path.display()).entered();
    let text = fs::read_to_string(path)?;
    let root = document_from_str(graph, &text)?;
    info!(target: "pdm.io", path = %path.display(), objects = graph.descendants(root).len(), "document read");
    Ok(root)
}
