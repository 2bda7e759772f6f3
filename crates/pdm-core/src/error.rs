#![forbid(unsafe_code)]

//! Error type shared by the graph, capability and persistence layers.
//!
//! Stale references are not errors at this level: lookups that may race
//! with structural edits return `Option` instead. The variants here cover
//! programmer errors (bad keywords, duplicate facets) and I/O failures.

use thiserror::Error;

use crate::capability::CapabilityKind;
use crate::field::FieldHandle;
use crate::object::ObjectId;

/// Errors raised by the object model.
#[derive(Debug, Error)]
pub enum PdmError {
    #[error("keyword '{keyword}' is already used on class '{class}'")]
    DuplicateKeyword { class: String, keyword: String },

    #[error("'{0}' is not a valid keyword")]
    InvalidKeyword(String),

    #[error("class keyword '{0}' is already registered")]
    DuplicateClass(String),

    #[error("no class registered for keyword '{0}'")]
    UnknownClass(String),

    #[error("object {0} is not alive")]
    StaleObject(ObjectId),

    #[error("field {0} does not exist")]
    StaleField(FieldHandle),

    #[error("field '{keyword}' holds {actual}, expected {expected}")]
    FieldKind {
        keyword: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("field '{keyword}' holds {expected} values, got {actual}")]
    TypeMismatch {
        keyword: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("'{item}' is not an item of enum '{enum_name}'")]
    UnknownEnumItem { enum_name: String, item: String },

    #[error("index {index} out of bounds for field '{keyword}' (length {len})")]
    IndexOutOfBounds {
        keyword: String,
        index: usize,
        len: usize,
    },

    #[error("object {0} already has a parent")]
    AlreadyParented(ObjectId),

    #[error("inserting object {0} here would create a cycle")]
    Cycle(ObjectId),

    #[error("a {0} capability is already attached")]
    DuplicateCapability(CapabilityKind),

    #[error("malformed reference '{0}'")]
    MalformedReference(String),

    #[error("unsupported document format '{format}' version {version}")]
    UnsupportedDocument { format: String, version: u32 },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the object model.
pub type PdmResult<T> = std::result::Result<T, PdmError>;
