#![forbid(unsafe_code)]

//! Persistence facet: controls whether a field takes part in documents.

/// I/O switches for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializationCapability {
    /// Read from documents when present.
    pub readable: bool,
    /// Written to documents.
    pub writable: bool,
}

impl Default for SerializationCapability {
    fn default() -> Self {
        Self {
            readable: true,
            writable: true,
        }
    }
}

impl SerializationCapability {
    /// A facet that keeps the field out of documents entirely.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            readable: false,
            writable: false,
        }
    }
}
