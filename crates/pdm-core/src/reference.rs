#![forbid(unsafe_code)]

//! Root-relative path references.
//!
//! A path is a list of `(field keyword, child index)` hops from a root
//! object down to a target. Single child fields use index `0`. The text
//! form is the space separated token list:
//!
//! ```text
//! Items 2 Settings 0          object path
//! Items 2 Settings 0 Count    field path (object path + field keyword)
//! ```
//!
//! Paths are captured by commands and selections and resolved later, after
//! arbitrary edits. Resolution therefore never panics: any hop that no
//! longer matches yields `None`.

use std::fmt;
use std::str::FromStr;

use crate::error::PdmError;
use crate::field::{FieldData, FieldHandle};
use crate::graph::ObjectGraph;
use crate::object::ObjectId;

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathHop {
    pub keyword: String,
    pub index: usize,
}

/// Path from a root to an object. Empty means the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    hops: Vec<PathHop>,
}

impl ObjectPath {
    #[must_use]
    pub fn new(hops: Vec<PathHop>) -> Self {
        Self { hops }
    }

    #[must_use]
    pub fn hops(&self) -> &[PathHop] {
        &self.hops
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.hops.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Extend the path by one hop.
    #[must_use]
    pub fn join(mut self, keyword: impl Into<String>, index: usize) -> Self {
        self.hops.push(PathHop {
            keyword: keyword.into(),
            index,
        });
        self
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hop) in self.hops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{} {}", hop.keyword, hop.index)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectPath {
    type Err = PdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        parse_hops(&tokens).ok_or_else(|| PdmError::MalformedReference(s.to_string()))
    }
}

fn parse_hops(tokens: &[&str]) -> Option<ObjectPath> {
    if tokens.len() % 2 != 0 {
        return None;
    }
    let hops = tokens
        .chunks_exact(2)
        .map(|pair| {
            Some(PathHop {
                keyword: pair[0].to_string(),
                index: pair[1].parse().ok()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(ObjectPath { hops })
}

/// Path from a root to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub object: ObjectPath,
    pub keyword: String,
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.object.is_root() {
            f.write_str(&self.keyword)
        } else {
            write!(f, "{} {}", self.object, self.keyword)
        }
    }
}

impl FromStr for FieldPath {
    type Err = PdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let malformed = || PdmError::MalformedReference(s.to_string());
        let (keyword, rest) = tokens.split_last().ok_or_else(malformed)?;
        let object = parse_hops(rest).ok_or_else(malformed)?;
        Ok(Self {
            object,
            keyword: (*keyword).to_string(),
        })
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Path from `root` down to `object`.
///
/// Returns an empty path when `object == root` and `None` when `object` is
/// not below `root`.
#[must_use]
pub fn reference_from_root_to_object(
    graph: &ObjectGraph,
    root: ObjectId,
    object: ObjectId,
) -> Option<ObjectPath> {
    if !graph.is_alive(root) || !graph.is_alive(object) {
        return None;
    }

    let mut hops = Vec::new();
    let mut current = object;
    while current != root {
        let link = graph.parent(current)?;
        let field = graph.field(link.field_handle())?;
        let index = match field.data() {
            FieldData::ChildArray(children) => children.iter().position(|&c| c == current)?,
            FieldData::Child(_) => 0,
            _ => return None,
        };
        hops.push(PathHop {
            keyword: field.keyword().to_string(),
            index,
        });
        current = link.object;
    }
    hops.reverse();
    Some(ObjectPath { hops })
}

/// Path from `root` to `field`.
#[must_use]
pub fn reference_from_root_to_field(
    graph: &ObjectGraph,
    root: ObjectId,
    field: FieldHandle,
) -> Option<FieldPath> {
    let keyword = graph.field(field)?.keyword().to_string();
    let object = reference_from_root_to_object(graph, root, field.object)?;
    Some(FieldPath { object, keyword })
}

/// Follow `path` from `root`.
#[must_use]
pub fn object_from_reference(
    graph: &ObjectGraph,
    root: ObjectId,
    path: &ObjectPath,
) -> Option<ObjectId> {
    if !graph.is_alive(root) {
        return None;
    }
    let mut current = root;
    for hop in &path.hops {
        let handle = graph.field_by_any_keyword(current, &hop.keyword)?;
        let field = graph.field(handle)?;
        current = match field.data() {
            FieldData::ChildArray(children) => *children.get(hop.index)?,
            FieldData::Child(Some(child)) if hop.index == 0 => *child,
            _ => return None,
        };
    }
    Some(current)
}

/// Follow `path` from `root` to a field.
#[must_use]
pub fn field_from_reference(
    graph: &ObjectGraph,
    root: ObjectId,
    path: &FieldPath,
) -> Option<FieldHandle> {
    let object = object_from_reference(graph, root, &path.object)?;
    graph.field_by_any_keyword(object, &path.keyword)
}
