#![forbid(unsafe_code)]

//! Capability facets attached to objects and fields.
//!
//! A facet extends a host with one concern (presentation, persistence,
//! scripting) without the host type knowing about it. The facet set is
//! closed: [`Capability`] is a tagged variant and typed lookup goes through
//! the [`Facet`] trait, so there is no runtime type identification.
//!
//! # Invariants
//!
//! 1. A [`CapabilitySet`] holds at most one facet per [`CapabilityKind`].
//! 2. Attachments keep their insertion order.
//! 3. An [`Attachment::Owned`] facet is dropped with its host; an
//!    [`Attachment::Shared`] facet is only released by the host and stays
//!    alive for any other holder of the `Arc`.
//!
//! # Example
//!
//! ```
//! use pdm_core::{CapabilitySet, UiCapability};
//!
//! let mut caps = CapabilitySet::default();
//! caps.add(UiCapability::new("Count").into()).unwrap();
//! assert_eq!(caps.get::<UiCapability>().map(|ui| ui.ui_name()), Some("Count"));
//! assert!(caps.add(UiCapability::new("Again").into()).is_err());
//! ```

mod scripting;
mod serialization;
mod ui;

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{PdmError, PdmResult};

pub use scripting::ScriptingCapability;
pub use serialization::SerializationCapability;
pub use ui::{EditorHint, OptionItem, UiCapability};

/// Tag identifying a facet concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
    Ui,
    Serialization,
    Scripting,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ui => "ui",
            Self::Serialization => "serialization",
            Self::Scripting => "scripting",
        })
    }
}

/// A facet instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    Ui(UiCapability),
    Serialization(SerializationCapability),
    Scripting(ScriptingCapability),
}

impl Capability {
    #[must_use]
    pub const fn kind(&self) -> CapabilityKind {
        match self {
            Self::Ui(_) => CapabilityKind::Ui,
            Self::Serialization(_) => CapabilityKind::Serialization,
            Self::Scripting(_) => CapabilityKind::Scripting,
        }
    }
}

/// Typed access to one [`Capability`] variant.
pub trait Facet: Into<Capability> + Sized {
    const KIND: CapabilityKind;

    fn from_capability(capability: &Capability) -> Option<&Self>;

    fn from_capability_mut(capability: &mut Capability) -> Option<&mut Self>;
}

macro_rules! impl_facet {
    ($ty:ty, $variant:ident) => {
        impl Facet for $ty {
            const KIND: CapabilityKind = CapabilityKind::$variant;

            fn from_capability(capability: &Capability) -> Option<&Self> {
                match capability {
                    Capability::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_capability_mut(capability: &mut Capability) -> Option<&mut Self> {
                match capability {
                    Capability::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Capability {
            fn from(value: $ty) -> Self {
                Capability::$variant(value)
            }
        }
    };
}

impl_facet!(UiCapability, Ui);
impl_facet!(SerializationCapability, Serialization);
impl_facet!(ScriptingCapability, Scripting);

/// How a host holds a facet.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// The host owns the facet and drops it with itself.
    Owned(Capability),
    /// Ownership stays with the caller; the host only keeps a handle.
    Shared(Arc<Capability>),
}

impl Attachment {
    #[must_use]
    pub fn capability(&self) -> &Capability {
        match self {
            Self::Owned(c) => c,
            Self::Shared(c) => c.as_ref(),
        }
    }

    /// Mutable access, available for owned facets only.
    pub fn capability_mut(&mut self) -> Option<&mut Capability> {
        match self {
            Self::Owned(c) => Some(c),
            Self::Shared(_) => None,
        }
    }

    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        self.capability().kind()
    }
}

/// Ordered facet list of one host.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    entries: SmallVec<[Attachment; 3]>,
}

impl CapabilitySet {
    /// Attach an owned facet.
    pub fn add(&mut self, capability: Capability) -> PdmResult<()> {
        self.attach(Attachment::Owned(capability))
    }

    /// Attach a facet whose lifetime is managed by the caller.
    pub fn add_shared(&mut self, capability: Arc<Capability>) -> PdmResult<()> {
        self.attach(Attachment::Shared(capability))
    }

    /// Attach a facet, rejecting a second facet of the same kind.
    pub fn attach(&mut self, attachment: Attachment) -> PdmResult<()> {
        let kind = attachment.kind();
        if self.has(kind) {
            return Err(PdmError::DuplicateCapability(kind));
        }
        self.entries.push(attachment);
        Ok(())
    }

    /// Replace the facet of the same kind, or attach it if absent.
    pub fn replace(&mut self, capability: Capability) -> Option<Attachment> {
        let kind = capability.kind();
        match self.entries.iter_mut().find(|a| a.kind() == kind) {
            Some(slot) => Some(std::mem::replace(slot, Attachment::Owned(capability))),
            None => {
                self.entries.push(Attachment::Owned(capability));
                None
            }
        }
    }

    /// Detach and return the facet of `kind`.
    pub fn remove(&mut self, kind: CapabilityKind) -> Option<Attachment> {
        let index = self.entries.iter().position(|a| a.kind() == kind)?;
        Some(self.entries.remove(index))
    }

    #[must_use]
    pub fn get<F: Facet>(&self) -> Option<&F> {
        self.entries
            .iter()
            .find(|a| a.kind() == F::KIND)
            .and_then(|a| F::from_capability(a.capability()))
    }

    /// Mutable typed lookup. Shared facets are read-only and yield `None`.
    pub fn get_mut<F: Facet>(&mut self) -> Option<&mut F> {
        self.entries
            .iter_mut()
            .find(|a| a.kind() == F::KIND)
            .and_then(Attachment::capability_mut)
            .and_then(F::from_capability_mut)
    }

    #[must_use]
    pub fn has(&self, kind: CapabilityKind) -> bool {
        self.entries.iter().any(|a| a.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_kind() {
        let mut caps = CapabilitySet::default();
        caps.add(UiCapability::new("Name").into()).unwrap();
        caps.add(SerializationCapability::default().into()).unwrap();

        assert!(caps.get::<UiCapability>().is_some());
        assert!(caps.get::<SerializationCapability>().is_some());
        assert!(caps.get::<ScriptingCapability>().is_none());
        let kinds: Vec<_> = caps.iter().map(Attachment::kind).collect();
        assert_eq!(kinds, [CapabilityKind::Ui, CapabilityKind::Serialization]);
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let mut caps = CapabilitySet::default();
        caps.add(UiCapability::new("A").into()).unwrap();
        let err = caps.add(UiCapability::new("B").into()).unwrap_err();
        assert!(matches!(err, PdmError::DuplicateCapability(CapabilityKind::Ui)));
        assert_eq!(caps.get::<UiCapability>().unwrap().ui_name(), "A");
    }

    #[test]
    fn shared_facets_outlive_host_and_are_read_only() {
        let shared = Arc::new(Capability::from(UiCapability::new("Shared")));
        {
            let mut caps = CapabilitySet::default();
            caps.add_shared(Arc::clone(&shared)).unwrap();
            assert_eq!(Arc::strong_count(&shared), 2);
            assert!(caps.get_mut::<UiCapability>().is_none());
            assert!(!caps.iter().next().unwrap().is_owned());
        }
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn owned_facets_are_mutable() {
        let mut caps = CapabilitySet::default();
        caps.add(UiCapability::new("Old").into()).unwrap();
        caps.get_mut::<UiCapability>().unwrap().set_ui_name("New");
        assert_eq!(caps.get::<UiCapability>().unwrap().ui_name(), "New");
    }

    #[test]
    fn replace_and_remove() {
        let mut caps = CapabilitySet::default();
        assert!(caps.replace(UiCapability::new("A").into()).is_none());
        assert!(caps.replace(UiCapability::new("B").into()).is_some());
        assert_eq!(caps.len(), 1);
        assert!(caps.remove(CapabilityKind::Ui).is_some());
        assert!(caps.is_empty());
    }
}
