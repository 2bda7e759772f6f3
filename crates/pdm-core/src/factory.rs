#![forbid(unsafe_code)]

//! Registry of classes keyed by class keyword.
//!
//! Documents name the class of every object, so reading one requires a
//! factory that can construct any class by keyword.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::class::ObjectClass;
use crate::error::{PdmError, PdmResult};
use crate::keyword::is_valid_keyword;

/// Class registry used by [`crate::ObjectGraph`] for polymorphic creation.
#[derive(Clone, Default)]
pub struct ObjectFactory {
    classes: AHashMap<String, Arc<dyn ObjectClass>>,
}

impl fmt::Debug for ObjectFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectFactory")
            .field("classes", &self.keywords())
            .finish()
    }
}

impl ObjectFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. Keywords must be valid and unique.
    pub fn register(&mut self, class: impl ObjectClass) -> PdmResult<()> {
        self.register_shared(Arc::new(class))
    }

    pub fn register_shared(&mut self, class: Arc<dyn ObjectClass>) -> PdmResult<()> {
        let keyword = class.keyword().to_string();
        if !is_valid_keyword(&keyword) {
            return Err(PdmError::InvalidKeyword(keyword));
        }
        if self.classes.contains_key(&keyword) {
            return Err(PdmError::DuplicateClass(keyword));
        }
        debug!(target: "pdm.graph", class = %keyword, "class registered");
        self.classes.insert(keyword, class);
        Ok(())
    }

    /// Builder form of [`Self::register`].
    pub fn with(mut self, class: impl ObjectClass) -> PdmResult<Self> {
        self.register(class)?;
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<Arc<dyn ObjectClass>> {
        self.classes.get(keyword).cloned()
    }

    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.classes.contains_key(keyword)
    }

    /// Registered keywords, sorted.
    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
