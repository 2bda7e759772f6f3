#![forbid(unsafe_code)]

//! PDM public facade crate.
//!
//! Re-exports the object model from `pdm-core` and, with the `runtime`
//! feature (on by default), the command layer from `pdm-runtime`. Most
//! applications only need the [`prelude`].

use std::fmt;

// --- Model re-exports ------------------------------------------------------

pub use pdm_core::{
    CapabilitySet, EnumDef, FieldHandle, FieldKind, FieldPath, FieldValue, ObjectClass,
    ObjectFactory, ObjectGraph, ObjectId, ObjectPath, ObjectRecord, PdmError, UiCapability,
    UiTreeOrdering, ValueKind, read_document, write_document,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use pdm_runtime::{
    CommandError, ConfigError, LoggingError, PdmCommand, PdmContext, PdmEvent, RuntimeConfig,
    SelectionItem, Subscription, UiValue, init_logging,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for PDM applications.
#[derive(Debug)]
pub enum Error {
    /// Object model or document failure.
    Model(PdmError),
    /// A command could not run.
    #[cfg(feature = "runtime")]
    Command(CommandError),
    /// Configuration could not be loaded.
    #[cfg(feature = "runtime")]
    Config(ConfigError),
    /// Logging could not be installed.
    #[cfg(feature = "runtime")]
    Logging(LoggingError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Command(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Config(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Logging(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Command(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Config(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Logging(err) => Some(err),
        }
    }
}

impl From<PdmError> for Error {
    fn from(err: PdmError) -> Self {
        Self::Model(err)
    }
}

#[cfg(feature = "runtime")]
impl From<CommandError> for Error {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Model(inner) => Self::Model(inner),
            other => Self::Command(other),
        }
    }
}

#[cfg(feature = "runtime")]
impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

#[cfg(feature = "runtime")]
impl From<LoggingError> for Error {
    fn from(err: LoggingError) -> Self {
        Self::Logging(err)
    }
}

/// Standard result type for PDM APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Opening documents -----------------------------------------------------

/// Load the runtime configuration at `config_path` (if any) and open the
/// document at `path` with it.
#[cfg(feature = "runtime")]
pub fn open_document(
    factory: ObjectFactory,
    path: impl AsRef<std::path::Path>,
    config_path: Option<&std::path::Path>,
) -> Result<PdmContext> {
    let config = match config_path {
        Some(p) => RuntimeConfig::from_toml_file(p)?.validated()?,
        None => RuntimeConfig::default(),
    };
    Ok(PdmContext::load_document(
        ObjectGraph::new(factory),
        path,
        &config,
    )?)
}

// --- Prelude ---------------------------------------------------------------

/// Common imports for application code.
pub mod prelude {
    pub use crate::{
        Error, FieldHandle, FieldPath, FieldValue, ObjectFactory, ObjectGraph, ObjectId,
        ObjectPath, Result,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{PdmContext, PdmEvent, RuntimeConfig, SelectionItem, UiValue};

    pub use crate::core;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use pdm_core as core;
#[cfg(feature = "runtime")]
pub use pdm_runtime as runtime;
