#![forbid(unsafe_code)]

//! Subscriber bootstrap for hosts.
//!
//! The library crates only emit `tracing` events under the `pdm.*` targets;
//! installing a subscriber is up to the application. [`init_logging`] is the
//! stock way to do that from a [`LoggingPolicy`].
//!
//! The `PDM_LOG` environment variable, when set, takes precedence over the
//! policy's filter.

use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::{LogFormat, LoggingPolicy};

/// Environment variable overriding [`LoggingPolicy::filter`].
pub const LOG_ENV_VAR: &str = "PDM_LOG";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// The filter `init_logging` would install.
pub fn build_filter(policy: &LoggingPolicy) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::builder().with_env_var(LOG_ENV_VAR).try_from_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&policy.filter).map_err(|source| LoggingError::Filter {
        filter: policy.filter.clone(),
        source,
    })
}

fn build_output_layer(policy: &LoggingPolicy) -> Box<dyn Layer<Registry> + Send + Sync> {
    match policy.format {
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(policy.with_target),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        ),
    }
}

/// Install a global subscriber for `policy`.
///
/// Calling it again returns [`LoggingError::AlreadyInitialized`] and leaves
/// the first subscriber in place.
pub fn init_logging(policy: &LoggingPolicy) -> Result<(), LoggingError> {
    let filter = build_filter(policy)?;
    Registry::default()
        .with(build_output_layer(policy).with_filter(filter))
        .try_init()?;
    tracing::debug!(target: "pdm.runtime", format = ?policy.format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filter_is_reported() {
        if std::env::var_os(LOG_ENV_VAR).is_some() {
            return;
        }
        let policy = LoggingPolicy {
            filter: "pdm=verbose".into(),
            ..LoggingPolicy::default()
        };
        assert!(matches!(build_filter(&policy), Err(LoggingError::Filter { .. })));
    }

    #[test]
    fn second_init_is_an_error_not_a_panic() {
        let policy = LoggingPolicy::default();
        let first = init_logging(&policy);
        let second = init_logging(&policy);
        assert!(first.is_ok() || matches!(first, Err(LoggingError::AlreadyInitialized(_))));
        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }
}
