//! Structured logging setup
//!
//! The gateway logs through `tracing`. This module installs the global
//! subscriber: an `EnvFilter` honouring `RUST_LOG` plus a human-readable or
//! JSON formatter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Logging options
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Emit one JSON object per event
    pub json: bool,
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
    /// Include the event target (module path)
    pub with_target: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            json: false,
            default_filter: DEFAULT_FILTER.to_string(),
            with_target: false,
        }
    }
}

impl LoggingOptions {
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed, which is not an
/// error: the existing one keeps receiving events.
pub fn init_logging(options: &LoggingOptions) -> bool {
    let registry = tracing_subscriber::registry().with(options.filter());

    let result = if options.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(options.with_target)
                    .with_current_span(false),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(options.with_target)
                    .with_thread_ids(false),
            )
            .try_init()
    };

    match result {
        Ok(()) => {
            tracing::debug!(json = options.json, "Logging initialized");
            true
        }
        Err(_) => {
            tracing::debug!("Global tracing subscriber already initialized");
            false
        }
    }
}
