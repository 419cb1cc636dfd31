//! Logging setup and standardized spans for delivery observability.

use crate::config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter. Calling this twice is harmless;
/// the second install is ignored.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}

/// Standardized span constructors for switchboard observability.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Span covering delivery of one event to one recipient.
    pub fn delivery(event: &str, conn: u64) -> Span {
        debug_span!("delivery", event = %event, conn = conn)
    }

    /// Span covering a whole fan-out.
    pub fn broadcast(event: &str, recipients: usize) -> Span {
        info_span!("broadcast", event = %event, recipients = recipients)
    }

    /// Span covering a component load or unload.
    pub fn component(action: &'static str, name: &str) -> Span {
        info_span!("component", action = action, name = %name)
    }
}
