//! Alert module
//!
//! Alert events and the sinks they are pushed to. Delivery is best-effort:
//! a failing sink never changes a risk decision.

mod sinks;
mod types;

pub use sinks::{ChannelSink, LogSink, RecordingSink};
pub use types::{Alert, AlertError, AlertKind, Severity};

/// Trait for alert sink implementations
pub trait AlertSink: Send + Sync {
    /// Deliver one alert; must not block
    fn emit(&self, alert: Alert) -> Result<(), AlertError>;
}
