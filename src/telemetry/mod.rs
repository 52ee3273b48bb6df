//! Telemetry module
//!
//! Metrics and structured logging

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{
    record_alert, record_breaker_trip, record_denial, record_fill, record_validation,
    set_exposure, Decision,
};

use crate::config::TelemetryConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize logging and, when a port is configured, the Prometheus exporter.
///
/// Must run inside a tokio runtime when the exporter is enabled.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)?;

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    Ok(())
}
