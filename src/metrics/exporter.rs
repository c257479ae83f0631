//! Prometheus exporter for batch runs.
//!
//! A run is short-lived, so instead of serving `/metrics` the recorder is
//! rendered once when the run finishes: logged at debug level and optionally
//! written to a file for a node-exporter textfile collector.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use snafu::prelude::*;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{MetricsError, MetricsOutputSnafu, PrometheusInitSnafu};

/// Handle to the installed recorder.
pub struct MetricsSnapshot {
    handle: PrometheusHandle,
}

/// Install the global Prometheus recorder.
pub fn init() -> Result<MetricsSnapshot, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context(PrometheusInitSnafu)?;
    Ok(MetricsSnapshot { handle })
}

impl MetricsSnapshot {
    /// Render all recorded metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Log the rendered metrics and write them to `output_path` if given.
    pub fn export(&self, output_path: Option<&str>) -> Result<(), MetricsError> {
        let rendered = self.render();
        debug!("Run metrics:\n{}", rendered);

        if let Some(path) = output_path {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).context(MetricsOutputSnafu { path })?;
            }
            std::fs::write(path, rendered).context(MetricsOutputSnafu { path })?;
            info!("Wrote metrics to {}", path);
        }
        Ok(())
    }
}
