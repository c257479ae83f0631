//! Metrics and observability infrastructure for Glacier.
//!
//! - `events`: internal event types and the `InternalEvent` trait
//! - `exporter`: Prometheus recorder and end-of-run snapshot

pub mod events;
pub mod exporter;

pub use exporter::{MetricsSnapshot, init};

/// Emit an internal event.
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding metric.
///
/// ```ignore
/// use glacier::metrics::events::ReviewsDropped;
///
/// emit!(ReviewsDropped { count: 3 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
