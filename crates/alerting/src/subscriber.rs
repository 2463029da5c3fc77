//! Event-bus consumer that feeds persisted metric samples to the engine.
//!
//! Each sample is evaluated on its own task so a slow notification channel
//! for one server never delays evaluation for another.

use std::sync::Arc;

use servwatch_core::metric::MetricSample;
use servwatch_events::{PlatformEvent, EVENT_METRIC_PERSISTED};
use tokio::sync::broadcast;

use crate::engine::AlertEngine;

/// Run the subscriber loop until the bus is closed.
///
/// If the receiver lags past the bus capacity the skipped samples are not
/// evaluated; the loop logs the count and resumes with the oldest retained
/// event.
pub async fn run(engine: Arc<AlertEngine>, mut receiver: broadcast::Receiver<PlatformEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) if event.event_type == EVENT_METRIC_PERSISTED => {
                let sample: MetricSample = match serde_json::from_value(event.payload) {
                    Ok(sample) => sample,
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding malformed metric event");
                        continue;
                    }
                };
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    if let Err(e) = engine.evaluate_metric(&sample).await {
                        tracing::error!(
                            server_id = sample.server_id,
                            error = %e,
                            "Alert evaluation failed"
                        );
                    }
                });
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Alert evaluator lagged, some metric samples were not evaluated");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Event bus closed, alert evaluator shutting down");
                break;
            }
        }
    }
}
