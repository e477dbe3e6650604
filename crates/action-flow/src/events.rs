//! Structured step and cycle events

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use webcycle_core_types::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StepEvent {
    StepStarted {
        step: String,
    },
    StepSucceeded {
        step: String,
        attempts: u32,
        confirmed_by_fallback: bool,
        latency_ms: u64,
    },
    StepFailed {
        step: String,
        kind: ErrorKind,
        reason: String,
        best_effort: bool,
    },
    IterationStarted {
        iteration: u32,
    },
    IterationCompleted {
        iteration: u32,
        warnings: usize,
    },
    CycleAborted {
        iteration: u32,
        kind: ErrorKind,
    },
}

/// Receives every event the engine emits, on the execution task.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: StepEvent);
}

/// Forwards events to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: StepEvent) {
        match event {
            StepEvent::StepStarted { step } => debug!(%step, "step started"),
            StepEvent::StepSucceeded {
                step,
                attempts,
                confirmed_by_fallback,
                latency_ms,
            } => info!(%step, attempts, confirmed_by_fallback, latency_ms, "step succeeded"),
            StepEvent::StepFailed {
                step,
                kind,
                reason,
                best_effort,
            } => warn!(%step, kind = kind.name(), best_effort, %reason, "step failed"),
            StepEvent::IterationStarted { iteration } => info!(iteration, "iteration started"),
            StepEvent::IterationCompleted {
                iteration,
                warnings,
            } => info!(iteration, warnings, "iteration completed"),
            StepEvent::CycleAborted { iteration, kind } => {
                warn!(iteration, kind = kind.name(), "cycle aborted")
            }
        }
    }
}

/// In-memory fan-out for observers in the same process.
pub struct BroadcastSink {
    sender: broadcast::Sender<StepEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StepEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: StepEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

/// Sends every event to each inner sink in order.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: StepEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        let fanout = FanoutSink::new(vec![Arc::new(TracingSink), sink.clone()]);

        fanout.emit(StepEvent::IterationStarted { iteration: 1 });
        fanout.emit(StepEvent::StepFailed {
            step: "refresh".into(),
            kind: ErrorKind::ElementNotFound,
            reason: "not found".into(),
            best_effort: true,
        });

        assert_eq!(rx.try_recv().unwrap(), StepEvent::IterationStarted { iteration: 1 });
        assert!(matches!(
            rx.try_recv().unwrap(),
            StepEvent::StepFailed {
                kind: ErrorKind::ElementNotFound,
                ..
            }
        ));
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        BroadcastSink::new(1).emit(StepEvent::StepStarted { step: "x".into() });
    }

    #[test]
    fn events_serialize_tagged() {
        let json = serde_json::to_value(StepEvent::CycleAborted {
            iteration: 2,
            kind: ErrorKind::SessionLost,
        })
        .unwrap();
        assert_eq!(json["event"], "cycle_aborted");
        assert_eq!(json["iteration"], 2);
    }
}
