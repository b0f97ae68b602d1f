//! Stage transition events
//!
//! The runner emits a [`StageEvent`] when a stage starts and when it
//! completes or fails. Events go to an [`EventSink`]; [`TracingSink`] logs
//! them and [`CollectingSink`] keeps them in memory.

use super::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Outcome recorded by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage began
    Started,
    /// Stage finished and its output is durable
    Completed,
    /// Stage aborted the run
    Failed,
}

/// One stage transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    /// Run the event belongs to
    pub run_id: Uuid,

    /// Stage that transitioned
    pub stage: Stage,

    /// New status
    pub status: StageStatus,

    /// Rows handled by the stage, when it handles rows
    pub rows: Option<usize>,

    /// Artifact written or read, or the error for a failure
    pub detail: Option<String>,

    /// Time spent in the stage, on completion or failure
    pub duration_ms: Option<u64>,

    /// When the transition happened
    pub timestamp: DateTime<Utc>,
}

impl StageEvent {
    /// Event for a stage that is starting
    pub fn started(run_id: Uuid, stage: Stage) -> Self {
        Self {
            run_id,
            stage,
            status: StageStatus::Started,
            rows: None,
            detail: None,
            duration_ms: None,
            timestamp: Utc::now(),
        }
    }

    /// Event for a completed stage
    pub fn completed(
        run_id: Uuid,
        stage: Stage,
        rows: Option<usize>,
        detail: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            status: StageStatus::Completed,
            rows,
            detail,
            duration_ms: Some(duration_ms),
            ..Self::started(run_id, stage)
        }
    }

    /// Event for a failed stage
    pub fn failed(run_id: Uuid, stage: Stage, error: String, duration_ms: u64) -> Self {
        Self {
            status: StageStatus::Failed,
            detail: Some(error),
            duration_ms: Some(duration_ms),
            ..Self::started(run_id, stage)
        }
    }
}

/// Receiver of stage events
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn emit(&self, event: &StageEvent);
}

/// Writes events to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &StageEvent) {
        match event.status {
            StageStatus::Started => {
                crate::log_stage_start!(event.run_id, event.stage);
            }
            StageStatus::Completed => {
                crate::log_stage_complete!(
                    event.run_id,
                    event.stage,
                    event.rows.unwrap_or(0),
                    Duration::from_millis(event.duration_ms.unwrap_or(0))
                );
                if let Some(detail) = &event.detail {
                    tracing::debug!(stage = %event.stage, detail = %detail, "Stage output");
                }
            }
            StageStatus::Failed => {
                tracing::error!(
                    run_id = %event.run_id,
                    stage = %event.stage,
                    error = ?event.detail,
                    duration_ms = ?event.duration_ms,
                    "Stage failed"
                );
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<StageEvent>>,
}

impl CollectingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<StageEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Stages that completed, in order
    pub fn completed_stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter(|e| e.status == StageStatus::Completed)
            .map(|e| e.stage)
            .collect()
    }

    /// The first failure event, if any
    pub fn failure(&self) -> Option<StageEvent> {
        self.events()
            .into_iter()
            .find(|e| e.status == StageStatus::Failed)
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &StageEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_records_in_order() {
        let sink = CollectingSink::new();
        let run_id = Uuid::new_v4();

        sink.emit(&StageEvent::started(run_id, Stage::Extract));
        sink.emit(&StageEvent::completed(run_id, Stage::Extract, Some(3), None, 4));
        sink.emit(&StageEvent::started(run_id, Stage::StageAWrite));
        sink.emit(&StageEvent::failed(
            run_id,
            Stage::StageAWrite,
            "timeout".to_string(),
            30_000,
        ));

        let events = sink.events();
        assert_eq!(events.len(), 4);
        assert_eq!(sink.completed_stages(), vec![Stage::Extract]);

        let failure = sink.failure().unwrap();
        assert_eq!(failure.stage, Stage::StageAWrite);
        assert_eq!(failure.detail.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_tracing_sink_accepts_every_status() {
        let run_id = Uuid::new_v4();
        TracingSink.emit(&StageEvent::started(run_id, Stage::Transform));
        TracingSink.emit(&StageEvent::completed(run_id, Stage::Transform, Some(1), None, 0));
        TracingSink.emit(&StageEvent::failed(run_id, Stage::Transform, "x".into(), 0));
    }
}
