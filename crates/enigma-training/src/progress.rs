use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Identifier for one training run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingRunId(pub String);

impl TrainingRunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TrainingRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainingRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Steps of the end-to-end train flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainStage {
    LoadData,
    Split,
    Preprocess,
    Fit,
    Evaluate,
    Register,
}

impl std::fmt::Display for TrainStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LoadData => "load_data",
            Self::Split => "split",
            Self::Preprocess => "preprocess",
            Self::Fit => "fit",
            Self::Evaluate => "evaluate",
            Self::Register => "register",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { run_id: TrainingRunId },
    Stage { run_id: TrainingRunId, stage: TrainStage, message: String },
    Finished { run_id: TrainingRunId },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { run_id } => println!("[train:{run_id}] started"),
            ProgressEvent::Stage { run_id, stage, message } => println!("[train:{run_id}] {stage}: {message}"),
            ProgressEvent::Finished { run_id } => println!("[train:{run_id}] finished"),
        }
    }
}

/// Forwards events to `tracing`; the default sink for library callers.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { run_id } => info!(run_id = %run_id, "Training run started"),
            ProgressEvent::Stage { run_id, stage, message } => {
                info!(run_id = %run_id, stage = %stage, "{message}");
            }
            ProgressEvent::Finished { run_id } => info!(run_id = %run_id, "Training run finished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ProgressEvent::Stage {
            run_id: TrainingRunId("r1".to_string()),
            stage: TrainStage::Fit,
            message: "fitting".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stage");
        assert_eq!(json["stage"], "fit");
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(TrainingRunId::new(), TrainingRunId::new());
    }
}
