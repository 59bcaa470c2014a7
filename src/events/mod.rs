use crate::services::picker_service::PickOutcome;
use crate::state::ExecutionResult;
use uuid::Uuid;

pub type ExecutionId = Uuid;

#[derive(Debug, Clone)]
pub enum AppEvent {
    // Picker events
    AssetPicked(PickOutcome),
    PickerFailed(String),

    // Execution events, always tagged with the execution that produced them
    ExecutionProgress {
        execution_id: ExecutionId,
        progress: f64,
    },
    ExecutionCompleted {
        execution_id: ExecutionId,
        result: ExecutionResult,
    },
    ExecutionFinished(ExecutionId),

    // Preference events
    ParametersSaved,
}

impl AppEvent {
    pub fn execution_id(&self) -> Option<ExecutionId> {
        match self {
            AppEvent::ExecutionProgress { execution_id, .. }
            | AppEvent::ExecutionCompleted { execution_id, .. }
            | AppEvent::ExecutionFinished(execution_id) => Some(*execution_id),
            _ => None,
        }
    }
}

pub type EventSender = tokio::sync::mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
