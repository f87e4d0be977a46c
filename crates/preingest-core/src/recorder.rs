use std::sync::Arc;

use uuid::Uuid;

use crate::action::{ActionPhase, PreingestEvent};
use crate::error::Result;
use crate::notifier::EventListener;
use crate::store::ActionStore;

/// Persists the notifications of one action into the [`ActionStore`].
///
/// - `Started` creates the action row and its first status entry.
/// - `Executing` appends a status entry.
/// - `Completed` / `Failed` append a status entry and store the outcome.
///
/// Events for other process ids are ignored, so one recorder per running step
/// can share a notifier with any number of others.
pub struct ActionRecorder {
    store: Arc<ActionStore>,
    process_id: Uuid,
}

impl ActionRecorder {
    pub fn new(store: Arc<ActionStore>, process_id: Uuid) -> Self {
        Self { store, process_id }
    }

    fn record(&self, event: &PreingestEvent) -> Result<()> {
        let payload = &event.preingest_action;
        if event.action_type == ActionPhase::Started {
            self.store.create_action(&payload.properties)?;
        }

        self.store.append_status(
            self.process_id,
            event.action_type,
            event.initiate,
            &event.description,
        )?;

        if event.action_type.is_terminal() {
            if let Some(result) = payload.result {
                self.store.finalize(
                    self.process_id,
                    result,
                    payload.summary,
                    &payload.properties.result_files,
                )?;
            }
        }
        Ok(())
    }
}

impl EventListener for ActionRecorder {
    fn on_event(&self, event: &PreingestEvent) {
        if event.process_id() != self.process_id {
            return;
        }
        if let Err(e) = self.record(event) {
            // Persistence is best-effort from the step's point of view.
            tracing::error!(
                process_id = %self.process_id,
                phase = %event.action_type,
                error = %e,
                "failed to record action status"
            );
        }
    }
}
