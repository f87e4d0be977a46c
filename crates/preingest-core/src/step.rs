//! The contract every verification step follows.
//!
//! A concrete step owns a [`StepBase`] and implements [`Step::execute`].
//! Inside `execute` it calls [`StepBase::begin`], which returns an
//! [`ActionRun`]: the per-execution notification plumbing. The run
//!
//! - emits `Started` on creation,
//! - emits `Executing` on request,
//! - emits exactly one terminal `Completed` or `Failed` via [`ActionRun::complete`]
//!   or [`ActionRun::fail`], or `Failed` on drop if neither was called,
//! - keeps an [`ActionRecorder`] subscribed for its lifetime and unsubscribes it
//!   on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::action::{
    ActionPhase, ActionProperties, ActionResult, PreingestEvent, ResultPayload, Summary,
};
use crate::collection::Collection;
use crate::config::Settings;
use crate::error::{PreingestError, Result};
use crate::notifier::{EventNotifier, Subscription};
use crate::recorder::ActionRecorder;
use crate::store::ActionStore;

// ---------------------------------------------------------------------------
// StepContext
// ---------------------------------------------------------------------------

/// Collaborators injected into every step. Immutable for the step's lifetime.
#[derive(Clone)]
pub struct StepContext {
    pub settings: Arc<Settings>,
    pub notifier: EventNotifier,
    pub store: Arc<ActionStore>,
    pub collection: Collection,
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

pub trait Step {
    fn base(&self) -> &StepBase;

    /// Run the step. Callable once per instance; a second call returns
    /// [`PreingestError::StepAlreadyExecuted`] and emits nothing.
    ///
    /// Every other failure is reported inside the returned payload.
    fn execute(&mut self) -> Result<ResultPayload>;

    fn name(&self) -> &'static str {
        self.base().name()
    }

    fn process_id(&self) -> Uuid {
        self.base().process_id()
    }

    fn session_id(&self) -> Uuid {
        self.base().collection().session_id()
    }
}

// ---------------------------------------------------------------------------
// StepBase
// ---------------------------------------------------------------------------

pub struct StepBase {
    name: &'static str,
    process_id: Uuid,
    ctx: StepContext,
    executed: bool,
}

impl StepBase {
    /// The process id is assigned here so callers can hand it out before the
    /// step starts running.
    pub fn new(name: &'static str, ctx: StepContext) -> Self {
        Self {
            name,
            process_id: Uuid::new_v4(),
            ctx,
            executed: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn process_id(&self) -> Uuid {
        self.process_id
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    pub fn collection(&self) -> &Collection {
        &self.ctx.collection
    }

    /// Start the action: subscribe its recorder and emit `Started`.
    pub fn begin(&mut self, description: impl Into<String>) -> Result<ActionRun> {
        if self.executed {
            return Err(PreingestError::StepAlreadyExecuted(self.name.to_string()));
        }
        self.executed = true;

        let recorder = ActionRecorder::new(Arc::clone(&self.ctx.store), self.process_id);
        let subscription = self.ctx.notifier.subscribe(Arc::new(recorder));

        let description = description.into();
        let now = Utc::now();
        let properties = ActionProperties {
            process_id: self.process_id,
            session_id: self.ctx.collection.session_id(),
            name: self.name.to_string(),
            description: description.clone(),
            creation: now,
            result_files: Vec::new(),
        };

        let mut run = ActionRun {
            notifier: self.ctx.notifier.clone(),
            payload: ResultPayload::new(properties),
            phase: ActionPhase::Started,
            last_at: now,
            result_file: self.ctx.collection.result_file(self.name),
            subscription: Some(subscription),
        };
        run.emit(ActionPhase::Started, description);
        Ok(run)
    }
}

// ---------------------------------------------------------------------------
// ActionRun
// ---------------------------------------------------------------------------

/// One execution of a step, from `Started` to its terminal notification.
pub struct ActionRun {
    notifier: EventNotifier,
    payload: ResultPayload,
    phase: ActionPhase,
    last_at: DateTime<Utc>,
    result_file: PathBuf,
    subscription: Option<Subscription>,
}

impl ActionRun {
    pub fn payload(&self) -> &ResultPayload {
        &self.payload
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.payload.messages.push(message.into());
    }

    pub fn push_data(&mut self, data: impl Into<String>) {
        self.payload.action_data.push(data.into());
    }

    /// Record a fault: a headline, its description and a diagnostic trace.
    pub fn push_fault(&mut self, headline: impl Into<String>, err: &dyn std::error::Error) {
        self.push_message(headline);
        self.push_message(err.to_string());
        self.push_message(diagnostic_trace(err));
    }

    /// Emit an `Executing` notification.
    pub fn executing(&mut self, description: impl Into<String>) {
        self.emit(ActionPhase::Executing, description.into());
    }

    /// Finish normally. `result` carries whether the check passed.
    pub fn complete(
        mut self,
        result: ActionResult,
        summary: Summary,
        description: impl Into<String>,
    ) -> ResultPayload {
        self.finish(ActionPhase::Completed, result, summary, description.into())
    }

    /// Finish after a fault: classification `Failed`, summary unavailable.
    pub fn fail(mut self, description: impl Into<String>) -> ResultPayload {
        self.finish(
            ActionPhase::Failed,
            ActionResult::Failed,
            Summary::UNAVAILABLE,
            description.into(),
        )
    }

    fn finish(
        &mut self,
        phase: ActionPhase,
        result: ActionResult,
        summary: Summary,
        description: String,
    ) -> ResultPayload {
        self.payload.result = Some(result);
        self.payload.summary = summary;
        self.write_result_file();
        self.emit(phase, description);
        // Unsubscribe the recorder now rather than at drop.
        self.subscription.take();
        std::mem::take(&mut self.payload)
    }

    fn write_result_file(&mut self) {
        let file_name = self
            .result_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.payload.properties.result_files = vec![file_name];
        if let Err(e) = crate::io::write_json(&self.result_file, &self.payload) {
            tracing::warn!(
                process_id = %self.payload.process_id(),
                path = %self.result_file.display(),
                error = %e,
                "failed to write result file"
            );
            self.payload.properties.result_files.clear();
        }
    }

    fn emit(&mut self, phase: ActionPhase, description: String) {
        if self.phase.is_terminal() {
            tracing::warn!(
                process_id = %self.payload.process_id(),
                from = %self.phase,
                to = %phase,
                "ignoring notification after terminal phase"
            );
            return;
        }
        // Timestamps within one action never go backwards.
        let at = Utc::now().max(self.last_at);
        self.last_at = at;
        self.phase = phase;

        tracing::info!(
            process_id = %self.payload.process_id(),
            session_id = %self.payload.session_id(),
            phase = %phase,
            "{description}"
        );
        self.notifier.publish(PreingestEvent {
            description,
            initiate: at,
            action_type: phase,
            preingest_action: self.payload.clone(),
        });
    }
}

impl Drop for ActionRun {
    fn drop(&mut self) {
        if !self.phase.is_terminal() {
            self.push_message("Step ended without reporting an outcome.");
            self.finish(
                ActionPhase::Failed,
                ActionResult::Failed,
                Summary::UNAVAILABLE,
                "Step ended unexpectedly.".to_string(),
            );
        }
    }
}

/// `Debug` form of the error followed by its `source()` chain.
pub fn diagnostic_trace(err: &dyn std::error::Error) -> String {
    let mut trace = format!("{err:?}");
    let mut source = err.source();
    while let Some(cause) = source {
        trace.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    trace
}
