use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{Backend, NewApplicant, NewWorkflowRun};
use crate::config::{CAPTURE_CONTAINER_ID, Settings};
use crate::error::FlowError;
use crate::model::{ApplicantInput, CanonicalResult, RunHandle};
use crate::reconcile::{CancelToken, PollError, Reconciler};
use crate::widget::{CaptureSlot, CaptureWidget, WidgetCallbacks, WidgetConfig, WidgetEvent};

/// The screen the flow is on. Each variant carries only what that screen needs.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Home,
    Form { validation_error: Option<String> },
    Capture { run: RunHandle },
    Pending { run: RunHandle },
    Error { message: String },
    Result { result: Box<CanonicalResult> },
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Home => "home",
            FlowState::Form { .. } => "form",
            FlowState::Capture { .. } => "capture",
            FlowState::Pending { .. } => "pending",
            FlowState::Error { .. } => "error",
            FlowState::Result { .. } => "result",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives one applicant through form, capture, polling and result.
///
/// Owns the capture-widget instance (at most one live at a time) and the
/// cancellation token of the current reconciliation. Dropping the controller
/// runs the same cleanup as [`FlowController::reset`].
pub struct FlowController {
    backend: Arc<dyn Backend>,
    widget: Arc<dyn CaptureWidget>,
    reconciler: Reconciler,
    workflow_id: String,
    state: FlowState,
    applicant: Option<ApplicantInput>,
    capture: CaptureSlot,
    events: Option<mpsc::UnboundedReceiver<WidgetEvent>>,
    cancel: CancelToken,
}

impl FlowController {
    pub fn new(
        backend: Arc<dyn Backend>,
        widget: Arc<dyn CaptureWidget>,
        settings: &Settings,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(backend.clone(), settings),
            backend,
            widget,
            workflow_id: settings.workflow_id.clone(),
            state: FlowState::Home,
            applicant: None,
            capture: CaptureSlot::default(),
            events: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    #[cfg(test)]
    pub fn applicant(&self) -> Option<&ApplicantInput> {
        self.applicant.as_ref()
    }

    #[cfg(test)]
    pub fn has_live_widget(&self) -> bool {
        self.capture.is_live()
    }

    /// Token that aborts the current reconciliation from outside; the
    /// controller then returns to `home`. A fresh token is issued on every
    /// reset, so fetch it after submitting.
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// `home → form`.
    pub fn start(&mut self) {
        match self.state {
            FlowState::Home => self.transition(FlowState::Form {
                validation_error: None,
            }),
            _ => self.ignore("start"),
        }
    }

    /// `form → capture`. Validation problems keep the form open with an
    /// inline message; remote or widget failures move to `error`.
    pub async fn submit(&mut self, input: ApplicantInput) {
        if !matches!(self.state, FlowState::Form { .. }) {
            self.ignore("submit");
            return;
        }

        let applicant = match input.validated() {
            Ok(applicant) => applicant,
            Err(e) => {
                tracing::info!("form rejected: {}", e);
                self.state = FlowState::Form {
                    validation_error: Some(e.to_string()),
                };
                return;
            }
        };
        tracing::info!(
            citizen = applicant.citizen,
            "submitting applicant {}",
            applicant.full_name()
        );

        if self.capture.is_live() {
            tracing::info!("tearing down the capture widget of the previous attempt");
            self.capture.release();
        }
        self.events = None;
        self.applicant = Some(applicant.clone());

        let created = match self
            .backend
            .create_applicant(&NewApplicant::from(&applicant))
            .await
        {
            Ok(created) => created,
            Err(e) => return self.fail(FlowError::RemoteCreate(e.to_string())),
        };

        let run = match self
            .backend
            .create_workflow_run(&NewWorkflowRun {
                workflow_id: self.workflow_id.clone(),
                applicant_id: created.id,
            })
            .await
        {
            Ok(run) => RunHandle {
                run_id: run.id,
                sdk_token: run.sdk_token,
            },
            Err(e) => return self.fail(FlowError::RemoteCreate(e.to_string())),
        };
        tracing::info!("workflow run {} created", run.run_id);

        let (callbacks, events) = WidgetCallbacks::channel();
        let config = WidgetConfig {
            token: run.sdk_token.clone(),
            workflow_run_id: run.run_id.clone(),
            container_id: CAPTURE_CONTAINER_ID.to_string(),
        };
        match self.widget.init(config, callbacks) {
            Ok(handle) => {
                self.capture.replace(handle);
                self.events = Some(events);
                self.transition(FlowState::Capture { run });
            }
            Err(e) => self.fail(FlowError::Widget(e.to_string())),
        }
    }

    /// Wait for the mounted widget to report back. `None` when no widget is
    /// mounted or it went away without reporting.
    pub async fn next_widget_event(&mut self) -> Option<WidgetEvent> {
        self.events.as_mut()?.recv().await
    }

    /// React to a widget callback: completion moves to `pending` and runs
    /// the reconciliation to its end; an error moves to `error`.
    pub async fn handle_widget_event(&mut self, event: WidgetEvent) {
        let run = match &self.state {
            FlowState::Capture { run } => run.clone(),
            _ => return self.ignore("widget event"),
        };

        match event {
            WidgetEvent::Completed => {
                self.transition(FlowState::Pending { run: run.clone() });
                self.reconcile(run).await;
            }
            WidgetEvent::Failed(message) => self.fail(FlowError::Widget(message)),
        }
    }

    /// Pump widget events until the flow leaves `capture` (and, after
    /// completion, `pending`).
    pub async fn run_capture(&mut self) {
        while matches!(self.state, FlowState::Capture { .. }) {
            match self.next_widget_event().await {
                Some(event) => self.handle_widget_event(event).await,
                None => self.fail(FlowError::Widget(
                    "Capture widget closed without reporting a result".into(),
                )),
            }
        }
    }

    async fn reconcile(&mut self, run: RunHandle) {
        let cancel = self.cancel.clone();

        let terminal = match self
            .reconciler
            .poll_until_terminal(&run.run_id, &cancel)
            .await
        {
            Ok(payload) => payload,
            Err(PollError::Cancelled) => {
                tracing::info!("reconciliation of run {} cancelled", run.run_id);
                return self.reset();
            }
            Err(PollError::Timeout { attempts }) => {
                return self.fail(FlowError::PollTimeout { attempts });
            }
        };

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            r = self.reconciler.fetch_and_merge(&run.run_id, self.applicant.as_ref(), Some(terminal)) => Some(r),
        };

        match fetched {
            None => self.reset(),
            Some(Ok(result)) => {
                tracing::info!("run {} reconciled: {}", run.run_id, result.status);
                self.transition(FlowState::Result {
                    result: Box::new(result),
                });
            }
            Some(Err(e)) => self.fail(e),
        }
    }

    /// `error → form`. Only the error is dropped; the widget of the failed
    /// attempt stays mounted until the next submit replaces it.
    pub fn retry(&mut self) {
        match self.state {
            FlowState::Error { .. } => self.transition(FlowState::Form {
                validation_error: None,
            }),
            _ => self.ignore("retry"),
        }
    }

    /// `any → home`: cancel polling, tear down the widget, forget the
    /// attempt. Safe to call at any time, any number of times.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        self.capture.release();
        self.events = None;
        self.applicant = None;
        if !matches!(self.state, FlowState::Home) {
            self.transition(FlowState::Home);
        }
    }

    fn fail(&mut self, error: FlowError) {
        tracing::warn!("flow failed in {}: {}", self.state, error);
        self.state = FlowState::Error {
            message: error.to_string(),
        };
    }

    fn transition(&mut self, next: FlowState) {
        tracing::info!("{} -> {}", self.state, next);
        self.state = next;
    }

    fn ignore(&self, action: &str) {
        tracing::warn!("ignoring {} in state {}", action, self.state);
    }
}

impl Drop for FlowController {
    fn drop(&mut self) {
        self.reset();
    }
}
