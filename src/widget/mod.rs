pub mod scripted;
pub mod terminal;

use tokio::sync::mpsc;

/// What the capture widget needs to start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub token: String,
    pub workflow_run_id: String,
    pub container_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Completed,
    Failed(String),
}

/// Completion and error callbacks registered with a widget instance.
#[derive(Debug, Clone)]
pub struct WidgetCallbacks {
    tx: mpsc::UnboundedSender<WidgetEvent>,
}

impl WidgetCallbacks {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WidgetEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn on_complete(&self) {
        // The controller may already have reset and dropped the receiver.
        let _ = self.tx.send(WidgetEvent::Completed);
    }

    pub fn on_error(&self, message: impl Into<String>) {
        let _ = self.tx.send(WidgetEvent::Failed(message.into()));
    }
}

/// The third-party capture component.
pub trait CaptureWidget: Send + Sync {
    fn init(
        &self,
        config: WidgetConfig,
        callbacks: WidgetCallbacks,
    ) -> anyhow::Result<Box<dyn WidgetHandle>>;
}

/// A mounted widget instance. `tear_down` must be safe to call repeatedly.
pub trait WidgetHandle: Send {
    fn tear_down(&mut self);
}

/// Holds at most one live widget instance and releases it on every exit path.
#[derive(Default)]
pub struct CaptureSlot {
    handle: Option<Box<dyn WidgetHandle>>,
}

impl CaptureSlot {
    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Tear down the current instance, if any, before storing the new one.
    pub fn replace(&mut self, handle: Box<dyn WidgetHandle>) {
        self.release();
        self.handle = Some(handle);
    }

    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.tear_down();
            tracing::debug!("capture widget torn down");
        }
    }
}

impl Drop for CaptureSlot {
    fn drop(&mut self) {
        self.release();
    }
}
