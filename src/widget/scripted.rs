use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{CaptureWidget, WidgetCallbacks, WidgetConfig, WidgetHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Complete,
    Error(String),
}

/// Capture widget that reports a fixed outcome as soon as it is mounted.
/// Keeps count of live instances so callers can observe the lifecycle.
pub struct ScriptedWidget {
    outcome: ScriptedOutcome,
    fail_init: Option<String>,
    live: Arc<AtomicUsize>,
    inits: AtomicUsize,
}

impl ScriptedWidget {
    pub fn new(outcome: ScriptedOutcome) -> Self {
        Self {
            outcome,
            fail_init: None,
            live: Arc::new(AtomicUsize::new(0)),
            inits: AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    pub fn failing_init(message: &str) -> Self {
        Self {
            fail_init: Some(message.to_string()),
            ..Self::new(ScriptedOutcome::Complete)
        }
    }

    #[cfg(test)]
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

impl CaptureWidget for ScriptedWidget {
    fn init(
        &self,
        config: WidgetConfig,
        callbacks: WidgetCallbacks,
    ) -> anyhow::Result<Box<dyn WidgetHandle>> {
        if let Some(message) = &self.fail_init {
            anyhow::bail!("{message}");
        }
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            "scripted widget mounted on #{} for run {}",
            config.container_id,
            config.workflow_run_id
        );

        match &self.outcome {
            ScriptedOutcome::Complete => callbacks.on_complete(),
            ScriptedOutcome::Error(message) => callbacks.on_error(message.clone()),
        }

        Ok(Box::new(ScriptedHandle {
            live: self.live.clone(),
            callbacks: Some(callbacks),
        }))
    }
}

/// Keeps the callbacks registered until torn down, like a mounted SDK widget.
struct ScriptedHandle {
    live: Arc<AtomicUsize>,
    callbacks: Option<WidgetCallbacks>,
}

impl WidgetHandle for ScriptedHandle {
    fn tear_down(&mut self) {
        if self.callbacks.take().is_some() {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetEvent;

    fn config() -> WidgetConfig {
        WidgetConfig {
            token: "tok".into(),
            workflow_run_id: "run-1".into(),
            container_id: "capture-mount".into(),
        }
    }

    #[tokio::test]
    async fn test_reports_outcome_and_tears_down_once() {
        let widget = ScriptedWidget::new(ScriptedOutcome::Error("camera denied".into()));
        let (callbacks, mut rx) = WidgetCallbacks::channel();
        let mut handle = widget.init(config(), callbacks).unwrap();

        assert_eq!(
            rx.recv().await,
            Some(WidgetEvent::Failed("camera denied".into()))
        );
        assert_eq!(widget.live_instances(), 1);

        handle.tear_down();
        handle.tear_down();
        assert_eq!(widget.live_instances(), 0);
        assert_eq!(widget.init_count(), 1);
    }

    #[test]
    fn test_failing_init() {
        let widget = ScriptedWidget::failing_init("sdk unavailable");
        let (callbacks, _rx) = WidgetCallbacks::channel();
        let err = widget.init(config(), callbacks).err().unwrap();
        assert_eq!(err.to_string(), "sdk unavailable");
        assert_eq!(widget.live_instances(), 0);
    }
}
