use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::backend::dummy::{DummyBackend, sample_run};
use crate::config::{PollPolicy, Settings};
use crate::flow::{FlowController, FlowState};
use crate::model::ApplicantInput;
use crate::render::SupportInfo;
use crate::render::terminal::render_view;
use crate::widget::WidgetEvent;
use crate::widget::scripted::{ScriptedOutcome, ScriptedWidget};

const DEMO_RUN_ID: &str = "demo-run";

/// Run the whole flow against a simulated backend and capture widget,
/// printing every screen on the way. Returns the state the flow ended in.
pub async fn demo(settings: &Settings, outcome: &str) -> anyhow::Result<FlowState> {
    let settings = Settings {
        workflow_id: "demo-workflow".into(),
        poll: PollPolicy {
            max_attempts: 5,
            interval: Duration::from_millis(300),
        },
        ..settings.clone()
    };
    let support = SupportInfo::from_settings(&settings);

    let (backend, widget) = match outcome {
        "widget-error" => (
            DummyBackend::settling(DEMO_RUN_ID, "approved", 0),
            ScriptedWidget::new(ScriptedOutcome::Error(
                "Camera permission denied".into(),
            )),
        ),
        "remote-error" => (
            DummyBackend::new(DEMO_RUN_ID).with_run_error("Workflow 'demo-workflow' is not active"),
            ScriptedWidget::new(ScriptedOutcome::Complete),
        ),
        "timeout" => (
            DummyBackend::new(DEMO_RUN_ID)
                .with_webhook_script(vec![
                    None,
                    Some(json!({ "status": "review", "raw_output": {} })),
                ])
                .with_run_record(sample_run(DEMO_RUN_ID, "review")),
            ScriptedWidget::new(ScriptedOutcome::Complete),
        ),
        status => (
            DummyBackend::settling(DEMO_RUN_ID, status, 2),
            ScriptedWidget::new(ScriptedOutcome::Complete),
        ),
    };

    let mut flow = FlowController::new(Arc::new(backend), Arc::new(widget), &settings);
    print!("{}", render_view(flow.state(), &support));

    flow.start();
    print!("{}", render_view(flow.state(), &support));

    flow.submit(ApplicantInput {
        first_name: "Jane".into(),
        last_name: "Smith".into(),
        email: Some("jane.smith@example.com".into()),
        phone: Some("+40 721 234 567".into()),
        citizen: true,
    })
    .await;
    print!("{}", render_view(flow.state(), &support));

    if let Some(event) = flow.next_widget_event().await {
        if event == WidgetEvent::Completed
            && let FlowState::Capture { run } = flow.state()
        {
            let pending = FlowState::Pending { run: run.clone() };
            print!("{}", render_view(&pending, &support));
        }
        flow.handle_widget_event(event).await;
    }
    print!("{}", render_view(flow.state(), &support));

    let final_state = flow.state().clone();
    flow.reset();
    Ok(final_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VerificationStatus;

    #[tokio::test(start_paused = true)]
    async fn test_demo_outcomes() {
        let settings = Settings::default();

        let FlowState::Result { result } = demo(&settings, "approved").await.unwrap() else {
            panic!("approved demo should end on a result");
        };
        assert_eq!(result.status, VerificationStatus::Approved);

        let FlowState::Result { result } = demo(&settings, "declined").await.unwrap() else {
            panic!("declined demo should end on a result");
        };
        assert_eq!(result.status, VerificationStatus::Declined);

        assert_eq!(
            demo(&settings, "timeout").await.unwrap(),
            FlowState::Error {
                message: "Timeout waiting for webhook after 5 attempt(s)".into()
            }
        );
        assert_eq!(
            demo(&settings, "widget-error").await.unwrap(),
            FlowState::Error {
                message: "Camera permission denied".into()
            }
        );
        assert_eq!(
            demo(&settings, "remote-error").await.unwrap(),
            FlowState::Error {
                message: "Workflow 'demo-workflow' is not active".into()
            }
        );
    }
}
