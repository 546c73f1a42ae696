use comfy_table::{Cell, Table};

use super::{SupportInfo, summary_rows};
use crate::flow::FlowState;
use crate::model::{CanonicalResult, CheckSource};

/// Text for the screen the flow is currently on.
pub fn render_view(state: &FlowState, support: &SupportInfo) -> String {
    match state {
        FlowState::Home => home(),
        FlowState::Form { validation_error } => form(validation_error.as_deref()),
        FlowState::Capture { run } => format!(
            "=== Verify your identity ===\nCapture session open for workflow run {}.\n",
            run.run_id
        ),
        FlowState::Pending { .. } => pending(),
        FlowState::Error { message } => error(message),
        FlowState::Result { result } => render_result(result, support),
    }
}

fn home() -> String {
    "=== Identity verification ===\nStart to enter your details and verify your identity.\n".into()
}

fn form(validation_error: Option<&str>) -> String {
    let mut output = String::from("=== Applicant details ===\n");
    if let Some(message) = validation_error {
        output.push_str(&format!("! {message}\n"));
    }
    output
}

fn pending() -> String {
    let mut output = String::from("=== Thank you for uploading ===\n");
    output.push_str("We are currently verifying your information. This may take a few minutes.\n");
    output.push_str("\u{2713} Verification submitted.\n");
    output
}

fn error(message: &str) -> String {
    let mut output = String::from("=== Something went wrong ===\n");
    output.push_str("We couldn't complete your verification.\n");
    output.push_str(&format!("\u{26a0} {message}\n"));
    output
}

pub fn render_result(result: &CanonicalResult, support: &SupportInfo) -> String {
    let mut output = String::new();

    if result.is_approved() {
        output.push_str("=== You're approved ===\n\n");
    } else {
        output.push_str("=== We need to do further verification ===\n\n");
        output.push_str(&format!("Status: {}\n", result.status));
        output.push_str(&format!(
            "Please call us at {} and reference {}.\n\n",
            support.phone, support.reference_code
        ));
    }

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    for (label, value) in summary_rows(result) {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    output.push_str(&table.to_string());
    output.push('\n');

    match &result.checks.source {
        CheckSource::Complete { location } => {
            output.push_str(&format!("\nIntegrity checks from {location}\n"));
        }
        CheckSource::Partial { locations } => {
            output.push_str(&format!(
                "\nIntegrity checks combined from {}\n",
                locations.join(", ")
            ));
        }
        CheckSource::None => {}
    }

    if let Some(url) = &result.dashboard_url {
        output.push_str(&format!("Dashboard: {url}\n"));
    }
    output.push_str(&format!("Reconciled at {}\n", result.reconciled_at));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IntegrityChecks, RunHandle, VerificationStatus};

    fn support() -> SupportInfo {
        SupportInfo {
            phone: "1 (800) 999-0000".into(),
            reference_code: "REF-1".into(),
        }
    }

    fn result(status: VerificationStatus) -> CanonicalResult {
        CanonicalResult {
            status,
            sub_result: None,
            full_name: Some("Jane Smith".into()),
            address: None,
            gender: None,
            date_of_birth: Some("1990-04-12".into()),
            document_type: None,
            document_number: None,
            date_of_expiry: None,
            workflow_run_id: "run-1".into(),
            dashboard_url: None,
            checks: IntegrityChecks::default(),
            raw_webhook: None,
            reconciled_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn test_approved_result() {
        let out = render_result(&result(VerificationStatus::Approved), &support());
        assert!(out.contains("You're approved"));
        assert!(out.contains("Jane Smith"));
        assert!(out.contains("run-1"));
        assert!(!out.contains("REF-1"));
    }

    #[test]
    fn test_review_result_shows_support() {
        let out = render_result(&result(VerificationStatus::Review), &support());
        assert!(out.contains("further verification"));
        assert!(out.contains("Status: review"));
        assert!(out.contains("REF-1"));
    }

    #[test]
    fn test_views() {
        assert!(render_view(&FlowState::Home, &support()).contains("Identity verification"));
        assert!(
            render_view(
                &FlowState::Form {
                    validation_error: Some("bad phone".into())
                },
                &support()
            )
            .contains("! bad phone")
        );
        let capture = FlowState::Capture {
            run: RunHandle {
                run_id: "run-1".into(),
                sdk_token: "tok".into(),
            },
        };
        assert!(render_view(&capture, &support()).contains("run-1"));
        assert!(
            render_view(
                &FlowState::Error {
                    message: "Timeout".into()
                },
                &support()
            )
            .contains("Timeout")
        );
    }
}
