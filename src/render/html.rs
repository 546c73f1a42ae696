use super::{SupportInfo, summary_rows};
use crate::model::CanonicalResult;

pub fn render(result: &CanonicalResult, support: &SupportInfo) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>Verification Result</title>\n");
    html.push_str("<style>\n");
    html.push_str("  body { font-family: system-ui, sans-serif; max-width: 760px; margin: 2rem auto; padding: 0 1rem; color: #1a1a1a; }\n");
    html.push_str("  table { border-collapse: collapse; width: 100%; margin: 1rem 0; }\n");
    html.push_str("  th, td { border: 1px solid #ddd; padding: 0.5rem; text-align: left; }\n");
    html.push_str("  th { background: #f5f5f5; font-weight: 600; width: 35%; }\n");
    html.push_str("  .notice { background: #fff1f2; border: 1px solid #fecdd3; color: #9f1239; padding: 1rem; border-radius: 8px; }\n");
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    if result.is_approved() {
        html.push_str("<h1>You're approved</h1>\n");
    } else {
        html.push_str("<h1>We need to do further verification</h1>\n");
        html.push_str(&format!(
            "<div class=\"notice\"><p><strong>Status: {}</strong></p><p>Please call us at <strong>{}</strong> and reference <strong>{}</strong>.</p></div>\n",
            escape(result.status.as_str()),
            escape(&support.phone),
            escape(&support.reference_code)
        ));
    }

    html.push_str("<table>\n");
    for (label, value) in summary_rows(result) {
        html.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            escape(label),
            escape(&value)
        ));
    }
    html.push_str("</table>\n");

    if let Some(url) = result.dashboard_url.as_deref().filter(|u| is_web_link(u)) {
        html.push_str(&format!(
            "<p><a href=\"{}\" target=\"_blank\" rel=\"noreferrer\">Open in dashboard</a></p>\n",
            escape(url)
        ));
    }
    html.push_str(&format!(
        "<p>Reconciled at {}</p>\n",
        escape(&result.reconciled_at)
    ));
    html.push_str("</body>\n</html>\n");

    html
}

/// Only plain web links become anchors; other schemes are dropped.
fn is_web_link(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IntegrityChecks, VerificationStatus};

    fn declined(dashboard_url: Option<&str>) -> CanonicalResult {
        CanonicalResult {
            status: VerificationStatus::Declined,
            sub_result: Some("rejected".into()),
            full_name: Some("<script>alert(1)</script>".into()),
            address: None,
            gender: None,
            date_of_birth: None,
            document_type: None,
            document_number: None,
            date_of_expiry: None,
            workflow_run_id: "run-1".into(),
            dashboard_url: dashboard_url.map(String::from),
            checks: IntegrityChecks::default(),
            raw_webhook: None,
            reconciled_at: "now".into(),
        }
    }

    fn support() -> SupportInfo {
        SupportInfo {
            phone: "1 (800) 999-0000".into(),
            reference_code: "REF".into(),
        }
    }

    #[test]
    fn test_render_escapes_values() {
        let html = render(&declined(Some("https://d/?a=1&b=2")), &support());
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Status: declined"));
        assert!(html.contains("a=1&amp;b=2"));
    }

    #[test]
    fn test_dashboard_link_requires_web_scheme() {
        let html = render(&declined(Some("javascript:alert(1)")), &support());
        assert!(!html.contains("javascript:"));
        assert!(!html.contains("Open in dashboard"));

        let html = render(&declined(Some("HTTP://dashboard.example.com/runs/1")), &support());
        assert!(html.contains("href=\"HTTP://dashboard.example.com/runs/1\""));
    }
}
