use std::path::Path;

use serde_json::Value;

use crate::config::Settings;
use crate::model::CanonicalResult;
use crate::reconcile::checks::default_rules;
use crate::reconcile::{is_terminal, merge};
use crate::render::{OutputFormat, SupportInfo, render_result};

pub fn inspect(
    settings: &Settings,
    webhook_path: &str,
    run_path: Option<&str>,
    format: &str,
) -> anyhow::Result<()> {
    let (terminal, result) = reconcile_files(settings, Path::new(webhook_path), run_path.map(Path::new))?;

    if !terminal {
        println!("Note: this webhook payload would not end polling (not terminal yet).\n");
    }
    let rendered = render_result(
        &result,
        &SupportInfo::from_settings(settings),
        OutputFormat::parse(format),
    )?;
    println!("{rendered}");
    Ok(())
}

/// Merge saved payloads exactly as a live run would be merged. Returns
/// whether the webhook payload counts as terminal, and the result.
pub fn reconcile_files(
    settings: &Settings,
    webhook_path: &Path,
    run_path: Option<&Path>,
) -> anyhow::Result<(bool, CanonicalResult)> {
    let webhook = read_json(webhook_path)?;
    let run = match run_path {
        Some(path) => read_json(path)?,
        None => Value::Object(Default::default()),
    };

    let rules = default_rules(&settings.check_templates);
    let run_id = ["workflow_run_id", "id"]
        .iter()
        .find_map(|k| webhook.get(*k).or_else(|| run.get(*k)).and_then(Value::as_str))
        .unwrap_or("-")
        .to_string();

    let terminal = is_terminal(&webhook, &rules);
    let result = merge::merge(&run_id, &run, Some(&webhook), None, &rules);
    Ok((terminal, result))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Could not read {}: {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("{} is not valid JSON: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::dummy::{sample_run, sample_webhook};
    use crate::model::{CheckSource, VerificationStatus};

    #[test]
    fn test_reconcile_saved_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let webhook_path = dir.path().join("webhook.json");
        let run_path = dir.path().join("run.json");
        std::fs::write(&webhook_path, sample_webhook("run-5", "review").to_string()).unwrap();
        std::fs::write(&run_path, sample_run("run-5", "review").to_string()).unwrap();

        let (terminal, result) =
            reconcile_files(&Settings::default(), &webhook_path, Some(&run_path)).unwrap();
        assert!(terminal);
        assert_eq!(result.status, VerificationStatus::Review);
        assert_eq!(result.workflow_run_id, "run-5");
        assert_eq!(result.checks.security_features, "consider");
        assert_eq!(
            result.dashboard_url.as_deref(),
            Some("https://dashboard.example.com/workflow_runs/run-5")
        );
    }

    #[test]
    fn test_partial_breakdown_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let webhook_path = dir.path().join("webhook.json");
        std::fs::write(
            &webhook_path,
            json!({
                "status": "review",
                "raw_output": { "first_name": "Jane" },
                "document_breakdown": { "visual_authenticity": "consider" }
            })
            .to_string(),
        )
        .unwrap();

        let (terminal, result) = reconcile_files(&Settings::default(), &webhook_path, None).unwrap();
        // A document_breakdown block is supporting data for a review.
        assert!(terminal);
        assert_eq!(result.full_name.as_deref(), Some("Jane"));
        assert_eq!(
            result.checks.source,
            CheckSource::Partial {
                locations: vec!["document_breakdown".into()]
            }
        );
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let webhook_path = dir.path().join("webhook.json");
        std::fs::write(&webhook_path, "{not json").unwrap();
        let err = reconcile_files(&Settings::default(), &webhook_path, None).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }
}
