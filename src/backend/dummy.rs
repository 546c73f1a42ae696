use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Applicant, Backend, CreatedWorkflowRun, NewApplicant, NewWorkflowRun};

/// In-memory backend that replays scripted responses.
///
/// Used by the `demo` command and by tests to drive the flow without a
/// server. Webhook polls consume `webhook_script` front to back; `None`
/// entries behave like a 404 (not delivered yet). Once the script is empty,
/// the last entry keeps being returned.
pub struct DummyBackend {
    run_id: String,
    run_error: Option<String>,
    run_record: Option<Value>,
    webhook_record: Option<Value>,
    webhook_script: Mutex<VecDeque<Option<Value>>>,
    last_webhook: Mutex<Option<Value>>,
    calls: CallCounts,
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub applicants: AtomicUsize,
    pub workflow_runs: AtomicUsize,
    pub run_lookups: AtomicUsize,
    pub webhook_polls: AtomicUsize,
}

impl CallCounts {
    #[cfg(test)]
    pub fn total(&self) -> usize {
        self.applicants.load(Ordering::SeqCst)
            + self.workflow_runs.load(Ordering::SeqCst)
            + self.run_lookups.load(Ordering::SeqCst)
            + self.webhook_polls.load(Ordering::SeqCst)
    }
}

impl DummyBackend {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_error: None,
            run_record: None,
            webhook_record: None,
            webhook_script: Mutex::new(VecDeque::new()),
            last_webhook: Mutex::new(None),
            calls: CallCounts::default(),
        }
    }

    /// A backend whose run settles with `status` after `pending_polls`
    /// undelivered webhook polls.
    pub fn settling(run_id: &str, status: &str, pending_polls: usize) -> Self {
        let webhook = sample_webhook(run_id, status);
        let mut script: Vec<Option<Value>> = vec![None; pending_polls];
        script.push(Some(webhook.clone()));
        Self::new(run_id)
            .with_webhook_script(script)
            .with_webhook_record(webhook)
            .with_run_record(sample_run(run_id, status))
    }

    pub fn with_run_error(mut self, message: &str) -> Self {
        self.run_error = Some(message.to_string());
        self
    }

    pub fn with_run_record(mut self, record: Value) -> Self {
        self.run_record = Some(record);
        self
    }

    pub fn with_webhook_record(mut self, record: Value) -> Self {
        self.webhook_record = Some(record);
        self
    }

    pub fn with_webhook_script(self, script: Vec<Option<Value>>) -> Self {
        if let Ok(mut queue) = self.webhook_script.lock() {
            queue.extend(script);
        }
        self
    }

    #[cfg(test)]
    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }
}

#[async_trait]
impl Backend for DummyBackend {
    async fn create_applicant(&self, applicant: &NewApplicant) -> anyhow::Result<Applicant> {
        self.calls.applicants.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            "dummy backend: applicant {} {}",
            applicant.first_name,
            applicant.last_name
        );
        Ok(Applicant {
            id: format!("applicant-{}", uuid::Uuid::new_v4()),
        })
    }

    async fn create_workflow_run(
        &self,
        run: &NewWorkflowRun,
    ) -> anyhow::Result<CreatedWorkflowRun> {
        self.calls.workflow_runs.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.run_error {
            anyhow::bail!("{message}");
        }
        tracing::debug!(
            "dummy backend: run for workflow {} / {}",
            run.workflow_id,
            run.applicant_id
        );
        Ok(CreatedWorkflowRun {
            id: self.run_id.clone(),
            sdk_token: format!("sdk-{}", uuid::Uuid::new_v4()),
        })
    }

    async fn workflow_run(&self, run_id: &str) -> anyhow::Result<Value> {
        self.calls.run_lookups.fetch_add(1, Ordering::SeqCst);
        match &self.run_record {
            Some(record) if run_id == self.run_id => Ok(record.clone()),
            _ => anyhow::bail!("Workflow run '{run_id}' not found"),
        }
    }

    async fn webhook_run(&self, run_id: &str) -> anyhow::Result<Value> {
        self.calls.webhook_polls.fetch_add(1, Ordering::SeqCst);
        if run_id != self.run_id {
            anyhow::bail!("No webhook for run '{run_id}'");
        }

        let mut queue = self
            .webhook_script
            .lock()
            .map_err(|_| anyhow::anyhow!("webhook script lock poisoned"))?;
        let mut last = self
            .last_webhook
            .lock()
            .map_err(|_| anyhow::anyhow!("webhook script lock poisoned"))?;

        let next = match queue.pop_front() {
            Some(entry) => {
                *last = entry.clone();
                entry
            }
            // Script exhausted: a scripted poller sees the last entry again,
            // a plain lookup sees the stored record.
            None => last.clone().or_else(|| self.webhook_record.clone()),
        };

        next.ok_or_else(|| anyhow::anyhow!("Webhook for run '{run_id}' not delivered yet"))
    }
}

/// A webhook payload shaped like the ones the verification provider sends.
pub fn sample_webhook(run_id: &str, status: &str) -> Value {
    json!({
        "workflow_run_id": run_id,
        "status": status,
        "result": if status == "approved" { "clear" } else { "consider" },
        "raw_output": {
            "first_name": "Jane",
            "last_name": "Smith",
            "gender": "female",
            "date_of_birth": "1990-04-12",
            "document_type": "passport",
            "document_number": "X1234567",
            "date_expiry": "2031-04-11",
            "address": {
                "town": "Cluj-Napoca",
                "postcode": "400001",
                "country": "ROU"
            },
            "breakdown": {
                "visual_authenticity": {
                    "result": if status == "approved" { "clear" } else { "consider" },
                    "breakdown": {
                        "digital_tampering": { "result": "clear" },
                        "security_features": {
                            "result": if status == "approved" { "clear" } else { "consider" }
                        }
                    }
                }
            }
        }
    })
}

/// A workflow-run record as returned by the run lookup endpoint.
pub fn sample_run(run_id: &str, status: &str) -> Value {
    json!({
        "workflow_run_id": run_id,
        "status": status,
        "full_name": "Jane Smith",
        "dashboard_url": format!("https://dashboard.example.com/workflow_runs/{run_id}"),
        "output": {
            "sub_result": if status == "approved" { "clear" } else { "consider" }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_repeat_last() {
        let backend = DummyBackend::new("run-1").with_webhook_script(vec![
            None,
            Some(json!({"status": "processing"})),
        ]);
        assert!(backend.webhook_run("run-1").await.is_err());
        assert_eq!(
            backend.webhook_run("run-1").await.unwrap()["status"],
            "processing"
        );
        assert_eq!(
            backend.webhook_run("run-1").await.unwrap()["status"],
            "processing"
        );
        assert_eq!(backend.calls().webhook_polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_creation_error() {
        let backend = DummyBackend::new("run-1").with_run_error("workflow not found");
        let applicant = backend
            .create_applicant(&NewApplicant {
                first_name: "Jane".into(),
                last_name: "Smith".into(),
                email: None,
                phone_number: None,
            })
            .await
            .unwrap();
        let err = backend
            .create_workflow_run(&NewWorkflowRun {
                workflow_id: "wf".into(),
                applicant_id: applicant.id,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "workflow not found");
        assert_eq!(backend.calls().total(), 2);
    }

    #[tokio::test]
    async fn test_settling_backend() {
        let backend = DummyBackend::settling("run-9", "approved", 2);
        assert!(backend.webhook_run("run-9").await.is_err());
        assert!(backend.webhook_run("run-9").await.is_err());
        let webhook = backend.webhook_run("run-9").await.unwrap();
        assert_eq!(webhook["status"], "approved");
        let run = backend.workflow_run("run-9").await.unwrap();
        assert_eq!(run["full_name"], "Jane Smith");
        assert!(backend.workflow_run("other").await.is_err());
    }
}
