pub mod checks;
pub mod merge;
pub mod poll;

use std::sync::Arc;

use serde_json::Value;

pub use poll::{CancelToken, PollError};

use crate::backend::Backend;
use crate::config::{PollPolicy, Settings};
use crate::error::FlowError;
use crate::model::{ApplicantInput, CanonicalResult, VerificationStatus};
use checks::CheckRule;

/// A webhook payload is terminal when its status is final and it carries
/// raw output. `review` also needs a breakdown or an explicit result, since
/// the provider may deliver a bare review event before the detailed one.
pub fn is_terminal(payload: &Value, rules: &[CheckRule]) -> bool {
    let Some(status) = payload
        .get("status")
        .and_then(Value::as_str)
        .map(VerificationStatus::parse)
        .filter(VerificationStatus::is_terminal)
    else {
        return false;
    };

    if !poll::is_populated(payload.get("raw_output")) {
        return false;
    }

    if status == VerificationStatus::Review {
        let raw_output = payload.get("raw_output");
        let explicit_result = [
            payload.get("result"),
            payload.get("sub_result"),
            raw_output.and_then(|r| r.get("result")),
            raw_output.and_then(|r| r.get("sub_result")),
        ]
        .into_iter()
        .any(poll::is_populated);
        return explicit_result || checks::has_breakdown_data(rules, payload);
    }

    true
}

/// Waits for the webhook of a run to settle, then assembles the result.
pub struct Reconciler {
    backend: Arc<dyn Backend>,
    policy: PollPolicy,
    rules: Vec<CheckRule>,
}

impl Reconciler {
    pub fn new(backend: Arc<dyn Backend>, settings: &Settings) -> Self {
        Self {
            backend,
            policy: settings.poll,
            rules: checks::default_rules(&settings.check_templates),
        }
    }

    pub fn is_terminal(&self, payload: &Value) -> bool {
        is_terminal(payload, &self.rules)
    }

    /// Poll the webhook lookup until a terminal payload shows up, the attempt
    /// budget runs out, or `cancel` fires. Lookup failures count as "not yet".
    pub async fn poll_until_terminal(
        &self,
        run_id: &str,
        cancel: &CancelToken,
    ) -> Result<Value, PollError> {
        let attempts = self.policy.max_attempts;
        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                r = self.backend.webhook_run(run_id) => r,
            };

            match response {
                Ok(payload) if self.is_terminal(&payload) => {
                    tracing::info!(
                        "webhook for run {} terminal on attempt {}/{}",
                        run_id,
                        attempt,
                        attempts
                    );
                    return Ok(payload);
                }
                Ok(payload) => {
                    let status = payload.get("status").and_then(Value::as_str).unwrap_or("none");
                    tracing::debug!(
                        "attempt {}/{}: webhook status {} not terminal yet",
                        attempt,
                        attempts,
                        status
                    );
                }
                Err(e) => tracing::debug!("attempt {}/{}: {}", attempt, attempts, e),
            }

            if attempt < attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PollError::Cancelled),
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }
        }

        tracing::warn!("no terminal webhook for run {} after {} attempt(s)", run_id, attempts);
        Err(PollError::Timeout { attempts })
    }

    /// Read the run and its webhook concurrently and merge them. The webhook
    /// read is best-effort. A failed re-read does not leave the webhook layer
    /// empty: `terminal` (the payload the poll loop settled on) stands in for
    /// it, so identity fields and checks seen during polling survive. Pass
    /// `None` to merge without a webhook layer in that case.
    pub async fn fetch_and_merge(
        &self,
        run_id: &str,
        applicant: Option<&ApplicantInput>,
        terminal: Option<Value>,
    ) -> Result<CanonicalResult, FlowError> {
        let (run, webhook) = tokio::join!(
            self.backend.workflow_run(run_id),
            self.backend.webhook_run(run_id)
        );

        let run = run.map_err(|e| FlowError::Fetch(e.to_string()))?;
        let webhook = match webhook {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!("webhook lookup for run {} failed: {}", run_id, e);
                terminal
            }
        };

        Ok(merge::merge(
            run_id,
            &run,
            webhook.as_ref(),
            applicant,
            &self.rules,
        ))
    }
}
