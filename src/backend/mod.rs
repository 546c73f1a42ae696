pub mod dummy;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ApplicantInput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplicant {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl From<&ApplicantInput> for NewApplicant {
    fn from(input: &ApplicantInput) -> Self {
        Self {
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
            phone_number: input.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Applicant {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflowRun {
    pub workflow_id: String,
    pub applicant_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedWorkflowRun {
    pub id: String,
    pub sdk_token: String,
}

/// Remote verification API.
///
/// Run and webhook records are returned as raw JSON: their shape varies with
/// the check template that produced them, and the reconciler reads them
/// leniently.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn create_applicant(&self, applicant: &NewApplicant) -> anyhow::Result<Applicant>;
    async fn create_workflow_run(&self, run: &NewWorkflowRun)
    -> anyhow::Result<CreatedWorkflowRun>;
    async fn workflow_run(&self, run_id: &str) -> anyhow::Result<Value>;
    /// Fails while the webhook for `run_id` has not been delivered yet.
    async fn webhook_run(&self, run_id: &str) -> anyhow::Result<Value>;
}
