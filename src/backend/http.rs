use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Applicant, Backend, CreatedWorkflowRun, NewApplicant, NewWorkflowRun};

/// Backend reached over HTTP at `<origin>/api/...`.
pub struct HttpBackend {
    client: Client,
    origin: Url,
}

impl HttpBackend {
    pub fn new(origin: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("idv-flow/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let origin = Url::parse(origin)
            .map_err(|e| anyhow::anyhow!("Invalid API URL '{origin}': {e}"))?;
        if origin.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL '{origin}': not an http(s) origin");
        }
        Ok(Self { client, origin })
    }

    /// `<origin>/api/<segments...>`; reqwest's URL type percent-encodes
    /// each segment.
    fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.origin.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL {} cannot take a path", self.origin))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn request<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> anyhow::Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self
            .client
            .request(method.clone(), url.clone())
            .header("Accept", "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let data: Value = serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Default::default()));

        if !status.is_success() {
            tracing::debug!("{} {} returned HTTP {}", method, url, status);
            anyhow::bail!(error_message(&data));
        }

        Ok(serde_json::from_value(data)?)
    }
}

/// Message for a failed call: the body's `error` string, else the body itself.
fn error_message(body: &Value) -> String {
    match body.get("error") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => body.to_string(),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_applicant(&self, applicant: &NewApplicant) -> anyhow::Result<Applicant> {
        self.request(Method::POST, self.url(&["applicants"])?, Some(applicant))
            .await
    }

    async fn create_workflow_run(
        &self,
        run: &NewWorkflowRun,
    ) -> anyhow::Result<CreatedWorkflowRun> {
        self.request(Method::POST, self.url(&["workflow_runs"])?, Some(run))
            .await
    }

    async fn workflow_run(&self, run_id: &str) -> anyhow::Result<Value> {
        self.request::<(), _>(Method::GET, self.url(&["workflow_runs", run_id])?, None)
            .await
    }

    async fn webhook_run(&self, run_id: &str) -> anyhow::Result<Value> {
        self.request::<(), _>(Method::GET, self.url(&["webhook_runs", run_id])?, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_url_building() {
        let backend = HttpBackend::new("https://api.example.com/").unwrap();
        assert_eq!(
            backend.url(&["applicants"]).unwrap().as_str(),
            "https://api.example.com/api/applicants"
        );
        assert_eq!(
            backend.url(&["webhook_runs", "run 1/2"]).unwrap().as_str(),
            "https://api.example.com/api/webhook_runs/run%201%2F2"
        );

        let prefixed = HttpBackend::new("https://example.com/idv").unwrap();
        assert_eq!(
            prefixed.url(&["workflow_runs", "r-1"]).unwrap().as_str(),
            "https://example.com/idv/api/workflow_runs/r-1"
        );
    }

    #[test]
    fn test_rejects_unusable_origin() {
        assert!(HttpBackend::new("not a url").is_err());
        assert!(HttpBackend::new("mailto:ops@example.com").is_err());
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(&json!({"error": "applicant rejected"})),
            "applicant rejected"
        );
        assert_eq!(
            error_message(&json!({"error": {"code": 422}})),
            r#"{"code":422}"#
        );
        assert_eq!(
            error_message(&json!({"detail": "nope"})),
            r#"{"detail":"nope"}"#
        );
        assert_eq!(error_message(&json!({})), "{}");
    }
}
