use std::time::Duration;

use crate::error::FlowError;

pub const DEFAULT_POLL_ATTEMPTS: u32 = 100;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_CHECK_TEMPLATES: &[&str] = &["document_check", "document_verification"];
pub const DEFAULT_SUPPORT_PHONE: &str = "1 (800) 999-0000";
pub const DEFAULT_REFERENCE_CODE: &str = "Onboarding Verification 05jx1-0fmt";

/// Mount point handed to the capture widget.
pub const CAPTURE_CONTAINER_ID: &str = "capture-mount";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub workflow_id: String,
    pub poll: PollPolicy,
    pub check_templates: Vec<String>,
    pub support_phone: String,
    pub reference_code: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            workflow_id: String::new(),
            poll: PollPolicy::default(),
            check_templates: DEFAULT_CHECK_TEMPLATES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            support_phone: DEFAULT_SUPPORT_PHONE.into(),
            reference_code: DEFAULT_REFERENCE_CODE.into(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, FlowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FlowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();

        let max_attempts = match get("IDV_POLL_ATTEMPTS") {
            Some(v) => parse_number::<u32>("IDV_POLL_ATTEMPTS", &v)?,
            None => defaults.poll.max_attempts,
        };
        if max_attempts == 0 {
            return Err(FlowError::Config(
                "IDV_POLL_ATTEMPTS must be at least 1".into(),
            ));
        }
        let interval = match get("IDV_POLL_INTERVAL_MS") {
            Some(v) => Duration::from_millis(parse_number::<u64>("IDV_POLL_INTERVAL_MS", &v)?),
            None => defaults.poll.interval,
        };

        let check_templates = match get("IDV_CHECK_TEMPLATES") {
            Some(v) => v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.check_templates,
        };

        Ok(Self {
            api_url: get("IDV_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            workflow_id: get("IDV_WORKFLOW_ID").unwrap_or_default(),
            poll: PollPolicy {
                max_attempts,
                interval,
            },
            check_templates,
            support_phone: get("IDV_SUPPORT_PHONE").unwrap_or(defaults.support_phone),
            reference_code: get("IDV_REFERENCE_CODE").unwrap_or(defaults.reference_code),
        })
    }

    pub fn require_api_url(&self) -> Result<&str, FlowError> {
        if self.api_url.is_empty() {
            return Err(FlowError::Config("IDV_API_URL is not set".into()));
        }
        Ok(&self.api_url)
    }

    pub fn require_workflow_id(&self) -> Result<&str, FlowError> {
        if self.workflow_id.is_empty() {
            return Err(FlowError::Config("IDV_WORKFLOW_ID is not set".into()));
        }
        Ok(&self.workflow_id)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, FlowError> {
    value
        .parse::<T>()
        .map_err(|_| FlowError::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, FlowError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings_from(&[]).unwrap();
        assert_eq!(s.poll.max_attempts, 100);
        assert_eq!(s.poll.interval, Duration::from_millis(5000));
        assert_eq!(s.check_templates, vec!["document_check", "document_verification"]);
        assert!(s.require_api_url().is_err());
        assert!(s.require_workflow_id().is_err());
    }

    #[test]
    fn test_overrides() {
        let s = settings_from(&[
            ("IDV_API_URL", "https://api.example.com/"),
            ("IDV_WORKFLOW_ID", "wf-1"),
            ("IDV_POLL_ATTEMPTS", "7"),
            ("IDV_POLL_INTERVAL_MS", "250"),
            ("IDV_CHECK_TEMPLATES", " doc_a , ,doc_b"),
        ])
        .unwrap();
        assert_eq!(s.require_api_url().unwrap(), "https://api.example.com");
        assert_eq!(s.require_workflow_id().unwrap(), "wf-1");
        assert_eq!(s.poll.max_attempts, 7);
        assert_eq!(s.poll.interval, Duration::from_millis(250));
        assert_eq!(s.check_templates, vec!["doc_a", "doc_b"]);
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(
            settings_from(&[("IDV_POLL_ATTEMPTS", "many")]),
            Err(FlowError::Config(_))
        ));
        assert!(matches!(
            settings_from(&[("IDV_POLL_ATTEMPTS", "0")]),
            Err(FlowError::Config(_))
        ));
        assert!(matches!(
            settings_from(&[("IDV_POLL_INTERVAL_MS", "-5")]),
            Err(FlowError::Config(_))
        ));
    }
}
