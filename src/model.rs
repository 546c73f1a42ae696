use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FlowError;

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[0-9]{9,15}$").expect("valid phone pattern"));

/// Details typed into the applicant form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub citizen: bool,
}

impl ApplicantInput {
    /// Check required fields and return a copy with trimmed names and a
    /// normalized phone number.
    pub fn validated(&self) -> Result<ApplicantInput, FlowError> {
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        if first_name.is_empty() {
            return Err(FlowError::Validation("First name is required".into()));
        }
        if last_name.is_empty() {
            return Err(FlowError::Validation("Last name is required".into()));
        }

        let phone = match self.phone.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(normalize_phone(raw)?),
            _ => None,
        };

        Ok(ApplicantInput {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: self
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from),
            phone,
            citizen: self.citizen,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Normalize a user-entered phone number to `+` followed by 9-15 digits.
pub fn normalize_phone(raw: &str) -> Result<String, FlowError> {
    let mut compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
        .collect();

    if let Some(rest) = compact.strip_prefix("00") {
        compact = format!("+{rest}");
    } else if !compact.starts_with('+') {
        compact.insert(0, '+');
    }

    if E164.is_match(&compact) {
        Ok(compact)
    } else {
        Err(FlowError::Validation(format!(
            "Phone number '{raw}' must be in international format: + followed by 9 to 15 digits"
        )))
    }
}

/// Identifies a remote verification run and its capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    pub run_id: String,
    pub sdk_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Approved,
    Review,
    Declined,
    Abandoned,
    Other(String),
}

impl VerificationStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approved" => Self::Approved,
            "review" => Self::Review,
            "declined" => Self::Declined,
            "abandoned" => Self::Abandoned,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Approved => "approved",
            Self::Review => "review",
            Self::Declined => "declined",
            Self::Abandoned => "abandoned",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Address {
    Structured {
        town: Option<String>,
        state: Option<String>,
        postcode: Option<String>,
        country: Option<String>,
    },
    FreeText {
        text: String,
    },
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Structured {
                town,
                state,
                postcode,
                country,
            } => {
                let parts: Vec<&str> = [town, state, postcode, country]
                    .into_iter()
                    .filter_map(|p| p.as_deref())
                    .collect();
                f.write_str(&parts.join(", "))
            }
            Address::FreeText { text } => f.write_str(text),
        }
    }
}

pub const UNKNOWN_VERDICT: &str = "unknown";

/// Where the integrity-check verdicts were taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum CheckSource {
    /// One candidate held all three verdicts.
    Complete { location: String },
    /// Verdicts were filled per field from several candidates.
    Partial { locations: Vec<String> },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityChecks {
    pub visual_authenticity: String,
    pub digital_tampering: String,
    pub security_features: String,
    pub source: CheckSource,
}

impl Default for IntegrityChecks {
    fn default() -> Self {
        Self {
            visual_authenticity: UNKNOWN_VERDICT.into(),
            digital_tampering: UNKNOWN_VERDICT.into(),
            security_features: UNKNOWN_VERDICT.into(),
            source: CheckSource::None,
        }
    }
}

/// The reconciled outcome of a run. Built once by the reconciler and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub status: VerificationStatus,
    pub sub_result: Option<String>,
    pub full_name: Option<String>,
    pub address: Option<Address>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub date_of_expiry: Option<String>,
    pub workflow_run_id: String,
    pub dashboard_url: Option<String>,
    pub checks: IntegrityChecks,
    pub raw_webhook: Option<serde_json::Value>,
    pub reconciled_at: String,
}

impl CanonicalResult {
    pub fn is_approved(&self) -> bool {
        self.status == VerificationStatus::Approved
    }
}
