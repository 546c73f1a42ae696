pub mod html;
pub mod json;
pub mod terminal;

use crate::model::CanonicalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(format: &str) -> Self {
        match format {
            "json" => OutputFormat::Json,
            "html" => OutputFormat::Html,
            _ => OutputFormat::Terminal,
        }
    }
}

/// Contact details shown when a result is not approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportInfo {
    pub phone: String,
    pub reference_code: String,
}

impl SupportInfo {
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self {
            phone: settings.support_phone.clone(),
            reference_code: settings.reference_code.clone(),
        }
    }
}

/// Labelled rows of the result summary, in display order. Missing values
/// render as an em dash.
pub fn summary_rows(result: &CanonicalResult) -> Vec<(&'static str, String)> {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "\u{2014}".to_string());
    let mut rows = vec![
        ("Verification status", result.status.to_string()),
        ("Sub-result", or_dash(&result.sub_result)),
        ("Full name", or_dash(&result.full_name)),
        (
            "Address",
            result
                .address
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "\u{2014}".to_string()),
        ),
        ("Gender", or_dash(&result.gender)),
        ("Date of birth", or_dash(&result.date_of_birth)),
        ("Document number", or_dash(&result.document_number)),
        ("Document type", or_dash(&result.document_type)),
        ("Date of expiry", or_dash(&result.date_of_expiry)),
        (
            "Visual authenticity",
            result.checks.visual_authenticity.clone(),
        ),
        ("Digital tampering", result.checks.digital_tampering.clone()),
        ("Security features", result.checks.security_features.clone()),
    ];
    if !result.workflow_run_id.is_empty() {
        rows.push(("Workflow run", result.workflow_run_id.clone()));
    }
    rows
}

pub fn render_result(
    result: &CanonicalResult,
    support: &SupportInfo,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Terminal => Ok(terminal::render_result(result, support)),
        OutputFormat::Json => json::render(result),
        OutputFormat::Html => Ok(html::render(result, support)),
    }
}
