//! Integrity-check extraction.
//!
//! The provider reports the visual-authenticity, digital-tampering and
//! security-features verdicts in different places depending on which check
//! template produced the payload. Extraction walks an ordered list of
//! candidate locations twice: first looking for a single candidate that
//! carries all three verdicts, then filling missing verdicts one by one.

use serde_json::Value;

use crate::model::{CheckSource, IntegrityChecks, UNKNOWN_VERDICT};

/// A place where a breakdown may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakdownSource {
    /// `breakdowns[<template id>]` on the webhook payload.
    Template(String),
    /// `document_breakdown` on the webhook payload.
    DocumentBreakdown,
    /// `breakdown` on the webhook payload.
    WebhookBreakdown,
    /// `raw_output.breakdown` on the webhook payload.
    RawOutputBreakdown,
    /// `output.breakdown` on the run record.
    RunOutputBreakdown,
}

impl BreakdownSource {
    pub fn label(&self) -> String {
        match self {
            Self::Template(id) => format!("breakdowns.{id}"),
            Self::DocumentBreakdown => "document_breakdown".into(),
            Self::WebhookBreakdown => "breakdown".into(),
            Self::RawOutputBreakdown => "raw_output.breakdown".into(),
            Self::RunOutputBreakdown => "run.output.breakdown".into(),
        }
    }

    pub fn locate<'a>(&self, webhook: Option<&'a Value>, run: Option<&'a Value>) -> Option<&'a Value> {
        let found = match self {
            Self::Template(id) => webhook?.get("breakdowns")?.get(id.as_str()),
            Self::DocumentBreakdown => webhook?.get("document_breakdown"),
            Self::WebhookBreakdown => webhook?.get("breakdown"),
            Self::RawOutputBreakdown => webhook?.get("raw_output")?.get("breakdown"),
            Self::RunOutputBreakdown => run?.get("output")?.get("breakdown"),
        }?;
        let found = found.as_object().map(|_| found)?;
        Some(unwrap_report(found))
    }
}

/// A template report wraps its breakdown as `{ result, breakdown: {...} }`.
fn unwrap_report(candidate: &Value) -> &Value {
    let holds_checks = Check::ALL.iter().any(|c| candidate.get(c.key()).is_some());
    match candidate.get("breakdown") {
        Some(inner) if !holds_checks && inner.is_object() => inner,
        _ => candidate,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    VisualAuthenticity,
    DigitalTampering,
    SecurityFeatures,
}

impl Check {
    const ALL: [Check; 3] = [
        Check::VisualAuthenticity,
        Check::DigitalTampering,
        Check::SecurityFeatures,
    ];

    fn key(self) -> &'static str {
        match self {
            Check::VisualAuthenticity => "visual_authenticity",
            Check::DigitalTampering => "digital_tampering",
            Check::SecurityFeatures => "security_features",
        }
    }

    /// Read this check's verdict from a breakdown. Tampering and security
    /// features are sub-checks of visual authenticity in most templates.
    fn read(self, breakdown: &Value) -> Option<String> {
        if let Some(v) = verdict(breakdown.get(self.key())) {
            return Some(v);
        }
        match self {
            Check::VisualAuthenticity => None,
            _ => verdict(
                breakdown
                    .get(Check::VisualAuthenticity.key())
                    .and_then(|va| va.get("breakdown"))
                    .and_then(|b| b.get(self.key())),
            ),
        }
    }
}

fn verdict(node: Option<&Value>) -> Option<String> {
    let text = match node? {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("result")?.as_str()?,
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Verdicts found so far; `None` means not yet seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialVerdicts {
    pub visual_authenticity: Option<String>,
    pub digital_tampering: Option<String>,
    pub security_features: Option<String>,
}

impl PartialVerdicts {
    fn read(breakdown: &Value) -> Self {
        Self {
            visual_authenticity: Check::VisualAuthenticity.read(breakdown),
            digital_tampering: Check::DigitalTampering.read(breakdown),
            security_features: Check::SecurityFeatures.read(breakdown),
        }
    }

    fn get(&self, check: Check) -> Option<&String> {
        match check {
            Check::VisualAuthenticity => self.visual_authenticity.as_ref(),
            Check::DigitalTampering => self.digital_tampering.as_ref(),
            Check::SecurityFeatures => self.security_features.as_ref(),
        }
    }

    fn slot(&mut self, check: Check) -> &mut Option<String> {
        match check {
            Check::VisualAuthenticity => &mut self.visual_authenticity,
            Check::DigitalTampering => &mut self.digital_tampering,
            Check::SecurityFeatures => &mut self.security_features,
        }
    }

    fn is_empty(&self) -> bool {
        self.visual_authenticity.is_none()
            && self.digital_tampering.is_none()
            && self.security_features.is_none()
    }

    fn into_checks(self, source: CheckSource) -> IntegrityChecks {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN_VERDICT.to_string());
        IntegrityChecks {
            visual_authenticity: or_unknown(self.visual_authenticity),
            digital_tampering: or_unknown(self.digital_tampering),
            security_features: or_unknown(self.security_features),
            source,
        }
    }
}

pub fn all_present(v: &PartialVerdicts) -> bool {
    v.visual_authenticity.is_some() && v.digital_tampering.is_some() && v.security_features.is_some()
}

/// One candidate location and the test for "this candidate is enough on its own".
#[derive(Debug, Clone)]
pub struct CheckRule {
    pub source: BreakdownSource,
    pub complete: fn(&PartialVerdicts) -> bool,
}

/// Candidate locations in priority order: configured templates, then the
/// generic breakdown fields.
pub fn default_rules(templates: &[String]) -> Vec<CheckRule> {
    templates
        .iter()
        .map(|t| BreakdownSource::Template(t.clone()))
        .chain([
            BreakdownSource::DocumentBreakdown,
            BreakdownSource::WebhookBreakdown,
            BreakdownSource::RawOutputBreakdown,
            BreakdownSource::RunOutputBreakdown,
        ])
        .map(|source| CheckRule {
            source,
            complete: all_present,
        })
        .collect()
}

pub fn extract_checks(rules: &[CheckRule], webhook: Option<&Value>, run: Option<&Value>) -> IntegrityChecks {
    let located: Vec<(&CheckRule, PartialVerdicts)> = rules
        .iter()
        .filter_map(|rule| {
            let breakdown = rule.source.locate(webhook, run)?;
            Some((rule, PartialVerdicts::read(breakdown)))
        })
        .collect();

    if let Some((rule, verdicts)) = located.iter().find(|(rule, v)| (rule.complete)(v)) {
        tracing::debug!("integrity checks from {}", rule.source.label());
        return verdicts.clone().into_checks(CheckSource::Complete {
            location: rule.source.label(),
        });
    }

    let mut merged = PartialVerdicts::default();
    let mut locations = Vec::new();
    for (rule, verdicts) in &located {
        let mut contributed = false;
        for check in Check::ALL {
            let slot = merged.slot(check);
            if slot.is_none()
                && let Some(found) = verdicts.get(check)
            {
                *slot = Some(found.clone());
                contributed = true;
            }
        }
        if contributed {
            locations.push(rule.source.label());
        }
    }

    if merged.is_empty() {
        return IntegrityChecks::default();
    }
    tracing::debug!("integrity checks filled from {}", locations.join(", "));
    merged.into_checks(CheckSource::Partial { locations })
}

/// Whether any candidate location on the webhook payload carries at least
/// one check verdict. An empty or verdict-less breakdown does not count.
pub fn has_breakdown_data(rules: &[CheckRule], webhook: &Value) -> bool {
    rules.iter().any(|rule| {
        rule.source
            .locate(Some(webhook), None)
            .is_some_and(|breakdown| !PartialVerdicts::read(breakdown).is_empty())
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rules() -> Vec<CheckRule> {
        default_rules(&["document_check".to_string()])
    }

    #[test]
    fn test_rule_order() {
        let labels: Vec<String> = rules().iter().map(|r| r.source.label()).collect();
        assert_eq!(
            labels,
            vec![
                "breakdowns.document_check",
                "document_breakdown",
                "breakdown",
                "raw_output.breakdown",
                "run.output.breakdown"
            ]
        );
    }

    #[test]
    fn test_complete_candidate_wins_over_earlier_partial() {
        let webhook = json!({
            "document_breakdown": {
                "visual_authenticity": { "result": "consider" }
            },
            "breakdown": {
                "visual_authenticity": { "result": "clear" },
                "digital_tampering": { "result": "clear" },
                "security_features": "clear"
            }
        });
        let checks = extract_checks(&rules(), Some(&webhook), None);
        assert_eq!(checks.visual_authenticity, "clear");
        assert_eq!(checks.digital_tampering, "clear");
        assert_eq!(checks.security_features, "clear");
        assert_eq!(
            checks.source,
            CheckSource::Complete {
                location: "breakdown".into()
            }
        );
    }

    #[test]
    fn test_partial_fill_first_found_wins() {
        let webhook = json!({
            "document_breakdown": {
                "visual_authenticity": { "result": "consider" }
            },
            "raw_output": {
                "breakdown": {
                    "visual_authenticity": { "result": "clear" },
                    "digital_tampering": { "result": "clear" }
                }
            }
        });
        let checks = extract_checks(&rules(), Some(&webhook), None);
        assert_eq!(checks.visual_authenticity, "consider");
        assert_eq!(checks.digital_tampering, "clear");
        assert_eq!(checks.security_features, UNKNOWN_VERDICT);
        assert_eq!(
            checks.source,
            CheckSource::Partial {
                locations: vec!["document_breakdown".into(), "raw_output.breakdown".into()]
            }
        );
    }

    #[test]
    fn test_only_raw_output_breakdown() {
        let webhook = json!({
            "status": "approved",
            "raw_output": {
                "breakdown": {
                    "visual_authenticity": {
                        "result": "clear",
                        "breakdown": {
                            "digital_tampering": { "result": "clear" },
                            "security_features": { "result": "consider" }
                        }
                    }
                }
            }
        });
        let run = json!({ "output": { "breakdown": {
            "visual_authenticity": { "result": "rejected" },
            "digital_tampering": { "result": "rejected" },
            "security_features": { "result": "rejected" }
        }}});
        let checks = extract_checks(&rules(), Some(&webhook), Some(&run));
        assert_eq!(checks.visual_authenticity, "clear");
        assert_eq!(checks.digital_tampering, "clear");
        assert_eq!(checks.security_features, "consider");
        assert_eq!(
            checks.source,
            CheckSource::Complete {
                location: "raw_output.breakdown".into()
            }
        );
    }

    #[test]
    fn test_template_report_is_unwrapped() {
        let webhook = json!({
            "breakdowns": {
                "document_check": {
                    "result": "clear",
                    "breakdown": {
                        "visual_authenticity": "clear",
                        "digital_tampering": "clear",
                        "security_features": "clear"
                    }
                },
                "other_template": {
                    "visual_authenticity": "rejected"
                }
            }
        });
        let checks = extract_checks(&rules(), Some(&webhook), None);
        assert_eq!(
            checks.source,
            CheckSource::Complete {
                location: "breakdowns.document_check".into()
            }
        );
        assert_eq!(checks.visual_authenticity, "clear");
    }

    #[test]
    fn test_nothing_found() {
        let webhook = json!({ "breakdown": "n/a", "raw_output": { "breakdown": {} } });
        assert_eq!(
            extract_checks(&rules(), Some(&webhook), None),
            IntegrityChecks::default()
        );
        assert_eq!(extract_checks(&rules(), None, None), IntegrityChecks::default());
    }

    #[test]
    fn test_has_breakdown_data() {
        assert!(!has_breakdown_data(&rules(), &json!({ "raw_output": { "breakdown": {} } })));
        assert!(has_breakdown_data(
            &rules(),
            &json!({ "raw_output": { "breakdown": { "visual_authenticity": { "result": "clear" } } } })
        ));
        assert!(has_breakdown_data(
            &rules(),
            &json!({
                "breakdowns": {
                    "document_check": {
                        "result": "consider",
                        "breakdown": { "visual_authenticity": "consider" }
                    }
                }
            })
        ));
        // Present but holding no verdict yet.
        assert!(!has_breakdown_data(
            &rules(),
            &json!({ "raw_output": { "breakdown": { "visual_authenticity": { "result": null } } } })
        ));
        assert!(!has_breakdown_data(
            &rules(),
            &json!({ "breakdowns": { "document_check": { "result": "consider" } } })
        ));
    }
}
