use serde_json::Value;

use super::checks::{CheckRule, extract_checks};
use crate::model::{Address, ApplicantInput, CanonicalResult, VerificationStatus};

/// Field lookup across payload layers, highest priority first.
struct Layers<'a> {
    layers: Vec<&'a Value>,
}

impl<'a> Layers<'a> {
    /// Webhook `raw_output`, then the run record, then the run's `output`.
    fn new(run: &'a Value, webhook: Option<&'a Value>) -> Self {
        let layers = [
            webhook.and_then(|w| w.get("raw_output")),
            Some(run),
            run.get("output"),
        ]
        .into_iter()
        .flatten()
        .filter(|v| v.is_object())
        .collect();
        Self { layers }
    }

    /// First non-empty value for any of `keys`, searching layer by layer.
    fn text(&self, keys: &[&str]) -> Option<String> {
        self.layers
            .iter()
            .find_map(|layer| keys.iter().find_map(|k| scalar(layer.get(*k))))
    }

    fn full_name(&self) -> Option<String> {
        self.layers.iter().find_map(|layer| {
            scalar(layer.get("full_name")).or_else(|| {
                let parts: Vec<String> = ["first_name", "last_name"]
                    .iter()
                    .filter_map(|k| scalar(layer.get(*k)))
                    .collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            })
        })
    }

    fn address(&self) -> Option<Address> {
        self.layers.iter().find_map(|layer| {
            let node = layer.get("address").or_else(|| {
                layer
                    .get("addresses")
                    .and_then(Value::as_array)
                    .and_then(|a| a.first())
            })?;
            parse_address(node)
        })
    }
}

/// Strings are trimmed, numbers stringified; anything else is absent.
fn scalar(node: Option<&Value>) -> Option<String> {
    match node? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_address(node: &Value) -> Option<Address> {
    match node {
        Value::String(_) => scalar(Some(node)).map(|text| Address::FreeText { text }),
        Value::Object(_) => {
            let field = |keys: &[&str]| keys.iter().find_map(|k| scalar(node.get(*k)));
            let town = field(&["town", "city"]);
            let state = field(&["state"]);
            let postcode = field(&["postcode", "postal_code"]);
            let country = field(&["country"]);
            if town.is_some() || state.is_some() || postcode.is_some() || country.is_some() {
                Some(Address::Structured {
                    town,
                    state,
                    postcode,
                    country,
                })
            } else {
                field(&["full_address", "formatted_address", "line1"])
                    .map(|text| Address::FreeText { text })
            }
        }
        _ => None,
    }
}

/// Build the canonical result from the run record and the (optional) webhook
/// payload. Remote values win; the form's names are the last resort.
pub fn merge(
    run_id: &str,
    run: &Value,
    webhook: Option<&Value>,
    applicant: Option<&ApplicantInput>,
    rules: &[CheckRule],
) -> CanonicalResult {
    let layers = Layers::new(run, webhook);
    let raw_output = webhook.and_then(|w| w.get("raw_output"));
    let output = run.get("output");

    let status = [webhook, Some(run)]
        .into_iter()
        .find_map(|src| scalar(src?.get("status")))
        .map(|s| VerificationStatus::parse(&s))
        .unwrap_or_else(|| VerificationStatus::Other("unknown".into()));

    let sub_result = [
        raw_output.and_then(|r| r.get("sub_result")),
        webhook.and_then(|w| w.get("sub_result")),
        webhook.and_then(|w| w.get("result")),
        output.and_then(|o| o.get("sub_result")),
        run.get("sub_result"),
    ]
    .into_iter()
    .find_map(scalar);

    let workflow_run_id = [
        run.get("workflow_run_id"),
        webhook.and_then(|w| w.get("workflow_run_id")),
        run.get("id"),
    ]
    .into_iter()
    .find_map(scalar)
    .unwrap_or_else(|| run_id.to_string());

    CanonicalResult {
        status,
        sub_result,
        full_name: layers
            .full_name()
            .or_else(|| applicant.map(ApplicantInput::full_name))
            .filter(|n| !n.is_empty()),
        address: layers.address(),
        gender: layers.text(&["gender", "sex"]),
        date_of_birth: layers.text(&["date_of_birth", "dob"]),
        document_type: layers.text(&["document_type"]),
        document_number: layers.text(&["document_number"]),
        date_of_expiry: layers.text(&["date_expiry", "date_of_expiry"]),
        workflow_run_id,
        dashboard_url: scalar(run.get("dashboard_url")),
        checks: extract_checks(rules, webhook, Some(run)),
        raw_webhook: webhook.cloned(),
        reconciled_at: chrono::Utc::now().to_rfc3339(),
    }
}
