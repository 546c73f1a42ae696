use crate::model::CanonicalResult;

pub fn render(result: &CanonicalResult) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
