use std::path::Path;

use tracing::warn;

use painpoint_common::{ErrorPayload, InsightReport, InsightResponse};

const EMBEDDED_REPORT: &str = include_str!("../fixtures/test_data.json");

/// The canned report served in test mode. An override file that cannot be
/// read or parsed falls back to the embedded one.
pub fn canned_report(override_path: Option<&Path>) -> InsightResponse {
    if let Some(path) = override_path {
        match load(path) {
            Ok(report) => return InsightResponse::Report(report),
            Err(e) => warn!(path = %path.display(), error = %e, "Fixture override unusable, using embedded report"),
        }
    }

    parse(EMBEDDED_REPORT)
        .map_err(|e| ErrorPayload::invalid_json(e.to_string(), EMBEDDED_REPORT))
        .into()
}

fn load(path: &Path) -> anyhow::Result<InsightReport> {
    parse(&std::fs::read_to_string(path)?)
}

fn parse(raw: &str) -> anyhow::Result<InsightReport> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    InsightReport::from_value(value).ok_or_else(|| anyhow::anyhow!("fixture is not a JSON object"))
}
