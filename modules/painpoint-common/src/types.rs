use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Acquisition ---

/// One user review, tagged with the app it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub body: String,
    pub source_id: String,
    pub source_name: String,
    /// Source-provided fields (rating, timestamp, author, ...), carried through
    /// to the persisted batch but never interpreted.
    pub metadata: BTreeMap<String, String>,
}

impl ReviewItem {
    /// A missing body becomes the empty string; the item is kept.
    pub fn new(
        body: Option<String>,
        source_id: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            body: body.unwrap_or_default(),
            source_id: source_id.into(),
            source_name: source_name.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        if let Some(v) = value {
            self.metadata.insert(key.into(), v.to_string());
        }
        self
    }
}

/// Reviews aggregated across sources, in source order then fetch order.
/// Not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewBatch {
    items: Vec<ReviewItem>,
}

impl ReviewBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ReviewItem>) {
        self.items.extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ReviewItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ReviewItem> {
        self.items
    }

    /// Union of metadata keys across all items, sorted.
    pub fn metadata_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .items
            .iter()
            .flat_map(|i| i.metadata.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl From<Vec<ReviewItem>> for ReviewBatch {
    fn from(items: Vec<ReviewItem>) -> Self {
        Self { items }
    }
}

// --- Filtering ---

/// Review bodies that scored at or below the negativity threshold, in input
/// order. Scores and metadata are not kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NegativeReviewSet {
    reviews: Vec<String>,
}

impl NegativeReviewSet {
    pub fn new(reviews: Vec<String>) -> Self {
        Self { reviews }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn reviews(&self) -> &[String] {
        &self.reviews
    }
}

// --- Synthesis ---

/// How often a pain point comes up in the analyzed reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Frequency {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PainPoint {
    /// Short title of the problem
    pub issue: String,
    /// How often the problem appears: High, Medium or Low
    pub frequency: Frequency,
    /// A direct quote from the reviews
    pub example_quote: String,
}

/// The shape the model is asked to produce. Only used to derive the output
/// schema; model output itself is kept as an [`InsightReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportSchema {
    /// A 2-sentence executive summary of the reviews
    pub summary: String,
    /// Problems users report, most significant first
    pub pain_points: Vec<PainPoint>,
    /// Specific action steps for the product team
    pub actions: Vec<String>,
    /// A deeper paragraph explaining the context of the pain points and user sentiment
    pub details: String,
}

/// A product-insight report exactly as the model emitted it.
///
/// Only top-level object-ness is checked. Field values, unknown keys and
/// nulls pass through untouched; the accessors read the expected fields
/// without rejecting anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightReport(Map<String, Value>);

impl InsightReport {
    /// A report with the four expected fields and no pain points or actions.
    pub fn new(summary: impl Into<String>, details: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("summary".into(), Value::String(summary.into()));
        fields.insert("pain_points".into(), Value::Array(Vec::new()));
        fields.insert("actions".into(), Value::Array(Vec::new()));
        fields.insert("details".into(), Value::String(details.into()));
        Self(fields)
    }

    /// Accept any JSON object; anything else is `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn summary(&self) -> Option<&str> {
        self.get("summary").and_then(Value::as_str)
    }

    pub fn details(&self) -> Option<&str> {
        self.get("details").and_then(Value::as_str)
    }

    /// Pain point entries, or nothing when the field is absent or not a list.
    pub fn pain_points(&self) -> &[Value] {
        self.list("pain_points")
    }

    pub fn actions(&self) -> &[Value] {
        self.list("actions")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn list(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Tag carried in the `error` field of an [`ErrorPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "Invalid JSON output")]
    InvalidJson,
    #[serde(rename = "Model failed")]
    ModelFailed,
    #[serde(rename = "No reviews found")]
    NoData,
    #[serde(rename = "Failed to load reviews")]
    LoadFailed,
    #[serde(rename = "Invalid request")]
    InvalidRequest,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidJson => "Invalid JSON output",
            ErrorKind::ModelFailed => "Model failed",
            ErrorKind::NoData => "No reviews found",
            ErrorKind::LoadFailed => "Failed to load reviews",
            ErrorKind::InvalidRequest => "Invalid request",
        };
        write!(f, "{s}")
    }
}

/// Returned in place of a report. Callers distinguish it by the `error` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: ErrorKind,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl ErrorPayload {
    pub fn new(error: ErrorKind, details: impl Into<String>) -> Self {
        Self {
            error,
            details: details.into(),
            raw_output: None,
        }
    }

    pub fn invalid_json(details: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self {
            error: ErrorKind::InvalidJson,
            details: details.into(),
            raw_output: Some(raw_output.into()),
        }
    }

    pub fn model_failed(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelFailed, details)
    }
}

/// What a caller receives: a report, or an explicitly tagged error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsightResponse {
    Error(ErrorPayload),
    Report(InsightReport),
}

impl InsightResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, InsightResponse::Error(_))
    }
}

impl From<Result<InsightReport, ErrorPayload>> for InsightResponse {
    fn from(result: Result<InsightReport, ErrorPayload>) -> Self {
        match result {
            Ok(report) => InsightResponse::Report(report),
            Err(payload) => InsightResponse::Error(payload),
        }
    }
}

impl From<ErrorPayload> for InsightResponse {
    fn from(payload: ErrorPayload) -> Self {
        InsightResponse::Error(payload)
    }
}
