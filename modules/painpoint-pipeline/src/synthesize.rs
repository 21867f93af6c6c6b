use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use ai_client::{strip_code_blocks, truncate_chars, StructuredOutput, TextGenerator};
use painpoint_common::{ErrorKind, ErrorPayload, InsightReport, NegativeReviewSet, ReportSchema};

use crate::prompt::build_prompt;
use crate::table::{detect_text_column, ReviewTable};

/// Most reviews that go into one prompt.
pub const MAX_SAMPLE: usize = 1000;

/// Hard cap on the review text embedded in the prompt, in characters.
pub const MAX_PROMPT_CHARS: usize = 15_000;

pub type SynthesisResult = Result<InsightReport, ErrorPayload>;

/// Pick at most [`MAX_SAMPLE`] reviews uniformly at random, keeping their
/// original relative order. Sets at or under the cap are used whole.
pub fn sample_reviews<'a, R: Rng + ?Sized>(reviews: &'a [String], rng: &mut R) -> Vec<&'a str> {
    if reviews.len() <= MAX_SAMPLE {
        return reviews.iter().map(String::as_str).collect();
    }

    let mut picked = rand::seq::index::sample(rng, reviews.len(), MAX_SAMPLE).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| reviews[i].as_str()).collect()
}

/// Newline-join and cut at [`MAX_PROMPT_CHARS`]. May end mid-review.
pub fn bounded_text(reviews: &[&str]) -> String {
    let joined = reviews.join("\n");
    truncate_chars(&joined, MAX_PROMPT_CHARS).to_string()
}

/// Strip fences and parse. Any JSON object is accepted as-is; field values
/// are not checked. On failure the raw, unstripped output is kept.
pub fn parse_report(raw: &str) -> SynthesisResult {
    let value: serde_json::Value = serde_json::from_str(strip_code_blocks(raw))
        .map_err(|e| ErrorPayload::invalid_json(e.to_string(), raw))?;

    InsightReport::from_value(value)
        .ok_or_else(|| ErrorPayload::invalid_json("expected a JSON object", raw))
}

/// Report returned when no review cleared the negativity threshold.
pub fn no_feedback_report() -> InsightReport {
    InsightReport::new(
        "No strongly negative reviews were found for this query. \
         There is no negative feedback to summarize.",
        "None of the fetched reviews scored at or below the negativity threshold, \
         so no model analysis was run.",
    )
}

pub struct Synthesizer {
    generator: Arc<dyn TextGenerator>,
    schema: serde_json::Value,
    rng: Mutex<StdRng>,
    timeout: Duration,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            schema: ReportSchema::openai_schema(),
            rng: Mutex::new(StdRng::from_os_rng()),
            timeout: Duration::from_secs(300),
        }
    }

    /// Pin the sampling sequence.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn schema(&self) -> &serde_json::Value {
        &self.schema
    }

    /// Sample, bound and template the review text.
    pub fn prepare_prompt(&self, set: &NegativeReviewSet) -> String {
        let text = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let sample = sample_reviews(set.reviews(), &mut *rng);
            bounded_text(&sample)
        };
        build_prompt(&text)
    }

    /// One generation attempt. Never panics on model trouble; every failure
    /// comes back as an [`ErrorPayload`].
    pub async fn synthesize(&self, set: &NegativeReviewSet) -> SynthesisResult {
        if set.is_empty() {
            info!("No negative reviews to analyze, skipping generation");
            return Ok(no_feedback_report());
        }

        let prompt = self.prepare_prompt(set);
        info!(
            reviews = set.len(),
            prompt_chars = prompt.chars().count(),
            model = self.generator.model_name(),
            "Generating insight report"
        );

        let generation = self.generator.generate(&prompt, Some(&self.schema));
        let raw = match tokio::time::timeout(self.timeout, generation).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, "Generation failed");
                return Err(ErrorPayload::model_failed(format!("{e:#}")));
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Generation timed out");
                return Err(ErrorPayload::model_failed(format!(
                    "generation timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let result = parse_report(&raw);
        match &result {
            Ok(report) => info!(pain_points = report.pain_points().len(), "Parsed insight report"),
            Err(payload) => warn!(details = %payload.details, "Model returned invalid JSON"),
        }
        result
    }

    /// Load a persisted review CSV, then synthesize. The text column is found
    /// by substring probing.
    pub async fn synthesize_file(&self, path: &Path) -> SynthesisResult {
        let set = load_review_set(path)?;
        self.synthesize(&set).await
    }
}

/// Read review text from any CSV whose header contains a review-like column.
pub fn load_review_set(path: &Path) -> Result<NegativeReviewSet, ErrorPayload> {
    let table = ReviewTable::read_csv(path).map_err(|e| {
        ErrorPayload::new(ErrorKind::LoadFailed, format!("Failed to load CSV: {e}"))
    })?;

    let idx = detect_text_column(table.columns()).ok_or_else(|| {
        ErrorPayload::new(
            ErrorKind::LoadFailed,
            format!("No text column found in {:?}", table.columns()),
        )
    })?;

    Ok(NegativeReviewSet::new(
        table.column_values(idx).map(str::to_string).collect(),
    ))
}
