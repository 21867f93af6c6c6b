// Test mocks for the insight pipeline.
//
// Three mocks matching the three trait boundaries:
// - MockReviewSource (ReviewSource): HashMap-based keyword→sources, id→reviews
// - StubGenerator (TextGenerator): canned output or failure, records prompts
// - FixedScorer (PolarityScorer): HashMap-based text→score, neutral otherwise
//
// Plus helpers for building review sets.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use ai_client::TextGenerator;
use painpoint_common::NegativeReviewSet;

use crate::traits::{PolarityScorer, RawReview, ReviewSource, SourceRef};

// ---------------------------------------------------------------------------
// MockReviewSource
// ---------------------------------------------------------------------------

/// Returns `Err` for unregistered keywords and source ids.
/// Builder pattern: `.on_search()`, `.on_reviews()`, `.failing()`, `.hanging()`.
#[derive(Default)]
pub struct MockReviewSource {
    searches: HashMap<String, Vec<SourceRef>>,
    reviews: HashMap<String, Vec<RawReview>>,
    failing: HashSet<String>,
    hanging: HashMap<String, Duration>,
    fetches: Mutex<Vec<String>>,
}

impl MockReviewSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_search(mut self, keyword: &str, sources: Vec<SourceRef>) -> Self {
        self.searches.insert(keyword.to_string(), sources);
        self
    }

    pub fn on_reviews(mut self, source_id: &str, reviews: Vec<RawReview>) -> Self {
        self.reviews.insert(source_id.to_string(), reviews);
        self
    }

    pub fn failing(mut self, source_id: &str) -> Self {
        self.failing.insert(source_id.to_string());
        self
    }

    /// Sleep this long before answering for `source_id`.
    pub fn hanging(mut self, source_id: &str, delay: Duration) -> Self {
        self.hanging.insert(source_id.to_string(), delay);
        self
    }

    /// Source ids fetched so far, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetches
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReviewSource for MockReviewSource {
    async fn search(&self, keyword: &str, limit: u32) -> Result<Vec<SourceRef>> {
        match self.searches.get(keyword) {
            Some(sources) => Ok(sources.iter().take(limit as usize).cloned().collect()),
            None => bail!("MockReviewSource: no search registered for {keyword}"),
        }
    }

    async fn reviews(&self, source: &SourceRef, limit: usize) -> Result<Vec<RawReview>> {
        if let Ok(mut fetches) = self.fetches.lock() {
            fetches.push(source.id.clone());
        }

        if let Some(delay) = self.hanging.get(&source.id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&source.id) {
            bail!("MockReviewSource: {} is configured to fail", source.id);
        }

        match self.reviews.get(&source.id) {
            Some(reviews) => Ok(reviews.iter().take(limit).cloned().collect()),
            None => bail!("MockReviewSource: no reviews registered for {}", source.id),
        }
    }
}

// ---------------------------------------------------------------------------
// StubGenerator
// ---------------------------------------------------------------------------

enum StubBehavior {
    Output(String),
    Fail(String),
    Hang(Duration),
}

/// Canned text generator. Counts calls and keeps the last prompt and schema.
pub struct StubGenerator {
    behavior: StubBehavior,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_schema: Mutex<Option<serde_json::Value>>,
}

impl StubGenerator {
    fn with_behavior(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_schema: Mutex::new(None),
        }
    }

    pub fn returning(output: impl Into<String>) -> Self {
        Self::with_behavior(StubBehavior::Output(output.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(StubBehavior::Fail(message.into()))
    }

    pub fn hanging(delay: Duration) -> Self {
        Self::with_behavior(StubBehavior::Hang(delay))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }

    pub fn last_schema(&self) -> Option<serde_json::Value> {
        self.last_schema.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str, schema: Option<&serde_json::Value>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        if let Ok(mut last) = self.last_schema.lock() {
            *last = schema.cloned();
        }

        match &self.behavior {
            StubBehavior::Output(text) => Ok(text.clone()),
            StubBehavior::Fail(message) => bail!("{message}"),
            StubBehavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                bail!("StubGenerator: woke after {delay:?}")
            }
        }
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

// ---------------------------------------------------------------------------
// FixedScorer
// ---------------------------------------------------------------------------

/// Text→score table. Unregistered text scores 0.0.
#[derive(Default)]
pub struct FixedScorer {
    scores: HashMap<String, f64>,
}

impl FixedScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(mut self, text: &str, score: f64) -> Self {
        self.scores.insert(text.to_string(), score);
        self
    }
}

impl PolarityScorer for FixedScorer {
    fn compound(&self, text: &str) -> f64 {
        self.scores.get(text).copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `n` distinct reviews: "review 0", "review 1", ...
pub fn numbered_reviews(n: usize) -> NegativeReviewSet {
    NegativeReviewSet::new((0..n).map(|i| format!("review {i}")).collect())
}

/// A well-formed report as a model would emit it.
pub const REPORT_JSON: &str = r#"{
  "summary": "Users report frequent crashes. Sync is unreliable.",
  "pain_points": [
    {"issue": "Crashes on launch", "frequency": "High", "example_quote": "crashes constantly"},
    {"issue": "Sync loses data", "frequency": "Medium", "example_quote": "lost my workouts"}
  ],
  "actions": ["Fix launch crash", "Audit sync", "Add offline mode"],
  "details": "Most complaints concern stability after the latest update."
}"#;

pub fn raw_reviews(bodies: &[&str]) -> Vec<RawReview> {
    bodies.iter().map(|b| RawReview::text(*b)).collect()
}
