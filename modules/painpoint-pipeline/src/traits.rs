// Trait abstractions for the pipeline's external collaborators.
//
// ReviewSource: app search plus per-app review fetch.
// PolarityScorer: lexicon-based sentiment scoring.
// The language model sits behind ai_client::TextGenerator.
//
// Mocks for all three live in `testing`: no network, no model, no lexicon
// surprises.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;

use appstore_client::{AppStoreClient, StoreReview};

// ---------------------------------------------------------------------------
// ReviewSource
// ---------------------------------------------------------------------------

/// An app listing resolved from a keyword search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub id: String,
    pub name: String,
}

impl SourceRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A review as fetched, before acquisition tags it with its source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReview {
    pub body: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl RawReview {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            metadata: BTreeMap::new(),
        }
    }
}

#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Resolve a keyword to at most `limit` sources, best match first.
    async fn search(&self, keyword: &str, limit: u32) -> Result<Vec<SourceRef>>;

    /// Fetch at most `limit` reviews for one source, newest first.
    async fn reviews(&self, source: &SourceRef, limit: usize) -> Result<Vec<RawReview>>;
}

#[async_trait]
impl ReviewSource for AppStoreClient {
    async fn search(&self, keyword: &str, limit: u32) -> Result<Vec<SourceRef>> {
        let listings = self.search_apps(keyword, limit).await?;
        Ok(listings
            .into_iter()
            .take(limit as usize)
            .map(|l| SourceRef::new(l.track_id.to_string(), l.title()))
            .collect())
    }

    async fn reviews(&self, source: &SourceRef, limit: usize) -> Result<Vec<RawReview>> {
        let app_id: u64 = source
            .id
            .parse()
            .with_context(|| format!("App Store ids are numeric, got '{}'", source.id))?;
        let reviews = self.fetch_reviews(app_id, limit).await?;
        Ok(reviews.into_iter().map(raw_from_store).collect())
    }
}

fn raw_from_store(review: StoreReview) -> RawReview {
    let mut metadata = BTreeMap::new();
    let fields = [
        ("review_id", review.review_id),
        ("author", review.author),
        ("rating", review.rating.map(|r| r.to_string())),
        ("title", review.title),
        ("version", review.version),
        ("updated", review.updated.map(|u| u.to_rfc3339())),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            metadata.insert(key.to_string(), v);
        }
    }

    RawReview {
        body: review.content,
        metadata,
    }
}

// ---------------------------------------------------------------------------
// PolarityScorer
// ---------------------------------------------------------------------------

/// Deterministic compound sentiment in [-1.0, 1.0].
pub trait PolarityScorer: Send + Sync {
    fn compound(&self, text: &str) -> f64;
}

/// VADER lexicon scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaderScorer;

impl PolarityScorer for VaderScorer {
    fn compound(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let analyzer = vader_sentiment::SentimentIntensityAnalyzer::new();
        analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
    }
}
