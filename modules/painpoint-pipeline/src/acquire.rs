use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use painpoint_common::{PainpointError, ReviewBatch, ReviewItem};

use crate::artifacts::RunArtifacts;
use crate::table::ReviewTable;
use crate::traits::{ReviewSource, SourceRef};

/// Bounds on how much acquisition may fetch and wait for.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionLimits {
    pub max_sources: u32,
    pub max_items_per_source: usize,
    pub source_timeout: Duration,
}

impl Default for AcquisitionLimits {
    fn default() -> Self {
        Self {
            max_sources: 3,
            max_items_per_source: 200,
            source_timeout: Duration::from_secs(30),
        }
    }
}

/// A batch plus where it was persisted, if persisting succeeded.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub batch: ReviewBatch,
    pub sources_fetched: usize,
    pub path: Option<PathBuf>,
}

pub struct Acquirer {
    source: Arc<dyn ReviewSource>,
    limits: AcquisitionLimits,
}

impl Acquirer {
    pub fn new(source: Arc<dyn ReviewSource>, limits: AcquisitionLimits) -> Self {
        Self { source, limits }
    }

    pub fn limits(&self) -> &AcquisitionLimits {
        &self.limits
    }

    /// Resolve `keyword` to sources and aggregate their reviews, in source
    /// order then newest-first. One failing source is skipped; zero
    /// successful sources is `NoData`.
    pub async fn acquire(&self, keyword: &str) -> Result<Acquired, PainpointError> {
        info!(keyword, max_sources = self.limits.max_sources, "Searching for apps");

        let sources = self.resolve_sources(keyword).await;
        let mut batch = ReviewBatch::new();
        let mut fetched = 0usize;

        for (index, source) in sources.iter().enumerate() {
            info!(
                app_id = %source.id,
                app_title = %source.name,
                position = index + 1,
                of = sources.len(),
                "Fetching reviews"
            );

            match self.fetch_source(source).await {
                Ok(items) => {
                    info!(app_id = %source.id, count = items.len(), "Fetched reviews");
                    batch.extend(items);
                    fetched += 1;
                }
                Err(reason) => {
                    warn!(app_id = %source.id, reason = %reason, "Skipping source");
                }
            }
        }

        if fetched == 0 {
            warn!(keyword, "No reviews were collected");
            return Err(PainpointError::NoData(keyword.to_string()));
        }

        info!(keyword, total = batch.len(), sources = fetched, "Collected reviews");
        Ok(Acquired {
            batch,
            sources_fetched: fetched,
            path: None,
        })
    }

    /// `acquire`, then persist the aggregated batch for inspection. A failed
    /// write is logged and leaves `path` empty.
    pub async fn acquire_and_persist(
        &self,
        keyword: &str,
        run: Option<&RunArtifacts>,
    ) -> Result<Acquired, PainpointError> {
        let mut acquired = self.acquire(keyword).await?;

        if let Some(run) = run {
            let path = run.batch_path();
            match ReviewTable::from_batch(&acquired.batch).write_csv(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "Saved review batch");
                    acquired.path = Some(path);
                }
                Err(e) => warn!(error = %e, "Failed to save review batch"),
            }
        }

        Ok(acquired)
    }

    async fn resolve_sources(&self, keyword: &str) -> Vec<SourceRef> {
        let search = self.source.search(keyword, self.limits.max_sources);
        match tokio::time::timeout(self.limits.source_timeout, search).await {
            Ok(Ok(sources)) => sources
                .into_iter()
                .take(self.limits.max_sources as usize)
                .collect(),
            Ok(Err(e)) => {
                warn!(keyword, error = %e, "Search failed");
                Vec::new()
            }
            Err(_) => {
                warn!(keyword, timeout_secs = self.limits.source_timeout.as_secs(), "Search timed out");
                Vec::new()
            }
        }
    }

    async fn fetch_source(&self, source: &SourceRef) -> Result<Vec<ReviewItem>, String> {
        let fetch = self.source.reviews(source, self.limits.max_items_per_source);
        let raw = match tokio::time::timeout(self.limits.source_timeout, fetch).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => {
                return Err(format!(
                    "timed out after {}s",
                    self.limits.source_timeout.as_secs()
                ))
            }
        };

        Ok(raw
            .into_iter()
            .take(self.limits.max_items_per_source)
            .map(|r| {
                let mut item = ReviewItem::new(r.body, &source.id, &source.name);
                item.metadata = r.metadata;
                item
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{raw_reviews, MockReviewSource};

    fn limits(max_sources: u32, per_source: usize) -> AcquisitionLimits {
        AcquisitionLimits {
            max_sources,
            max_items_per_source: per_source,
            source_timeout: Duration::from_millis(200),
        }
    }

    fn two_apps() -> MockReviewSource {
        MockReviewSource::new()
            .on_search(
                "fitness",
                vec![SourceRef::new("1", "Run"), SourceRef::new("2", "Lift")],
            )
            .on_reviews("1", raw_reviews(&["r1 newest", "r1 older", "r1 oldest"]))
            .on_reviews("2", raw_reviews(&["l1 newest", "l1 older"]))
    }

    #[tokio::test]
    async fn aggregates_in_source_order_then_fetch_order() {
        let acquirer = Acquirer::new(Arc::new(two_apps()), limits(3, 10));
        let acquired = acquirer.acquire("fitness").await.unwrap();

        let bodies: Vec<&str> = acquired.batch.items().iter().map(|i| i.body.as_str()).collect();
        assert_eq!(bodies, vec!["r1 newest", "r1 older", "r1 oldest", "l1 newest", "l1 older"]);
        assert_eq!(acquired.sources_fetched, 2);
    }

    #[tokio::test]
    async fn items_are_tagged_with_their_source() {
        let acquirer = Acquirer::new(Arc::new(two_apps()), limits(3, 10));
        let acquired = acquirer.acquire("fitness").await.unwrap();

        let last = acquired.batch.items().last().unwrap();
        assert_eq!(last.source_id, "2");
        assert_eq!(last.source_name, "Lift");
    }

    #[tokio::test]
    async fn respects_source_and_item_bounds() {
        let source = Arc::new(two_apps());
        let acquirer = Acquirer::new(source.clone(), limits(1, 2));
        let acquired = acquirer.acquire("fitness").await.unwrap();

        assert_eq!(acquired.batch.len(), 2);
        assert_eq!(source.fetched(), vec!["1"]);
    }

    #[tokio::test]
    async fn one_failing_source_does_not_sink_the_run() {
        let source = MockReviewSource::new()
            .on_search(
                "fitness",
                vec![SourceRef::new("bad", "Broken"), SourceRef::new("2", "Lift")],
            )
            .failing("bad")
            .on_reviews("2", raw_reviews(&["ok"]));

        let acquired = Acquirer::new(Arc::new(source), limits(3, 10))
            .acquire("fitness")
            .await
            .unwrap();
        assert_eq!(acquired.batch.len(), 1);
        assert_eq!(acquired.sources_fetched, 1);
    }

    #[tokio::test]
    async fn slow_source_times_out_and_is_skipped() {
        let source = MockReviewSource::new()
            .on_search(
                "fitness",
                vec![SourceRef::new("slow", "Slow"), SourceRef::new("2", "Lift")],
            )
            .hanging("slow", Duration::from_secs(5))
            .on_reviews("slow", raw_reviews(&["never"]))
            .on_reviews("2", raw_reviews(&["ok"]));

        let acquired = Acquirer::new(Arc::new(source), limits(3, 10))
            .acquire("fitness")
            .await
            .unwrap();
        let bodies: Vec<&str> = acquired.batch.items().iter().map(|i| i.body.as_str()).collect();
        assert_eq!(bodies, vec!["ok"]);
    }

    #[tokio::test]
    async fn all_sources_failing_is_no_data() {
        let source = MockReviewSource::new()
            .on_search("fitness", vec![SourceRef::new("bad", "Broken")])
            .failing("bad");

        let err = Acquirer::new(Arc::new(source), limits(3, 10))
            .acquire("fitness")
            .await
            .unwrap_err();
        assert!(matches!(err, PainpointError::NoData(k) if k == "fitness"));
    }

    #[tokio::test]
    async fn failed_search_is_no_data() {
        let err = Acquirer::new(Arc::new(MockReviewSource::new()), limits(3, 10))
            .acquire("unknown")
            .await
            .unwrap_err();
        assert!(matches!(err, PainpointError::NoData(_)));
    }

    #[tokio::test]
    async fn source_with_zero_reviews_still_counts_as_fetched() {
        let source = MockReviewSource::new()
            .on_search("quiet", vec![SourceRef::new("1", "Quiet")])
            .on_reviews("1", Vec::new());

        let acquired = Acquirer::new(Arc::new(source), limits(3, 10))
            .acquire("quiet")
            .await
            .unwrap();
        assert!(acquired.batch.is_empty());
    }

    #[tokio::test]
    async fn persists_batch_under_sanitized_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunArtifacts::in_dir(dir.path(), "fitness");

        let acquired = Acquirer::new(Arc::new(two_apps()), limits(3, 10))
            .acquire_and_persist("fitness", Some(&run))
            .await
            .unwrap();

        let path = acquired.path.unwrap();
        assert!(path.ends_with("fitness_reviews.csv"));
        let table = ReviewTable::read_csv(&path).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(&table.columns()[..3], &["content", "app_id", "app_title"]);
    }
}
