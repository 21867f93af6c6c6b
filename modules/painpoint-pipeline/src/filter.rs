use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use painpoint_common::{NegativeReviewSet, PainpointError, ReviewBatch};

use crate::table::{find_text_column, ReviewTable};
use crate::traits::{PolarityScorer, VaderScorer};

/// Compound score at or below which a review counts as strongly negative.
pub const DEFAULT_THRESHOLD: f64 = -0.5;

/// A review body with its compound polarity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReview {
    pub text: String,
    pub score: f64,
}

/// Result of a filter run. `text_column` is `None` when the input could not
/// be read or had no recognizable text column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub text_column: Option<String>,
    pub total: usize,
    pub negatives: NegativeReviewSet,
}

impl FilterOutcome {
    pub fn count(&self) -> usize {
        self.negatives.len()
    }

    fn empty() -> Self {
        Self::default()
    }
}

pub struct SentimentFilter {
    scorer: Arc<dyn PolarityScorer>,
    threshold: f64,
}

impl SentimentFilter {
    pub fn new(threshold: f64) -> Self {
        Self::with_scorer(Arc::new(VaderScorer), threshold)
    }

    pub fn with_scorer(scorer: Arc<dyn PolarityScorer>, threshold: f64) -> Self {
        Self { scorer, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score every row's review text, in row order.
    pub fn score_table(&self, table: &ReviewTable) -> Result<(String, Vec<ScoredReview>), PainpointError> {
        let idx = find_text_column(table.columns()).ok_or_else(|| PainpointError::NoTextColumn {
            available: table.columns().to_vec(),
        })?;
        let column = table.columns()[idx].clone();

        let scored = table
            .column_values(idx)
            .map(|text| ScoredReview {
                text: text.to_string(),
                score: self.scorer.compound(text),
            })
            .collect();

        Ok((column, scored))
    }

    /// Keep rows scoring at or below the threshold, preserving order.
    pub fn filter_table(&self, table: &ReviewTable) -> Result<FilterOutcome, PainpointError> {
        let (column, scored) = self.score_table(table)?;
        let total = scored.len();

        let negatives: Vec<String> = scored
            .into_iter()
            .filter(|r| r.score <= self.threshold)
            .map(|r| r.text)
            .collect();

        info!(
            total,
            negative = negatives.len(),
            threshold = self.threshold,
            column = %column,
            "Filtered reviews by sentiment"
        );

        Ok(FilterOutcome {
            text_column: Some(column),
            total,
            negatives: NegativeReviewSet::new(negatives),
        })
    }

    /// Filter an in-memory batch.
    pub fn filter_batch(&self, batch: &ReviewBatch) -> FilterOutcome {
        self.filter_table(&ReviewTable::from_batch(batch))
            .unwrap_or_else(|e| {
                warn!(error = %e, "Batch could not be filtered");
                FilterOutcome::empty()
            })
    }

    /// Read `input`, filter it, and write the surviving text column to
    /// `output`. Unreadable input or a missing text column yields an empty
    /// outcome; nothing is propagated.
    pub fn filter_file(&self, input: &Path, output: &Path) -> FilterOutcome {
        if !input.exists() {
            warn!(path = %input.display(), "Input file not found");
            return FilterOutcome::empty();
        }

        info!(path = %input.display(), "Loading reviews");
        let table = match ReviewTable::read_csv(input) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "Error reading CSV");
                return FilterOutcome::empty();
            }
        };

        let outcome = match self.filter_table(&table) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Cannot filter reviews");
                return FilterOutcome::empty();
            }
        };

        persist_negatives(&outcome, output);
        outcome
    }
}

/// Write the pruned survivors as a single-column CSV. Failure is logged; the
/// in-memory outcome is still usable.
pub fn persist_negatives(outcome: &FilterOutcome, output: &Path) {
    let Some(ref column) = outcome.text_column else {
        return;
    };

    let pruned = ReviewTable::single_column(
        column,
        outcome.negatives.reviews().iter().map(String::as_str),
    );
    match pruned.write_csv(output) {
        Ok(()) => info!(path = %output.display(), count = outcome.count(), "Saved negative reviews"),
        Err(e) => warn!(error = %e, "Failed to save negative reviews"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedScorer;
    use painpoint_common::ReviewItem;

    fn table(column: &str, values: &[&str]) -> ReviewTable {
        ReviewTable::single_column(column, values.iter().copied())
    }

    fn fixed_filter(threshold: f64) -> SentimentFilter {
        let scorer = FixedScorer::new()
            .score("awful", -0.9)
            .score("edge", -0.5)
            .score("meh", -0.2)
            .score("great", 0.8);
        SentimentFilter::with_scorer(Arc::new(scorer), threshold)
    }

    #[test]
    fn keeps_exactly_items_at_or_below_threshold_in_order() {
        let filter = fixed_filter(-0.5);
        let outcome = filter
            .filter_table(&table("review", &["great", "awful", "meh", "edge", "awful"]))
            .unwrap();

        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.negatives.reviews(), &["awful", "edge", "awful"]);
        assert_eq!(outcome.text_column.as_deref(), Some("review"));
    }

    #[test]
    fn tie_with_threshold_is_kept() {
        let filter = fixed_filter(-0.5);
        let outcome = filter.filter_table(&table("text", &["edge"])).unwrap();
        assert_eq!(outcome.count(), 1);
    }

    #[test]
    fn every_synonym_is_recognized() {
        let filter = fixed_filter(-0.5);
        for column in ["content", "review", "text", "body"] {
            let outcome = filter.filter_table(&table(column, &["awful"])).unwrap();
            assert_eq!(outcome.count(), 1, "column {column}");
        }
    }

    #[test]
    fn unknown_column_reports_available_columns() {
        let filter = fixed_filter(-0.5);
        let err = filter.filter_table(&table("comment", &["awful"])).unwrap_err();
        match err {
            PainpointError::NoTextColumn { available } => assert_eq!(available, vec!["comment"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn vader_scenario_keeps_only_the_complaint() {
        let filter = SentimentFilter::new(DEFAULT_THRESHOLD);
        let outcome = filter
            .filter_table(&table(
                "content",
                &["Great app!", "Terrible, crashes constantly, hate it"],
            ))
            .unwrap();

        assert_eq!(
            outcome.negatives.reviews(),
            &["Terrible, crashes constantly, hate it"]
        );
    }

    #[test]
    fn empty_batch_yields_empty_set() {
        let filter = SentimentFilter::new(DEFAULT_THRESHOLD);
        let outcome = filter.filter_batch(&ReviewBatch::new());
        assert_eq!(outcome.count(), 0);
        assert_eq!(outcome.total, 0);
    }

    #[test]
    fn missing_bodies_score_neutral_and_drop_out() {
        let filter = SentimentFilter::new(DEFAULT_THRESHOLD);
        let batch = ReviewBatch::from(vec![
            ReviewItem::new(None, "1", "App"),
            ReviewItem::new(Some("I hate this awful broken app".into()), "1", "App"),
        ]);
        let outcome = filter.filter_batch(&batch);
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.negatives.reviews(), &["I hate this awful broken app"]);
    }

    #[test]
    fn missing_input_file_is_zero_count() {
        let dir = tempfile::tempdir().unwrap();
        let filter = SentimentFilter::new(DEFAULT_THRESHOLD);
        let outcome = filter.filter_file(&dir.path().join("absent.csv"), &dir.path().join("out.csv"));

        assert_eq!(outcome, FilterOutcome::default());
        assert!(!dir.path().join("out.csv").exists());
    }

    #[test]
    fn file_without_text_column_is_zero_count() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        std::fs::write(&input, "rating,author\n1,jo\n").unwrap();

        let outcome = SentimentFilter::new(DEFAULT_THRESHOLD)
            .filter_file(&input, &dir.path().join("out.csv"));
        assert_eq!(outcome.count(), 0);
        assert!(outcome.text_column.is_none());
    }

    #[test]
    fn filter_file_writes_pruned_single_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, "rating,body,author\n5,great,a\n1,awful,b\n").unwrap();

        let outcome = fixed_filter(-0.5).filter_file(&input, &output);
        assert_eq!(outcome.count(), 1);

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, "body\nawful\n");
    }
}
