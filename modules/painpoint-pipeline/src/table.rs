//! Tabular form of review data, as persisted between stages.
//!
//! Upstream sources disagree on column names, so readers locate the review
//! text by probing a fixed list of names rather than assuming one.

use std::path::Path;

use painpoint_common::{PainpointError, ReviewBatch};

pub const BODY_COLUMN: &str = "content";
pub const SOURCE_ID_COLUMN: &str = "app_id";
pub const SOURCE_NAME_COLUMN: &str = "app_title";

/// Exact column names holding review text, highest priority first.
pub const TEXT_COLUMN_PRIORITY: [&str; 4] = ["content", "review", "text", "body"];

/// Fragments that mark a column as review text when matched as a
/// case-insensitive substring of its name.
pub const TEXT_COLUMN_HINTS: [&str; 6] = ["review", "text", "content", "body", "comment", "feedback"];

/// A header row plus cells. A cell is `None` when the row is shorter than
/// the header or the value was never present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ReviewTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every value of column `idx`, with absent cells as `""`.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).and_then(|c| c.as_deref()).unwrap_or(""))
    }

    /// Flatten a batch: body, source id and name, then the sorted union of
    /// metadata keys.
    pub fn from_batch(batch: &ReviewBatch) -> Self {
        let meta_keys = batch.metadata_keys();
        let mut columns = vec![
            BODY_COLUMN.to_string(),
            SOURCE_ID_COLUMN.to_string(),
            SOURCE_NAME_COLUMN.to_string(),
        ];
        columns.extend(meta_keys.iter().cloned());

        let mut table = Self::new(columns);
        for item in batch.items() {
            let mut row = vec![
                Some(item.body.clone()),
                Some(item.source_id.clone()),
                Some(item.source_name.clone()),
            ];
            row.extend(meta_keys.iter().map(|k| item.metadata.get(k).cloned()));
            table.push_row(row);
        }
        table
    }

    /// Single-column table, used for the pruned negative-review artifact.
    pub fn single_column<'a>(name: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = Self::new(vec![name.to_string()]);
        for v in values {
            table.push_row(vec![Some(v.to_string())]);
        }
        table
    }

    pub fn read_csv(path: &Path) -> Result<Self, PainpointError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut table = Self::new(columns);
        for record in reader.records() {
            let record = record.map_err(|e| csv_error(path, e))?;
            table.push_row(record.iter().map(|c| Some(c.to_string())).collect());
        }
        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), PainpointError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

        writer
            .write_record(&self.columns)
            .map_err(|e| csv_error(path, e))?;
        for row in &self.rows {
            let cells = (0..self.columns.len())
                .map(|i| row.get(i).and_then(|c| c.as_deref()).unwrap_or(""));
            writer.write_record(cells).map_err(|e| csv_error(path, e))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn csv_error(path: &Path, e: csv::Error) -> PainpointError {
    PainpointError::Artifact(format!("{}: {e}", path.display()))
}

/// First column, in priority order, whose name is exactly a known text column.
pub fn find_text_column(columns: &[String]) -> Option<usize> {
    TEXT_COLUMN_PRIORITY
        .iter()
        .find_map(|name| columns.iter().position(|c| c == name))
}

/// First column, in table order, whose lowercased name contains a text hint.
pub fn detect_text_column(columns: &[String]) -> Option<usize> {
    columns.iter().position(|c| {
        let lower = c.to_lowercase();
        TEXT_COLUMN_HINTS.iter().any(|hint| lower.contains(hint))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use painpoint_common::ReviewItem;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_lookup_respects_priority_not_position() {
        let columns = cols(&["body", "rating", "text"]);
        assert_eq!(find_text_column(&columns), Some(2));

        let columns = cols(&["review", "content"]);
        assert_eq!(find_text_column(&columns), Some(1));
    }

    #[test]
    fn exact_lookup_ignores_lookalikes() {
        let columns = cols(&["Content", "review_text", "rating"]);
        assert_eq!(find_text_column(&columns), None);
    }

    #[test]
    fn substring_lookup_takes_first_matching_column() {
        let columns = cols(&["rating", "Review_Text", "content"]);
        assert_eq!(detect_text_column(&columns), Some(1));

        let columns = cols(&["user_feedback"]);
        assert_eq!(detect_text_column(&columns), Some(0));

        let columns = cols(&["rating", "author"]);
        assert_eq!(detect_text_column(&columns), None);
    }

    #[test]
    fn from_batch_fills_missing_metadata_with_none() {
        let batch = ReviewBatch::from(vec![
            ReviewItem::new(Some("a".into()), "1", "One").with_meta("rating", Some(2)),
            ReviewItem::new(None, "2", "Two"),
        ]);
        let table = ReviewTable::from_batch(&batch);

        assert_eq!(table.columns(), &cols(&["content", "app_id", "app_title", "rating"])[..]);
        let ratings: Vec<&str> = table.column_values(3).collect();
        assert_eq!(ratings, vec!["2", ""]);
        let bodies: Vec<&str> = table.column_values(0).collect();
        assert_eq!(bodies, vec!["a", ""]);
    }

    #[test]
    fn csv_round_trip_keeps_commas_quotes_and_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");

        let tricky = "Crashes, \"always\"\nand again";
        let table = ReviewTable::single_column("content", [tricky, ""]);
        table.write_csv(&path).unwrap();

        let back = ReviewTable::read_csv(&path).unwrap();
        assert_eq!(back.columns(), &cols(&["content"])[..]);
        let values: Vec<&str> = back.column_values(0).collect();
        assert_eq!(values, vec![tricky, ""]);
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "rating,content\n5\n1,bad\n").unwrap();

        let table = ReviewTable::read_csv(&path).unwrap();
        let values: Vec<&str> = table.column_values(1).collect();
        assert_eq!(values, vec!["", "bad"]);
    }

    #[test]
    fn missing_file_is_an_artifact_error() {
        let err = ReviewTable::read_csv(Path::new("/nonexistent/reviews.csv")).unwrap_err();
        assert!(matches!(err, PainpointError::Artifact(_)));
    }
}
