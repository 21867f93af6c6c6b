use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use painpoint_common::PainpointError;

pub const NEGATIVES_FILE: &str = "negative_reviews.csv";

/// Root directory for per-request artifacts.
///
/// Every request gets its own `<root>/<request id>` directory. Without a
/// retention limit these accumulate until removed by hand.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    keep_runs: Option<usize>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keep_runs: None,
        }
    }

    /// Keep at most `keep_runs` request directories, newest first. Zero
    /// disables pruning. Set this above the expected request concurrency,
    /// or a slow run can lose its directory to newer ones.
    pub fn with_retention(mut self, keep_runs: usize) -> Self {
        self.keep_runs = (keep_runs > 0).then_some(keep_runs);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh directory for one request. Concurrent requests for the
    /// same keyword never share paths.
    pub fn begin(&self, keyword: &str) -> Result<RunArtifacts, PainpointError> {
        let request_id = Uuid::new_v4();
        let dir = self.root.join(request_id.to_string());
        std::fs::create_dir_all(&dir).map_err(|e| {
            PainpointError::Artifact(format!("cannot create {}: {e}", dir.display()))
        })?;

        if let Some(keep) = self.keep_runs {
            self.prune(keep, &dir);
        }

        Ok(RunArtifacts {
            request_id,
            dir,
            slug: sanitize_keyword(keyword),
        })
    }
}

impl ArtifactStore {
    /// Remove the oldest request directories so that `keep` remain,
    /// counting `current`. Only directories named by a request id are
    /// touched. Failures are logged and never fail the request.
    fn prune(&self, keep: usize, current: &Path) {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Cannot list artifacts for pruning");
                return;
            }
        };

        let mut runs: Vec<(std::time::SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && path.as_path() != current)
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| Uuid::parse_str(name).is_ok())
            })
            .filter_map(|path| {
                let modified = path.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .collect();

        // Newest first; everything past the survivors goes.
        runs.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, stale) in runs.into_iter().skip(keep.saturating_sub(1)) {
            match std::fs::remove_dir_all(&stale) {
                Ok(()) => debug!(dir = %stale.display(), "Pruned old artifacts"),
                Err(e) => warn!(dir = %stale.display(), error = %e, "Cannot prune old artifacts"),
            }
        }
    }
}

/// Paths for one request's artifacts.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub request_id: Uuid,
    pub dir: PathBuf,
    slug: String,
}

impl RunArtifacts {
    /// Artifacts rooted at an existing directory, for one-off CLI runs.
    pub fn in_dir(dir: impl Into<PathBuf>, keyword: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            dir: dir.into(),
            slug: sanitize_keyword(keyword),
        }
    }

    pub fn batch_path(&self) -> PathBuf {
        self.dir.join(format!("{}_reviews.csv", self.slug))
    }

    pub fn negatives_path(&self) -> PathBuf {
        self.dir.join(NEGATIVES_FILE)
    }
}

/// File-name-safe form of a keyword: every non-alphanumeric ASCII character
/// becomes `_`.
pub fn sanitize_keyword(keyword: &str) -> String {
    let slug: String = keyword
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if slug.is_empty() {
        "query".to_string()
    } else {
        slug
    }
}
