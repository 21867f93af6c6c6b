use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::{OpenAi, TextGenerator};
use appstore_client::AppStoreClient;
use painpoint_common::{Config, ErrorKind, ErrorPayload, InsightResponse, PainpointError};

use crate::acquire::{Acquirer, AcquisitionLimits};
use crate::artifacts::{ArtifactStore, RunArtifacts};
use crate::filter::{persist_negatives, SentimentFilter};
use crate::synthesize::Synthesizer;
use crate::traits::ReviewSource;

/// Counters from one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub request_id: Option<Uuid>,
    pub sources_fetched: usize,
    pub reviews_fetched: usize,
    pub negative_reviews: usize,
    pub batch_path: Option<PathBuf>,
    pub negatives_path: Option<PathBuf>,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Painpoint Run Complete ===")?;
        if let Some(id) = self.request_id {
            writeln!(f, "Request:          {id}")?;
        }
        writeln!(f, "Apps fetched:     {}", self.sources_fetched)?;
        writeln!(f, "Reviews fetched:  {}", self.reviews_fetched)?;
        writeln!(f, "Negative reviews: {}", self.negative_reviews)?;
        if let Some(path) = &self.batch_path {
            writeln!(f, "Batch CSV:        {}", path.display())?;
        }
        if let Some(path) = &self.negatives_path {
            writeln!(f, "Negatives CSV:    {}", path.display())?;
        }
        Ok(())
    }
}

/// What a run produced: the caller-facing response plus its counters.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub response: InsightResponse,
    pub stats: RunStats,
}

/// Acquisition, filtering and synthesis, run strictly in sequence.
pub struct InsightPipeline {
    acquirer: Acquirer,
    filter: SentimentFilter,
    synthesizer: Synthesizer,
    artifacts: Option<ArtifactStore>,
}

impl InsightPipeline {
    pub fn new(acquirer: Acquirer, filter: SentimentFilter, synthesizer: Synthesizer) -> Self {
        Self {
            acquirer,
            filter,
            synthesizer,
            artifacts: None,
        }
    }

    /// Persist each run's intermediate tables under `store`.
    pub fn with_artifacts(mut self, store: ArtifactStore) -> Self {
        self.artifacts = Some(store);
        self
    }

    /// Production wiring: App Store reviews, VADER scoring, and an
    /// OpenAI-compatible model. Returns the generator too so the caller can
    /// warm it up.
    pub fn from_config(config: &Config) -> Result<(Self, Arc<dyn TextGenerator>)> {
        let store = AppStoreClient::with_timeout(config.store_country.as_str(), config.source_timeout)?;
        let source: Arc<dyn ReviewSource> = Arc::new(store);

        let mut model = OpenAi::new(&config.llm_model)
            .with_base_url(&config.llm_base_url)
            .with_temperature(config.llm_temperature)
            .with_top_p(config.llm_top_p)
            .with_max_tokens(config.llm_max_tokens)
            .with_structured_output(config.llm_structured_output)
            .with_timeout(config.generation_timeout);
        if let Some(key) = &config.llm_api_key {
            model = model.with_api_key(key);
        }
        let generator: Arc<dyn TextGenerator> = Arc::new(model);

        let limits = AcquisitionLimits {
            max_sources: config.max_sources,
            max_items_per_source: config.reviews_per_source,
            source_timeout: config.source_timeout,
        };

        let pipeline = Self::new(
            Acquirer::new(source, limits),
            SentimentFilter::new(config.negativity_threshold),
            Synthesizer::new(generator.clone()).with_timeout(config.generation_timeout),
        )
        .with_artifacts(ArtifactStore::new(&config.data_dir).with_retention(config.data_retention_runs));

        Ok((pipeline, generator))
    }

    pub fn acquirer(&self) -> &Acquirer {
        &self.acquirer
    }

    pub fn filter(&self) -> &SentimentFilter {
        &self.filter
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    /// Run all three stages for `keyword`. Every failure comes back as an
    /// error payload in the response.
    pub async fn run(&self, keyword: &str) -> PipelineRun {
        let mut stats = RunStats::default();
        let run = self.begin_artifacts(keyword);
        stats.request_id = run.as_ref().map(|r| r.request_id);

        info!(keyword, request_id = ?stats.request_id, "Starting pipeline run");

        let acquired = match self.acquirer.acquire_and_persist(keyword, run.as_ref()).await {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(keyword, error = %e, "Acquisition produced no data");
                return PipelineRun {
                    response: no_data_payload(&e).into(),
                    stats,
                };
            }
        };
        stats.sources_fetched = acquired.sources_fetched;
        stats.reviews_fetched = acquired.batch.len();
        stats.batch_path = acquired.path.clone();

        let outcome = self.filter.filter_batch(&acquired.batch);
        stats.negative_reviews = outcome.count();
        if let Some(run) = &run {
            let path = run.negatives_path();
            persist_negatives(&outcome, &path);
            if path.exists() {
                stats.negatives_path = Some(path);
            }
        }

        let response = self.synthesizer.synthesize(&outcome.negatives).await.into();
        info!(keyword, negative = stats.negative_reviews, "Pipeline run finished");
        PipelineRun { response, stats }
    }

    fn begin_artifacts(&self, keyword: &str) -> Option<RunArtifacts> {
        let store = self.artifacts.as_ref()?;
        match store.begin(keyword) {
            Ok(run) => Some(run),
            Err(e) => {
                warn!(error = %e, "Artifacts disabled for this run");
                None
            }
        }
    }
}

fn no_data_payload(err: &PainpointError) -> ErrorPayload {
    ErrorPayload::new(ErrorKind::NoData, err.to_string())
}
