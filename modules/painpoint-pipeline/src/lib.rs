pub mod acquire;
pub mod artifacts;
pub mod filter;
pub mod fixtures;
pub mod pipeline;
pub mod prompt;
pub mod synthesize;
pub mod table;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use acquire::{Acquired, Acquirer, AcquisitionLimits};
pub use artifacts::{ArtifactStore, RunArtifacts};
pub use filter::{FilterOutcome, SentimentFilter};
pub use pipeline::{InsightPipeline, PipelineRun, RunStats};
pub use synthesize::Synthesizer;
pub use ai_client::TextGenerator;
