use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// TextGenerator Trait
// =============================================================================

/// A language model that turns a single prompt into text.
///
/// When `schema` is given, runtimes that support schema-forced decoding must
/// use it; others fall back to instruction-following alone. The returned
/// string is the model's raw output, fences and all.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, schema: Option<&serde_json::Value>) -> Result<String>;

    /// Resolve the model once before serving (cache check, weights fetch,
    /// endpoint check). Generators with nothing to resolve keep the default.
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }

    /// Identifier used in logs.
    fn model_name(&self) -> &str;
}
