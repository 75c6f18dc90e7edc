//! Per-chunk card generation

use std::sync::Arc;
use tracing::{debug, info};

use super::chunker::Chunk;
use super::retry::RetryPolicy;
use crate::ai::prompt::{PromptCatalog, PromptTemplates};
use crate::ai::provider::{InvokeRequest, SharedInference};
use crate::ai::validation::parse_cards;
use crate::types::{CandidateCard, Result};

/// Generates cards for one chunk, retrying transient failures
pub struct ChunkGenerator {
    inference: SharedInference,
    catalog: Arc<dyn PromptCatalog>,
    retry: RetryPolicy,
}

impl ChunkGenerator {
    pub fn new(inference: SharedInference, catalog: Arc<dyn PromptCatalog>, retry: RetryPolicy) -> Self {
        Self {
            inference,
            catalog,
            retry,
        }
    }

    /// Cards for `chunk`, or the last error once retries are exhausted
    ///
    /// Parse failures, process failures and timeouts are retried. Individual
    /// malformed cards are dropped without failing the chunk.
    pub async fn generate(
        &self,
        chunk: &Chunk,
        chunk_no: usize,
        category: &str,
        session_key: Option<&str>,
    ) -> Result<Vec<CandidateCard>> {
        let context = format!("chunk {}", chunk_no);
        let request = InvokeRequest::new(
            PromptTemplates::generation_system(self.catalog.as_ref(), category),
            PromptTemplates::generation_user(&chunk.units),
        )
        .with_session(session_key);

        if let Some((first, last)) = chunk.span() {
            debug!(
                "{}: units {}-{}, {} chars",
                context,
                first,
                last,
                chunk.char_count()
            );
        }

        let (request, context) = (&request, context.as_str());
        let cards = self
            .retry
            .run(context, || async move {
                let raw = self.inference.invoke(request).await?;
                parse_cards(&raw, &chunk.units, category, context)
            })
            .await?;

        info!("{}: {} cards", context, cards.len());
        Ok(cards)
    }
}
