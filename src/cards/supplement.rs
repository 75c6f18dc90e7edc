//! Supplemental generation for a measured card deficit

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ai::prompt::{PromptCatalog, PromptTemplates};
use crate::ai::provider::{InvokeRequest, SharedInference};
use crate::ai::validation::parse_cards;
use crate::types::{CandidateCard, RejectedCard, Result, SourceUnit, front_key};

pub struct SupplementRequest<'a> {
    pub units: &'a [SourceUnit],
    pub category: &'a str,
    /// Fronts already in the accepted pool
    pub accepted_fronts: &'a [String],
    /// Recent rejections with their reasons
    pub failed_samples: &'a [RejectedCard],
    pub deficit: usize,
    pub session_key: Option<&'a str>,
}

pub struct SupplementalGenerator {
    inference: SharedInference,
    catalog: Arc<dyn PromptCatalog>,
}

impl SupplementalGenerator {
    pub fn new(inference: SharedInference, catalog: Arc<dyn PromptCatalog>) -> Self {
        Self { inference, catalog }
    }

    /// New cards, never duplicating an accepted front
    ///
    /// Errors are logged and yield an empty batch.
    pub async fn supplement(&self, request: SupplementRequest<'_>) -> Vec<CandidateCard> {
        match self.try_supplement(&request).await {
            Ok(cards) => {
                let cards = dedupe(cards, request.accepted_fronts);
                info!(
                    "Supplement: {} new cards for a deficit of {}",
                    cards.len(),
                    request.deficit
                );
                cards
            }
            Err(e) => {
                warn!("Supplemental generation failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_supplement(&self, request: &SupplementRequest<'_>) -> Result<Vec<CandidateCard>> {
        let invoke = InvokeRequest::new(
            PromptTemplates::supplement_system(self.catalog.as_ref(), request.category),
            PromptTemplates::supplement_user(
                request.units,
                request.accepted_fronts,
                request.failed_samples,
                request.deficit,
            ),
        )
        .with_session(request.session_key);

        let raw = self.inference.invoke(&invoke).await?;
        parse_cards(&raw, request.units, request.category, "supplement")
    }
}

/// Drop cards whose front matches an accepted front or an earlier card
fn dedupe(cards: Vec<CandidateCard>, accepted_fronts: &[String]) -> Vec<CandidateCard> {
    let mut seen: HashSet<String> = accepted_fronts.iter().map(|f| front_key(f)).collect();
    let before = cards.len();

    let unique: Vec<CandidateCard> = cards
        .into_iter()
        .filter(|card| seen.insert(front_key(&card.front)))
        .collect();

    if unique.len() < before {
        debug!("Supplement: dropped {} duplicate cards", before - unique.len());
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompt::BuiltinCatalog;
    use crate::cards::test_support::*;
    use crate::types::ForgeError;

    fn units() -> Vec<SourceUnit> {
        vec![SourceUnit::new(1, "alpha"), SourceUnit::new(2, "beta")]
    }

    fn supplementer(stub: Arc<ScriptedInference>) -> SupplementalGenerator {
        SupplementalGenerator::new(stub, Arc::new(BuiltinCatalog::new()))
    }

    #[tokio::test]
    async fn test_dedupes_against_accepted_and_itself() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| {
            Ok(cards_response(&[
                ("What is  ALPHA?", 1),
                ("What is beta?", 2),
                ("what is beta?", 2),
                ("New one", 1),
            ]))
        }));
        let units = units();
        let accepted = vec!["What is alpha?".to_string()];

        let cards = supplementer(stub.clone())
            .supplement(SupplementRequest {
                units: &units,
                category: "definition",
                accepted_fronts: &accepted,
                failed_samples: &[],
                deficit: 5,
                session_key: None,
            })
            .await;

        let fronts: Vec<_> = cards.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["What is beta?", "New one"]);

        let requests = stub.requests(RequestKind::Supplement);
        assert!(requests[0].user_content.contains("at least 5 new cards"));
        assert!(requests[0].user_content.contains("- What is alpha?"));
    }

    #[tokio::test]
    async fn test_errors_yield_empty() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| {
            Err(ForgeError::ExternalService("exit 2".into()))
        }));
        let units = units();
        let cards = supplementer(stub.clone())
            .supplement(SupplementRequest {
                units: &units,
                category: "definition",
                accepted_fronts: &[],
                failed_samples: &[],
                deficit: 3,
                session_key: None,
            })
            .await;

        assert!(cards.is_empty());
        assert_eq!(stub.calls(RequestKind::Supplement), 1);
    }

    #[tokio::test]
    async fn test_unparseable_output_yields_empty() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| Ok("no more cards".to_string())));
        let units = units();
        let cards = supplementer(stub)
            .supplement(SupplementRequest {
                units: &units,
                category: "definition",
                accepted_fronts: &[],
                failed_samples: &[],
                deficit: 3,
                session_key: None,
            })
            .await;

        assert!(cards.is_empty());
    }
}
