//! Quality gate
//!
//! One reviewer call per candidate batch. The gate fails open: when the
//! review call or its output is unusable, every candidate passes.

use std::collections::HashMap;
use tracing::{info, warn};

use crate::ai::prompt::PromptTemplates;
use crate::ai::provider::{InvokeRequest, SharedInference};
use crate::ai::validation::{extract_json_array, parse_verdicts};
use crate::types::{CandidateCard, CardStatus, ForgeError, RejectedCard, Result, ReviewVerdict};

/// Split of a reviewed batch
#[derive(Debug, Clone, Default)]
pub struct ReviewOutcome {
    pub passed: Vec<CandidateCard>,
    pub rejected: Vec<RejectedCard>,
}

impl ReviewOutcome {
    /// Every card passes, nothing is recorded as rejected
    pub fn pass_all(cards: Vec<CandidateCard>) -> Self {
        Self {
            passed: cards,
            rejected: Vec::new(),
        }
    }
}

pub struct QualityGate {
    inference: SharedInference,
}

impl QualityGate {
    pub fn new(inference: SharedInference) -> Self {
        Self { inference }
    }

    pub async fn review(
        &self,
        cards: Vec<CandidateCard>,
        source_text: &str,
        category: &str,
        session_key: Option<&str>,
    ) -> ReviewOutcome {
        if cards.is_empty() {
            return ReviewOutcome::default();
        }

        let verdicts = match self.verdicts(&cards, source_text, category, session_key).await {
            Ok(verdicts) => verdicts,
            Err(e) => {
                warn!("Review failed, passing {} cards unreviewed: {}", cards.len(), e);
                return ReviewOutcome::pass_all(cards);
            }
        };

        let submitted = cards.len();
        let mut outcome = ReviewOutcome::default();
        for (position, mut card) in cards.into_iter().enumerate() {
            match verdicts.get(&position) {
                Some(ReviewVerdict::Fail { reason }) => {
                    info!("Review removed card #{}: {}", position, reason);
                    card.status = CardStatus::Rejected;
                    outcome.rejected.push(RejectedCard {
                        card,
                        reason: reason.clone(),
                    });
                }
                // Missing verdicts pass
                Some(ReviewVerdict::Pass) | None => outcome.passed.push(card),
            }
        }

        info!(
            "Review: {} of {} cards passed",
            outcome.passed.len(),
            submitted
        );
        outcome
    }

    async fn verdicts(
        &self,
        cards: &[CandidateCard],
        source_text: &str,
        category: &str,
        session_key: Option<&str>,
    ) -> Result<HashMap<usize, ReviewVerdict>> {
        let request = InvokeRequest::new(
            PromptTemplates::review_system(),
            PromptTemplates::review_user(source_text, cards, category),
        )
        .with_session(session_key);

        let raw = self
            .inference
            .invoke(&request)
            .await
            .map_err(|e| ForgeError::ReviewGateway(e.to_string()))?;
        let items = extract_json_array(&raw, "review")
            .map_err(|e| ForgeError::ReviewGateway(e.to_string()))?;

        Ok(parse_verdicts(&items, cards.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::test_support::*;
    use std::sync::Arc;

    fn cards(n: usize) -> Vec<CandidateCard> {
        (0..n)
            .map(|i| CandidateCard::new(format!("Q{i}"), "A", "E", 1, "definition"))
            .collect()
    }

    fn fronts(cards: &[CandidateCard]) -> Vec<String> {
        cards.iter().map(|c| c.front.clone()).collect()
    }

    #[tokio::test]
    async fn test_fail_open_on_gateway_error() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| Err(timeout_error())));
        let input = cards(4);
        let outcome = QualityGate::new(stub)
            .review(input.clone(), "src", "definition", None)
            .await;

        assert_eq!(fronts(&outcome.passed), fronts(&input));
        assert!(outcome.passed.iter().zip(&input).all(|(a, b)| a.same_content(b)));
        assert!(outcome.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_fail_open_on_unparseable_verdicts() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| {
            Ok("All cards look fine to me.".to_string())
        }));
        let outcome = QualityGate::new(stub)
            .review(cards(3), "src", "definition", None)
            .await;

        assert_eq!(outcome.passed.len(), 3);
        assert!(outcome.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_fails_removed_with_reason() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| fail_positions(&[1, 3])));
        let outcome = QualityGate::new(stub)
            .review(cards(4), "src", "definition", None)
            .await;

        assert_eq!(fronts(&outcome.passed), vec!["Q0", "Q2"]);
        assert_eq!(outcome.rejected.len(), 2);
        assert_eq!(outcome.rejected[0].card.front, "Q1");
        assert_eq!(outcome.rejected[0].reason, "unsupported");
        assert_eq!(outcome.rejected[0].card.status, CardStatus::Rejected);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_call() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| pass_all()));
        let outcome = QualityGate::new(stub.clone())
            .review(Vec::new(), "src", "definition", None)
            .await;

        assert!(outcome.passed.is_empty());
        assert_eq!(stub.calls(RequestKind::Review), 0);
    }

    #[tokio::test]
    async fn test_request_is_a_review() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| pass_all()));
        QualityGate::new(stub.clone())
            .review(cards(2), "the source", "cloze", Some("s1"))
            .await;

        let requests = stub.requests(RequestKind::Review);
        assert_eq!(requests.len(), 1);
        assert!(requests[0].user_content.contains("the source"));
        assert_eq!(requests[0].session_key.as_deref(), Some("s1"));
    }
}
