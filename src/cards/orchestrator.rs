//! Card generation orchestrator
//!
//! Drives one job through its phases:
//!
//! ```text
//! CHUNKING → GENERATING → REVIEWING → (SUPPLEMENTING → REVIEWING)* → DONE | FAILED
//! ```
//!
//! Chunk failures are isolated: a job fails only when every chunk fails or
//! nothing survives review and supplementing.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::chunker::chunk_units;
use super::generator::ChunkGenerator;
use super::progress::{ProgressEvent, ProgressSink, emit};
use super::retry::RetryPolicy;
use super::review::QualityGate;
use super::supplement::{SupplementRequest, SupplementalGenerator};
use crate::ai::prompt::PromptCatalog;
use crate::ai::provider::SharedInference;
use crate::config::GenerationConfig;
use crate::types::{CandidateCard, CardStatus, ForgeError, RejectedCard, Result, SourceUnit, render_units};

/// Mutable state of one job's review loop
struct GenerationJob {
    target: usize,
    accepted: Vec<CandidateCard>,
    rejected: Vec<RejectedCard>,
    round: usize,
}

impl GenerationJob {
    fn new(target: usize) -> Self {
        Self {
            target,
            accepted: Vec::new(),
            rejected: Vec::new(),
            round: 0,
        }
    }

    fn deficit(&self) -> usize {
        self.target.saturating_sub(self.accepted.len())
    }

    fn accepted_fronts(&self) -> Vec<String> {
        self.accepted.iter().map(|c| c.front.clone()).collect()
    }

    /// The `size` most recent rejections
    fn failed_sample(&self, size: usize) -> &[RejectedCard] {
        let start = self.rejected.len().saturating_sub(size);
        &self.rejected[start..]
    }
}

pub struct CardOrchestrator {
    generator: ChunkGenerator,
    gate: QualityGate,
    supplementer: SupplementalGenerator,
    settings: GenerationConfig,
}

impl CardOrchestrator {
    pub fn new(
        inference: SharedInference,
        catalog: Arc<dyn PromptCatalog>,
        settings: GenerationConfig,
    ) -> Self {
        Self {
            generator: ChunkGenerator::new(
                inference.clone(),
                catalog.clone(),
                RetryPolicy::from_config(&settings),
            ),
            gate: QualityGate::new(inference.clone()),
            supplementer: SupplementalGenerator::new(inference, catalog),
            settings,
        }
    }

    /// Generate, review and top up cards for `units`
    ///
    /// Returns at most `max_cards` cards in pool order. Recommended cards are
    /// accepted first, then non-recommended ones until `min_recommend` cards
    /// are accepted; the rest stay pending. Fails with `GenerationFailed` when
    /// every chunk fails or the final pool is empty.
    #[instrument(skip_all, fields(units = units.len(), category = %category))]
    pub async fn generate_cards(
        &self,
        units: &[SourceUnit],
        category: &str,
        session_key: Option<&str>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<CandidateCard>> {
        let candidates = self
            .generate_candidates(units, category, session_key, progress)
            .await?;

        let target = self.settings.target_for(units.len());
        let pool = self
            .review_loop(units, category, session_key, candidates, target)
            .await;

        let cards = finalize(pool, self.settings.max_cards, self.settings.min_recommend)?;
        info!(
            "Generated {} cards ({} accepted, target {})",
            cards.len(),
            cards
                .iter()
                .filter(|c| c.status == CardStatus::Accepted)
                .count(),
            target
        );
        Ok(cards)
    }

    /// CHUNKING and GENERATING: candidates in chunk order
    async fn generate_candidates(
        &self,
        units: &[SourceUnit],
        category: &str,
        session_key: Option<&str>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<CandidateCard>> {
        let chunks = chunk_units(units, self.settings.chunk_size, self.settings.min_chunk_chars);
        if chunks.is_empty() {
            return Err(ForgeError::GenerationFailed(
                "no source units to generate from".to_string(),
            ));
        }

        let total = chunks.len();
        info!("{} units in {} chunks", units.len(), total);
        emit(progress, ProgressEvent::generating(0, total));

        let mut results: Vec<Option<Vec<CandidateCard>>> = vec![None; total];
        let mut completed = 0;

        let mut pending = stream::iter(chunks.iter().enumerate())
            .map(|(i, chunk)| async move {
                (i, self.generator.generate(chunk, i, category, session_key).await)
            })
            .buffer_unordered(total);

        while let Some((i, result)) = pending.next().await {
            completed += 1;
            match result {
                Ok(cards) => results[i] = Some(cards),
                Err(e) => warn!("chunk {} failed after retries: {}", i, e),
            }
            emit(progress, ProgressEvent::generating(completed, total));
        }

        let failed = results.iter().filter(|r| r.is_none()).count();
        if failed == total {
            return Err(ForgeError::GenerationFailed(format!(
                "all {} chunks failed",
                total
            )));
        }
        if failed > 0 {
            warn!("{} of {} chunks produced no cards", failed, total);
        }
        emit(progress, ProgressEvent::reviewing(total));

        Ok(results.into_iter().flatten().flatten().collect())
    }

    /// REVIEWING and SUPPLEMENTING: the accepted pool
    async fn review_loop(
        &self,
        units: &[SourceUnit],
        category: &str,
        session_key: Option<&str>,
        candidates: Vec<CandidateCard>,
        target: usize,
    ) -> Vec<CandidateCard> {
        let source_text = render_units(units);
        let mut job = GenerationJob::new(target);
        let mut batch = candidates;

        loop {
            job.round += 1;
            let submitted = batch.len();

            // An empty batch is not reviewed and counts as a zero pass rate
            let pass_rate = if submitted == 0 {
                0.0
            } else {
                let outcome = self
                    .gate
                    .review(batch, &source_text, category, session_key)
                    .await;
                let passed = outcome.passed.len();
                job.accepted.extend(outcome.passed);
                job.rejected.extend(outcome.rejected);
                passed as f32 / submitted as f32
            };

            info!(
                round = job.round,
                submitted,
                pass_rate,
                pool = job.accepted.len(),
                target,
                "Review round complete"
            );

            if pass_rate >= self.settings.pass_threshold || job.accepted.len() >= job.target {
                break;
            }
            if job.round >= self.settings.max_review_rounds {
                info!("Review rounds exhausted with a deficit of {}", job.deficit());
                break;
            }

            let accepted_fronts = job.accepted_fronts();
            let supplemental = self
                .supplementer
                .supplement(SupplementRequest {
                    units,
                    category,
                    accepted_fronts: &accepted_fronts,
                    failed_samples: job.failed_sample(self.settings.failed_sample_size),
                    deficit: job.deficit(),
                    session_key,
                })
                .await;

            if supplemental.is_empty() {
                info!("No supplemental cards, ending review");
                break;
            }
            batch = supplemental;
        }

        job.accepted
    }
}

/// Cap the pool and assign final statuses
pub(crate) fn finalize(
    mut pool: Vec<CandidateCard>,
    max_cards: usize,
    min_recommend: usize,
) -> Result<Vec<CandidateCard>> {
    pool.truncate(max_cards);
    if pool.is_empty() {
        return Err(ForgeError::GenerationFailed(
            "no cards survived generation and review".to_string(),
        ));
    }

    let mut accepted = 0;
    for card in pool.iter_mut() {
        card.status = if card.recommended {
            accepted += 1;
            CardStatus::Accepted
        } else {
            CardStatus::Pending
        };
    }

    for card in pool.iter_mut().filter(|c| !c.recommended) {
        if accepted >= min_recommend {
            break;
        }
        card.status = CardStatus::Accepted;
        accepted += 1;
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompt::BuiltinCatalog;
    use crate::cards::progress::{GenerationPhase, RecordingSink};
    use crate::cards::test_support::*;

    fn settings() -> GenerationConfig {
        GenerationConfig {
            retry_delays_secs: vec![0],
            ..Default::default()
        }
    }

    fn orchestrator(stub: Arc<ScriptedInference>, settings: GenerationConfig) -> CardOrchestrator {
        CardOrchestrator::new(stub, Arc::new(BuiltinCatalog::new()), settings)
    }

    fn units(n: u32, chars: usize) -> Vec<SourceUnit> {
        (1..=n)
            .map(|i| SourceUnit::new(i, "x".repeat(chars)))
            .collect()
    }

    /// Three cards per unit in the request, fronts named after unit and position
    fn three_per_unit(request: &crate::ai::provider::InvokeRequest) -> Result<String> {
        let fronts: Vec<(String, u32)> = units_in(request)
            .into_iter()
            .flat_map(|u| (0..3).map(move |k| (format!("u{u}-c{k}"), u)))
            .collect();
        let refs: Vec<(&str, u32)> = fronts.iter().map(|(f, u)| (f.as_str(), *u)).collect();
        Ok(cards_response(&refs))
    }

    fn card(front: &str, recommended: bool) -> CandidateCard {
        CandidateCard::new(front, "A", "E", 1, "definition").with_recommended(recommended)
    }

    #[tokio::test]
    async fn test_small_document_single_generation_call() {
        let stub = Arc::new(ScriptedInference::new(|kind, request, _| match kind {
            RequestKind::Generate => three_per_unit(request),
            _ => pass_all(),
        }));
        let cards = orchestrator(stub.clone(), settings())
            .generate_cards(&units(3, 100), "definition", None, None)
            .await
            .unwrap();

        assert_eq!(stub.calls(RequestKind::Generate), 1);
        assert_eq!(stub.calls(RequestKind::Review), 1);
        assert_eq!(stub.calls(RequestKind::Supplement), 0);
        assert_eq!(cards.len(), 9);
    }

    #[tokio::test]
    async fn test_short_tail_merges_into_two_chunks() {
        let stub = Arc::new(ScriptedInference::new(|kind, request, _| match kind {
            RequestKind::Generate => three_per_unit(request),
            _ => pass_all(),
        }));
        orchestrator(stub.clone(), settings())
            .generate_cards(&units(12, 150), "definition", None, None)
            .await
            .unwrap();

        let mut spans: Vec<Vec<u32>> = stub
            .requests(RequestKind::Generate)
            .iter()
            .map(units_in)
            .collect();
        spans.sort();
        assert_eq!(spans, vec![(1..=5).collect::<Vec<_>>(), (6..=12).collect()]);
    }

    #[tokio::test]
    async fn test_timed_out_chunk_does_not_sink_siblings() {
        let stub = Arc::new(ScriptedInference::new(|kind, request, _| match kind {
            RequestKind::Generate if units_in(request).contains(&1) => Err(timeout_error()),
            RequestKind::Generate => three_per_unit(request),
            _ => pass_all(),
        }));
        let cards = orchestrator(stub.clone(), settings())
            .generate_cards(&units(10, 200), "definition", None, None)
            .await
            .unwrap();

        // 3 attempts for the failing chunk, 1 for the healthy one
        assert_eq!(stub.calls(RequestKind::Generate), 4);
        assert!(!cards.is_empty());
        assert!(cards.iter().all(|c| c.evidence_source_index > 5));
    }

    #[tokio::test]
    async fn test_all_chunks_failing_is_fatal() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| Err(timeout_error())));
        let err = orchestrator(stub.clone(), settings())
            .generate_cards(&units(10, 200), "definition", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeError::GenerationFailed(_)));
        assert_eq!(stub.calls(RequestKind::Generate), 6);
        assert_eq!(stub.calls(RequestKind::Review), 0);
    }

    #[tokio::test]
    async fn test_low_pass_rate_requests_supplement_for_deficit() {
        // 5 units: target 20. 13 candidates, 5 rejected: pool 8, pass rate ~0.62
        let stub = Arc::new(ScriptedInference::new(|kind, _, call| match kind {
            RequestKind::Generate => {
                let fronts: Vec<String> = (0..13).map(|i| format!("Q{i}")).collect();
                let refs: Vec<(&str, u32)> = fronts.iter().map(|f| (f.as_str(), 1)).collect();
                Ok(cards_response(&refs))
            }
            RequestKind::Review if call == 1 => fail_positions(&[0, 1, 2, 3, 4]),
            RequestKind::Review => pass_all(),
            RequestKind::Supplement => Ok("[]".to_string()),
        }));
        let cards = orchestrator(stub.clone(), settings())
            .generate_cards(&units(5, 100), "definition", Some("job"), None)
            .await
            .unwrap();

        assert_eq!(cards.len(), 8);
        let supplements = stub.requests(RequestKind::Supplement);
        assert_eq!(supplements.len(), 1);
        assert!(supplements[0].user_content.contains("at least 12 new cards"));
        assert!(supplements[0].user_content.contains("- Q0 (reason: unsupported)"));
        assert!(supplements[0].user_content.contains("- Q12"));
    }

    fn numbered_cards(count: usize) -> Result<String> {
        let fronts: Vec<String> = (0..count).map(|i| format!("Q{i}")).collect();
        let refs: Vec<(&str, u32)> = fronts.iter().map(|f| (f.as_str(), 1)).collect();
        Ok(cards_response(&refs))
    }

    #[tokio::test]
    async fn test_target_reached_stops_despite_low_pass_rate() {
        // 1 unit: target 10. 20 candidates, half rejected: pass rate 0.5, pool 10
        let stub = Arc::new(ScriptedInference::new(|kind, _, _| match kind {
            RequestKind::Generate => numbered_cards(20),
            RequestKind::Review => fail_positions(&(0..10).collect::<Vec<_>>()),
            RequestKind::Supplement => Ok(cards_response(&[("extra", 1)])),
        }));
        let cards = orchestrator(stub.clone(), settings())
            .generate_cards(&units(1, 100), "definition", None, None)
            .await
            .unwrap();

        assert_eq!(cards.len(), 10);
        assert_eq!(cards[0].front, "Q10");
        assert_eq!(stub.calls(RequestKind::Review), 1);
        assert_eq!(stub.calls(RequestKind::Supplement), 0);
    }

    #[tokio::test]
    async fn test_pass_rate_at_threshold_stops() {
        // 4 of 5 pass: exactly 0.8, pool 4 still below target 10
        let stub = Arc::new(ScriptedInference::new(|kind, _, _| match kind {
            RequestKind::Generate => numbered_cards(5),
            RequestKind::Review => fail_positions(&[2]),
            RequestKind::Supplement => Ok(cards_response(&[("extra", 1)])),
        }));
        let cards = orchestrator(stub.clone(), settings())
            .generate_cards(&units(1, 100), "definition", None, None)
            .await
            .unwrap();

        assert_eq!(cards.len(), 4);
        assert_eq!(stub.calls(RequestKind::Supplement), 0);
    }

    #[tokio::test]
    async fn test_supplement_round_feeds_pool() {
        let stub = Arc::new(ScriptedInference::new(|kind, _, call| match kind {
            RequestKind::Generate => Ok(cards_response(&[("A", 1), ("B", 1)])),
            RequestKind::Review if call == 1 => fail_positions(&[1]),
            RequestKind::Review => pass_all(),
            RequestKind::Supplement => Ok(cards_response(&[("A", 1), ("C", 1), ("D", 1)])),
        }));
        let cards = orchestrator(stub.clone(), settings())
            .generate_cards(&units(1, 100), "definition", None, None)
            .await
            .unwrap();

        let fronts: Vec<_> = cards.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["A", "C", "D"]);
        // Round 2 passed everything, so no third round
        assert_eq!(stub.calls(RequestKind::Review), 2);
        assert_eq!(stub.calls(RequestKind::Supplement), 1);
    }

    #[tokio::test]
    async fn test_review_rounds_are_bounded() {
        let stub = Arc::new(ScriptedInference::new(|kind, _, call| match kind {
            RequestKind::Generate => Ok(cards_response(&[("G0", 1), ("G1", 1)])),
            RequestKind::Review => fail_positions(&[0]),
            RequestKind::Supplement => {
                let a = format!("S{call}a");
                let b = format!("S{call}b");
                Ok(cards_response(&[(a.as_str(), 1), (b.as_str(), 1)]))
            }
        }));
        let cards = orchestrator(stub.clone(), settings())
            .generate_cards(&units(1, 100), "definition", None, None)
            .await
            .unwrap();

        assert_eq!(stub.calls(RequestKind::Review), 3);
        assert_eq!(stub.calls(RequestKind::Supplement), 2);
        assert_eq!(cards.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_generation_tries_supplement_then_fails() {
        let stub = Arc::new(ScriptedInference::new(|_, _, _| Ok("[]".to_string())));
        let err = orchestrator(stub.clone(), settings())
            .generate_cards(&units(2, 100), "definition", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeError::GenerationFailed(_)));
        assert_eq!(stub.calls(RequestKind::Review), 0);
        assert_eq!(stub.calls(RequestKind::Supplement), 1);
    }

    #[tokio::test]
    async fn test_review_outage_fails_open() {
        let stub = Arc::new(ScriptedInference::new(|kind, request, _| match kind {
            RequestKind::Generate => three_per_unit(request),
            _ => Err(ForgeError::ExternalService("reviewer down".into())),
        }));
        let cards = orchestrator(stub.clone(), settings())
            .generate_cards(&units(2, 100), "definition", None, None)
            .await
            .unwrap();

        assert_eq!(cards.len(), 6);
        assert_eq!(stub.calls(RequestKind::Supplement), 0);
    }

    #[tokio::test]
    async fn test_output_capped_and_minimum_accepted() {
        let stub = Arc::new(ScriptedInference::new(|kind, request, _| match kind {
            RequestKind::Generate => three_per_unit(request),
            _ => pass_all(),
        }));
        let settings = GenerationConfig {
            max_cards: 20,
            min_target: 10,
            ..settings()
        };
        let cards = orchestrator(stub, settings)
            .generate_cards(&units(12, 300), "definition", None, None)
            .await
            .unwrap();

        assert_eq!(cards.len(), 20);
        assert_eq!(cards[0].front, "u1-c0");
        assert!(
            cards
                .iter()
                .filter(|c| c.status == CardStatus::Accepted)
                .count()
                >= 10
        );
    }

    #[tokio::test]
    async fn test_progress_events() {
        let stub = Arc::new(ScriptedInference::new(|kind, request, _| match kind {
            RequestKind::Generate => three_per_unit(request),
            _ => pass_all(),
        }));
        let sink = RecordingSink::default();
        orchestrator(stub, settings())
            .generate_cards(&units(15, 200), "definition", None, Some(&sink))
            .await
            .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], ProgressEvent::generating(0, 3));
        for (k, event) in events[1..4].iter().enumerate() {
            assert_eq!(event.completed_chunks, k + 1);
            assert_eq!(event.phase, GenerationPhase::Generating);
        }
        assert_eq!(events[4], ProgressEvent::reviewing(3));
    }

    #[tokio::test]
    async fn test_deterministic_with_deterministic_stub() {
        let run = || async {
            let stub = Arc::new(ScriptedInference::new(|kind, request, call| match kind {
                RequestKind::Generate => three_per_unit(request),
                RequestKind::Review if call == 1 => fail_positions(&[2, 7, 11]),
                RequestKind::Review => pass_all(),
                RequestKind::Supplement => Ok(cards_response(&[("extra", 3)])),
            }));
            orchestrator(stub, settings())
                .generate_cards(&units(11, 200), "cloze", Some("s"), None)
                .await
                .unwrap()
        };

        let first = run().await;
        let second = run().await;
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| a.same_content(b)));
    }

    #[test]
    fn test_finalize_truncates_in_order() {
        let pool: Vec<_> = (0..25).map(|i| card(&format!("c{i}"), true)).collect();
        let cards = finalize(pool, 20, 10).unwrap();
        assert_eq!(cards.len(), 20);
        assert_eq!(cards[0].front, "c0");
        assert_eq!(cards[19].front, "c19");
    }

    #[test]
    fn test_finalize_promotes_non_recommended_in_order() {
        let pool = vec![
            card("r0", true),
            card("n0", false),
            card("r1", true),
            card("n1", false),
            card("n2", false),
        ];
        let cards = finalize(pool, 30, 4).unwrap();
        let statuses: Vec<_> = cards.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![
                CardStatus::Accepted,
                CardStatus::Accepted,
                CardStatus::Accepted,
                CardStatus::Accepted,
                CardStatus::Pending
            ]
        );
    }

    #[test]
    fn test_finalize_small_pool_all_accepted() {
        let pool = vec![card("n0", false), card("n1", false)];
        let cards = finalize(pool, 30, 10).unwrap();
        assert!(cards.iter().all(|c| c.status == CardStatus::Accepted));
    }

    #[test]
    fn test_finalize_empty_pool_fails() {
        assert!(matches!(
            finalize(Vec::new(), 30, 10),
            Err(ForgeError::GenerationFailed(_))
        ));
    }

    #[test]
    fn test_failed_sample_keeps_most_recent() {
        let mut job = GenerationJob::new(10);
        job.rejected = (0..15)
            .map(|i| RejectedCard {
                card: card(&format!("f{i}"), true),
                reason: "r".into(),
            })
            .collect();
        let sample = job.failed_sample(10);
        assert_eq!(sample.len(), 10);
        assert_eq!(sample[0].card.front, "f5");
    }
}
