//! Scripted inference stubs shared by pipeline tests

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ai::provider::{Inference, InvokeRequest};
use crate::types::{ForgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Generate,
    Review,
    Supplement,
}

impl RequestKind {
    pub fn of(request: &InvokeRequest) -> Self {
        if request.system_instructions.contains("# Supplement Rules") {
            RequestKind::Supplement
        } else if request
            .system_instructions
            .contains("verifying study flashcards")
        {
            RequestKind::Review
        } else {
            RequestKind::Generate
        }
    }
}

type Handler = Box<dyn Fn(RequestKind, &InvokeRequest, usize) -> Result<String> + Send + Sync>;

/// Inference stub answering through a closure
///
/// The closure gets the request kind, the request, and the 1-based call
/// number for that kind.
pub struct ScriptedInference {
    handler: Handler,
    generate_calls: AtomicUsize,
    review_calls: AtomicUsize,
    supplement_calls: AtomicUsize,
    requests: Mutex<Vec<(RequestKind, InvokeRequest)>>,
}

impl ScriptedInference {
    pub fn new(
        handler: impl Fn(RequestKind, &InvokeRequest, usize) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            generate_calls: AtomicUsize::new(0),
            review_calls: AtomicUsize::new(0),
            supplement_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self, kind: RequestKind) -> usize {
        self.counter(kind).load(Ordering::SeqCst)
    }

    pub fn requests(&self, kind: RequestKind) -> Vec<InvokeRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn counter(&self, kind: RequestKind) -> &AtomicUsize {
        match kind {
            RequestKind::Generate => &self.generate_calls,
            RequestKind::Review => &self.review_calls,
            RequestKind::Supplement => &self.supplement_calls,
        }
    }
}

#[async_trait]
impl Inference for ScriptedInference {
    async fn invoke(&self, request: &InvokeRequest) -> Result<String> {
        let kind = RequestKind::of(request);
        let call = self.counter(kind).fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push((kind, request.clone()));
        tokio::task::yield_now().await;
        (self.handler)(kind, request, call)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// One card object citing `unit`
pub fn card_json(front: &str, unit: u32) -> Value {
    json!({
        "front": front,
        "back": format!("answer to {front}"),
        "evidence": format!("evidence for {front}"),
        "evidenceSourceIndex": unit,
        "recommended": true,
    })
}

/// Generation response with one card per front
pub fn cards_response(fronts: &[(&str, u32)]) -> String {
    let cards: Vec<Value> = fronts.iter().map(|(f, u)| card_json(f, *u)).collect();
    Value::Array(cards).to_string()
}

/// Unit indices named in a generation payload (`=== Unit N ===` headers)
pub fn units_in(request: &InvokeRequest) -> Vec<u32> {
    request
        .user_content
        .lines()
        .filter_map(|line| {
            line.strip_prefix("=== Unit ")?
                .strip_suffix(" ===")?
                .parse()
                .ok()
        })
        .collect()
}

/// Review response passing every card
pub fn pass_all() -> Result<String> {
    Ok("[]".to_string())
}

/// Review response failing the given positions
pub fn fail_positions(positions: &[usize]) -> Result<String> {
    let verdicts: Vec<Value> = positions
        .iter()
        .map(|i| json!({"index": i, "verdict": "fail", "reason": "unsupported"}))
        .collect();
    Ok(Value::Array(verdicts).to_string())
}

pub fn timeout_error() -> ForgeError {
    ForgeError::timeout("stub", std::time::Duration::from_secs(1))
}
