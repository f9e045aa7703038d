//! Evaluator seam.
//!
//! Evaluation is an opaque external call. The buffer only produces
//! [`EvalRequest`]s and consumes [`EvalResponse`]s; an [`Evaluator`] carries
//! them to whatever engine does the arithmetic.
//!
//! Two evaluators are provided:
//! - [`InlineEvaluator`] runs a backend during `submit` and queues the
//!   response for the next poll. Deterministic, used by tests and by hosts
//!   whose backend is cheap.
//! - [`ThreadedEvaluator`] runs a blocking backend (such as an HTTP client)
//!   on a worker thread so input handling never waits on it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Result text to place in the buffer
    Success(String),
    /// Error message (only logged, never shown)
    Failure(String),
}

impl EvaluationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// A normalized expression tagged with its request generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRequest {
    pub generation: u64,
    pub expression: String,
}

impl EvalRequest {
    /// Build the response to this request.
    pub fn respond(&self, outcome: EvaluationOutcome) -> EvalResponse {
        EvalResponse {
            generation: self.generation,
            outcome,
        }
    }
}

/// Outcome of a request, carrying the request's generation back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResponse {
    pub generation: u64,
    pub outcome: EvaluationOutcome,
}

// ============================================================================
// Wire format
// ============================================================================

/// Request body sent to a remote evaluator: `{"expression": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCall {
    pub expression: String,
}

/// Result value as returned by an evaluator: a number or preformatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Response body of a remote evaluator: `{success, result?, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvalResult {
    /// Parse a JSON response body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Convert to an outcome.
    ///
    /// `success` without a `result` counts as a failure: there is nothing to
    /// put in the buffer.
    pub fn into_outcome(self) -> EvaluationOutcome {
        match (self.success, self.result) {
            (true, Some(value)) => EvaluationOutcome::Success(value.to_string()),
            (true, None) => EvaluationOutcome::Failure(
                self.error
                    .unwrap_or_else(|| "evaluator returned no result".to_string()),
            ),
            (false, _) => EvaluationOutcome::Failure(
                self.error
                    .unwrap_or_else(|| "evaluation failed".to_string()),
            ),
        }
    }
}

impl From<EvaluationOutcome> for EvalResult {
    fn from(outcome: EvaluationOutcome) -> Self {
        match outcome {
            EvaluationOutcome::Success(text) => Self {
                success: true,
                result: Some(ResultValue::Text(text)),
                error: None,
            },
            EvaluationOutcome::Failure(message) => Self {
                success: false,
                result: None,
                error: Some(message),
            },
        }
    }
}

// ============================================================================
// Backends and evaluators
// ============================================================================

/// Something that can evaluate a normalized expression, blocking the caller.
pub trait EvalBackend {
    fn evaluate(&self, expression: &str) -> EvaluationOutcome;
}

impl<F> EvalBackend for F
where
    F: Fn(&str) -> EvaluationOutcome,
{
    fn evaluate(&self, expression: &str) -> EvaluationOutcome {
        self(expression)
    }
}

/// Asynchronous evaluator seam: submit now, collect later.
///
/// `submit` must not block on the evaluation itself. Responses may come back
/// in any order; the buffer discards those it no longer waits for.
pub trait Evaluator {
    /// Hand a request to the evaluator.
    fn submit(&mut self, request: EvalRequest);

    /// Take one finished response, if any.
    fn poll_response(&mut self) -> Option<EvalResponse>;
}

/// Evaluates on submit and queues the response for the next poll.
pub struct InlineEvaluator<B: EvalBackend> {
    backend: B,
    ready: VecDeque<EvalResponse>,
}

impl<B: EvalBackend> InlineEvaluator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            ready: VecDeque::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: EvalBackend> Evaluator for InlineEvaluator<B> {
    fn submit(&mut self, request: EvalRequest) {
        let outcome = self.backend.evaluate(&request.expression);
        self.ready.push_back(request.respond(outcome));
    }

    fn poll_response(&mut self) -> Option<EvalResponse> {
        self.ready.pop_front()
    }
}

/// Runs a blocking backend on a dedicated worker thread.
///
/// Requests are processed in submission order. Dropping the evaluator closes
/// the request channel and joins the worker after its current request.
pub struct ThreadedEvaluator {
    requests: Option<Sender<EvalRequest>>,
    responses: Receiver<EvalResponse>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedEvaluator {
    /// Spawn the worker thread.
    pub fn spawn<B>(backend: B) -> std::io::Result<Self>
    where
        B: EvalBackend + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<EvalRequest>();
        let (response_tx, response_rx) = mpsc::channel::<EvalResponse>();

        let worker = std::thread::Builder::new()
            .name("mathpad-evaluator".to_string())
            .spawn(move || {
                for request in request_rx {
                    let outcome = backend.evaluate(&request.expression);
                    if response_tx.send(request.respond(outcome)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(worker),
        })
    }

    /// Block until a response arrives or `timeout` elapses.
    pub fn wait_response(&mut self, timeout: Duration) -> Option<EvalResponse> {
        self.responses.recv_timeout(timeout).ok()
    }
}

impl Evaluator for ThreadedEvaluator {
    fn submit(&mut self, request: EvalRequest) {
        let generation = request.generation;
        let sent = self
            .requests
            .as_ref()
            .map(|tx| tx.send(request).is_ok())
            .unwrap_or(false);
        if !sent {
            tracing::warn!(generation, "evaluator worker is gone, request dropped");
        }
    }

    fn poll_response(&mut self) -> Option<EvalResponse> {
        self.responses.try_recv().ok()
    }
}

impl Drop for ThreadedEvaluator {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("evaluator worker panicked");
            }
        }
    }
}
