//! Remote evaluation over HTTP.
//!
//! The evaluation service takes `POST {"expression": "8/2"}` and answers
//! `{"success": true, "result": 4}` or `{"success": false, "error": "..."}`.
//!
//! Uses the `reqwest` blocking client, so no async runtime is needed. Run it
//! behind a `ThreadedEvaluator` to keep input handling responsive.

use crate::config::MathpadConfig;
use anyhow::Context;
use mathpad_core::{EvalBackend, EvalCall, EvalResult, EvaluationOutcome};
use std::time::Duration;

/// Client for a remote evaluation service.
#[derive(Debug, Clone)]
pub struct RemoteEvaluator {
    endpoint: String,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl RemoteEvaluator {
    /// Create a client for `endpoint`. Each request is bounded by `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            client,
        })
    }

    /// Use a preconfigured client, e.g. one with custom proxy settings.
    pub fn with_client(
        endpoint: impl Into<String>,
        timeout: Duration,
        client: reqwest::blocking::Client,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            client,
        }
    }

    pub fn from_config(config: &MathpadConfig) -> anyhow::Result<Self> {
        Self::new(config.endpoint.clone(), config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one expression and decode the service's answer.
    pub fn query(&self, expression: &str) -> anyhow::Result<EvalResult> {
        let body = EvalCall {
            expression: expression.to_string(),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .with_context(|| format!("sending expression to {}", self.endpoint))?
            .error_for_status()?;
        let result = response
            .json::<EvalResult>()
            .context("decoding evaluator response")?;
        Ok(result)
    }
}

impl EvalBackend for RemoteEvaluator {
    /// Transport and decode failures become `Failure` outcomes.
    fn evaluate(&self, expression: &str) -> EvaluationOutcome {
        match self.query(expression) {
            Ok(result) => result.into_outcome(),
            Err(err) => {
                tracing::debug!(error = %format!("{err:#}"), "remote evaluation failed");
                EvaluationOutcome::Failure(format!("{err:#}"))
            }
        }
    }
}
