use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::policy::{RetryDecision, RetryPolicy};
use super::types::{bare_model_name, LlmClient, ModelInfo};
use super::GatewayError;
use crate::pipeline::prompt::{TIP_FALLBACK, TIP_PROMPT};

/// Result of one gateway query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// A model produced non-empty text.
    Answered { model: String, text: String },
    /// Every candidate failed.
    Exhausted { last_error: Option<GatewayError> },
    /// No credentials; nothing was attempted beyond the first call.
    Unconfigured,
}

enum CandidateResult {
    Answered(String),
    Failed(GatewayError),
    Abort(GatewayError),
}

/// Models available for content generation, as reported by the provider.
#[derive(Debug, Clone, Serialize)]
pub struct ModelAvailability {
    pub models: Vec<ModelInfo>,
    /// Highest-priority configured candidate.
    pub recommended: Option<String>,
    pub recommended_available: bool,
}

/// Fallover wrapper around an `LlmClient`.
pub struct ModelGateway {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
    tip_model: String,
}

impl ModelGateway {
    pub fn new(client: Arc<dyn LlmClient>, policy: RetryPolicy, tip_model: String) -> Self {
        Self {
            client,
            policy,
            tip_model,
        }
    }

    /// Models to try this turn: the sticky model first, then every other
    /// candidate in priority order.
    fn attempt_order(&self, sticky: Option<&str>) -> Vec<String> {
        let mut order: Vec<String> = sticky.map(String::from).into_iter().collect();
        order.extend(
            self.policy
                .candidates
                .iter()
                .filter(|c| Some(c.as_str()) != sticky)
                .cloned(),
        );
        order
    }

    /// Send `prompt` through the candidate chain.
    ///
    /// `sticky` is the session's last successful model. It is replaced by
    /// the model that answers, and cleared when the chain is exhausted so
    /// the next turn starts again from the top of the list.
    pub fn query(&self, sticky: &mut Option<String>, prompt: &str) -> GatewayOutcome {
        let order = self.attempt_order(sticky.as_deref());
        let mut last_error = None;

        for model in order {
            match self.try_candidate(&model, prompt) {
                CandidateResult::Answered(text) => {
                    tracing::info!(model = %model, "Triage model answered");
                    *sticky = Some(model.clone());
                    return GatewayOutcome::Answered { model, text };
                }
                CandidateResult::Failed(e) => {
                    last_error = Some(e);
                }
                CandidateResult::Abort(e) => {
                    *sticky = None;
                    if e == GatewayError::MissingApiKey {
                        tracing::error!("No API key configured, skipping model calls");
                        return GatewayOutcome::Unconfigured;
                    }
                    tracing::error!(model = %model, error = %e, "Model chain aborted");
                    return GatewayOutcome::Exhausted {
                        last_error: Some(e),
                    };
                }
            }
        }

        *sticky = None;
        tracing::error!(
            candidates = self.policy.candidates.len(),
            last_error = ?last_error.as_ref().map(ToString::to_string),
            "All candidate models failed"
        );
        GatewayOutcome::Exhausted { last_error }
    }

    fn try_candidate(&self, model: &str, prompt: &str) -> CandidateResult {
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!(model, attempt, "Calling model");

            let error = match self.client.generate(model, prompt) {
                Ok(text) if !text.trim().is_empty() => return CandidateResult::Answered(text),
                Ok(_) => GatewayError::EmptyResponse(model.to_string()),
                Err(e) => e,
            };

            match self.policy.decide(&error, attempt) {
                RetryDecision::RetrySame(delay) => {
                    tracing::warn!(model, attempt, error = %error, "Model call failed, retrying");
                    pause(delay);
                }
                RetryDecision::NextCandidate(delay) => {
                    tracing::warn!(
                        model,
                        attempt,
                        class = ?(self.policy.classify)(&error),
                        error = %error,
                        "Model unavailable, trying next candidate"
                    );
                    pause(delay);
                    return CandidateResult::Failed(error);
                }
                RetryDecision::Abort => return CandidateResult::Abort(error),
            }
        }
    }

    /// One-shot pet-care tip. Never fails; any problem yields the
    /// built-in tip.
    pub fn tip(&self) -> String {
        match self.client.generate(&self.tip_model, TIP_PROMPT) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::debug!(model = %self.tip_model, "Tip model returned no text");
                TIP_FALLBACK.to_string()
            }
            Err(e) => {
                tracing::debug!(model = %self.tip_model, error = %e, "Tip generation failed");
                TIP_FALLBACK.to_string()
            }
        }
    }

    /// Generation-capable models visible to the configured key.
    pub fn available_models(&self) -> Result<ModelAvailability, GatewayError> {
        let models: Vec<ModelInfo> = self
            .client
            .list_models()?
            .into_iter()
            .filter(ModelInfo::supports_generation)
            .collect();

        let recommended = self.policy.candidates.first().cloned();
        let recommended_available = recommended.as_deref().is_some_and(|r| {
            let r = bare_model_name(r);
            models.iter().any(|m| m.name == r)
        });

        Ok(ModelAvailability {
            models,
            recommended,
            recommended_available,
        })
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}
