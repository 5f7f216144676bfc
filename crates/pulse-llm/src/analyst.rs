//! One-shot analysis call with model discovery and rate-limit downgrade

use crate::{CompletionRequest, CompletionResponse, LLMProvider, ModelPreference, Result};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Sends a prompt to the best available model
///
/// The only retry is a single downgrade to the fallback tier when the
/// preferred model is rate limited.
pub struct Analyst {
    provider: Arc<dyn LLMProvider>,
    preference: ModelPreference,
    temperature: Option<f32>,
}

impl Analyst {
    /// Create an analyst with the default model preference
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            preference: ModelPreference::default(),
            temperature: None,
        }
    }

    /// Replace the model preference list
    pub fn with_preference(mut self, preference: ModelPreference) -> Self {
        self.preference = preference;
        self
    }

    /// Set sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Resolve the model to use along with the advertised model list
    ///
    /// A failed listing is not an error: the default model is used.
    pub async fn discover_model(&self) -> (String, Vec<String>) {
        match self.provider.list_models().await {
            Ok(available) => (self.preference.resolve(&available), available),
            Err(e) => {
                warn!(error = %e, "model discovery failed, using default model");
                (self.preference.default_model().to_string(), Vec::new())
            }
        }
    }

    /// Run the prompt and return the full response
    #[instrument(skip(self, prompt), fields(prompt_chars = prompt.chars().count()))]
    pub async fn complete(&self, prompt: &str) -> Result<CompletionResponse> {
        let (model, available) = self.discover_model().await;
        info!(%model, "sending analysis request");

        let mut builder = CompletionRequest::builder(model.as_str()).prompt(prompt);
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        let request = builder.build();

        match self.provider.complete(request.clone()).await {
            Err(e) if e.is_rate_limited() => {
                let Some(fallback) = self.preference.fallback_for(&model, &available) else {
                    return Err(e);
                };
                warn!(%model, %fallback, "rate limited, retrying once on fallback model");
                self.provider.complete(request.with_model(fallback)).await
            }
            other => other,
        }
    }

    /// Run the prompt and return `(text, model)`
    pub async fn call(&self, prompt: &str) -> Result<(String, String)> {
        let response = self.complete(prompt).await?;
        Ok((response.text, response.model))
    }
}
