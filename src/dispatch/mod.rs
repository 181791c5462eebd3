//! Module dispatch: one generation request from context to result.
//!
//! Every request moves through the same stages: the context is built, the
//! credential is resolved, a prompt is composed, the provider is called and
//! its text is normalized. What happens when a stage fails is decided by
//! the dispatcher's [`FailurePolicy`], which applies to all modules alike.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::GenerationContext;
use crate::error::{GenerationError, StructuredError};
use crate::fallback;
use crate::models::{CanonicalResult, GenerationRequest, ModelCredential, ModelListing, Module};
use crate::normalize;
use crate::prompt::{self, Prompt};
use crate::providers::ProviderRegistry;

/// What to do when no usable model answer is available
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Answer from the fallback templates; the caller always gets a result
    #[default]
    Lenient,
    /// Report a structured error; fallback templates are never used
    Strict,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Lenient => "lenient",
            FailurePolicy::Strict => "strict",
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs generation requests against the provider registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    providers: Arc<ProviderRegistry>,
    policy: FailurePolicy,
}

impl Dispatcher {
    pub fn new(providers: Arc<ProviderRegistry>, policy: FailurePolicy) -> Self {
        Self { providers, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Produce the result for one module
    ///
    /// Under [`FailurePolicy::Lenient`] this never returns an error.
    pub async fn generate(
        &self,
        module: Module,
        request: &GenerationRequest,
    ) -> Result<CanonicalResult, StructuredError> {
        let context = GenerationContext::build(request);

        match self.call_provider(module, &context, &request.model).await {
            Ok(result) => Ok(result),
            Err(err) => match self.policy {
                FailurePolicy::Lenient => {
                    tracing::debug!(module = %module, reason = %err, "Using fallback result");
                    Ok(fallback::generate(module, &context))
                }
                FailurePolicy::Strict => {
                    tracing::warn!(module = %module, kind = %err.kind(), "Generation failed: {}", err);
                    Err(err.localize(context.is_zh))
                }
            },
        }
    }

    /// The provider path, checked in order: credential, reference text,
    /// prompt, provider call, normalization.
    async fn call_provider(
        &self,
        module: Module,
        context: &GenerationContext,
        credential: &ModelCredential,
    ) -> Result<CanonicalResult, GenerationError> {
        let (provider, resolved) = self.providers.resolve(credential);
        if let Some(missing) = resolved.missing_part() {
            return Err(GenerationError::Configuration(format!("missing {}", missing)));
        }

        if self.policy == FailurePolicy::Strict && !context.has_reference_text() {
            return Err(GenerationError::MissingReferenceText);
        }

        let user = prompt::compose(module.as_str(), context);
        if user.trim().is_empty() {
            return Err(GenerationError::PromptUnavailable(module.to_string()));
        }
        let prompt = Prompt::new(prompt::system_instruction(context.is_zh), user);

        tracing::info!(
            module = %module,
            provider = %resolved.provider,
            model = %resolved.model,
            "Calling model provider"
        );
        tracing::trace!(module = %module, prompt = %prompt.user, "Composed prompt");

        let text = provider.generate(&resolved, &prompt).await?;

        normalize::normalize_text(module, &text)
            .ok_or_else(|| GenerationError::Unusable(module.to_string()))
    }

    /// List the models available to a credential
    ///
    /// Failures are reported inside the listing, never as an error.
    pub async fn list_models(&self, credential: &ModelCredential) -> ModelListing {
        let (provider, resolved) = self.providers.resolve(credential);
        if resolved.api_key.is_empty() {
            return ModelListing::failed("Missing API key");
        }

        if !provider.supports_model_listing() {
            tracing::debug!(provider = %resolved.provider, "Provider cannot list models");
            return ModelListing::failed("Failed to list models");
        }

        match provider.list_models(&resolved).await {
            Ok(models) => ModelListing::ok(models),
            Err(err) => {
                tracing::warn!(provider = %resolved.provider, "Model listing failed: {}", err);
                ModelListing::failed("Failed to list models")
            }
        }
    }
}
