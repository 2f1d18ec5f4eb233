use anyhow::{anyhow, Result};
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

const MAX_COMPLETION_TOKENS: u32 = 512;

/// A text-generation service: one prompt in, one free-form response out.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl LlmBackend for LLMParams {
    /// Sends exactly one request. Errors and timeouts are returned, never retried.
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(target: TARGET_LLM_REQUEST, "Sending LLM request ({} chars) to model {}", prompt.len(), self.model);

        let response = match timeout(self.timeout, generate(self, prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(target: TARGET_LLM_REQUEST, "Error generating response: {:#}", e);
                return Err(e);
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM request timed out after {} seconds", self.timeout.as_secs());
                return Err(anyhow!("LLM request timed out after {} seconds", self.timeout.as_secs()));
            }
        };

        debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", response);
        Ok(response)
    }
}

async fn generate(params: &LLMParams, prompt: &str) -> Result<String> {
    match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let mut request = GenerationRequest::new(params.model.clone(), prompt.to_string());
            request.options = Some(GenerationOptions::default().temperature(params.temperature));

            let response = ollama
                .generate(request)
                .await
                .map_err(|e| anyhow!("Ollama request failed: {}", e))?;
            Ok(response.response)
        }
        LLMClient::OpenAI(client) => {
            let request = CreateChatCompletionRequestArgs::default()
                .model(params.model.as_str())
                .temperature(params.temperature)
                .max_completion_tokens(MAX_COMPLETION_TOKENS)
                .messages([ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into()])
                .build()?;

            let response = client.chat().create(request).await?;
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| anyhow!("OpenAI response contained no message content"))
        }
    }
}
