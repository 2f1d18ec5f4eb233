pub mod archive;
pub mod article;
pub mod config;
pub mod digest;
pub mod environment;
pub mod llm;
pub mod logging;
pub mod notifier;
pub mod pipeline;
pub mod prompt;
pub mod relevance;
pub mod rss;
pub mod seen;
pub mod summarizer;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;
use std::time::Duration;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_NOTIFY: &str = "notify";
pub const TARGET_ARCHIVE: &str = "archive";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

/// Everything needed to send one completion request. Built once in `main`
/// and handed to the summarization stage.
#[derive(Clone, Debug)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}
