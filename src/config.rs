//! Run configuration, read once from the environment at startup.

use anyhow::{anyhow, Context, Result};
use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::environment::{get_env_var, get_env_var_or, get_env_var_parsed};
use crate::relevance::RelevanceClassifier;
use crate::rss::Source;
use crate::summarizer::SummarySettings;
use crate::{LLMClient, LLMParams, TARGET_NOTIFY};

pub fn default_sources() -> Vec<Source> {
    vec![
        Source::new("NHK ビジネス", "https://www.nhk.or.jp/rss/news/cat5.xml", "ja", "国内経済"),
        Source::new("東洋経済", "https://toyokeizai.net/list/feed/rss", "ja", "日本ビジネス"),
        Source::new("Bloomberg", "https://feeds.bloomberg.com/markets/news.rss", "en", "グローバル金融"),
        Source::new("The Guardian", "https://www.theguardian.com/business/rss", "en", "ビジネス"),
        Source::new("BBC Business", "https://feeds.bbci.co.uk/news/business/rss.xml", "en", "世界経済"),
    ]
}

/// Reads a source registry: a JSON array of `{name, url, language, category}`, kept in file order.
pub fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file {}", path.display()))?;
    let sources: Vec<Source> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse sources file {}", path.display()))?;
    if sources.is_empty() {
        return Err(anyhow!("Sources file {} defines no sources", path.display()));
    }
    Ok(sources)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Ollama,
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAI),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(anyhow!("Unknown LLM_TYPE {:?}, expected openai or ollama", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmSettings {
    /// Builds the client. A hosted provider without a credential is an error.
    pub fn build_params(&self) -> Result<LLMParams> {
        let llm_client = match self.provider {
            LlmProvider::OpenAI => {
                let api_key = self
                    .api_key
                    .clone()
                    .ok_or_else(|| anyhow!("OPENAI_API_KEY environment variable must be set"))?;
                let mut config = OpenAIConfig::new().with_api_key(api_key);
                if let Some(base_url) = &self.base_url {
                    config = config.with_api_base(base_url);
                }
                info!("Using OpenAI model {}", self.model);
                LLMClient::OpenAI(OpenAIClient::with_config(config))
            }
            LlmProvider::Ollama => {
                info!("Connecting to Ollama at {}:{}", self.ollama_host, self.ollama_port);
                LLMClient::Ollama(Ollama::new(self.ollama_host.clone(), self.ollama_port))
            }
        };

        Ok(LLMParams {
            llm_client,
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: self.timeout,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    Inline,
    Attachment,
}

impl FromStr for NotifyMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inline" => Ok(NotifyMode::Inline),
            "attachment" => Ok(NotifyMode::Attachment),
            other => Err(anyhow!("Unknown NOTIFY_MODE {:?}, expected inline or attachment", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub api_key: String,
    pub from_email: String,
    pub to_email: String,
    pub mode: NotifyMode,
}

impl NotifierConfig {
    /// Returns `None` unless all three values are present.
    pub fn from_parts(
        api_key: Option<String>,
        from_email: Option<String>,
        to_email: Option<String>,
        mode: NotifyMode,
    ) -> Option<Self> {
        Some(Self {
            api_key: api_key?,
            from_email: from_email?,
            to_email: to_email?,
            mode,
        })
    }
}

/// Names of the email settings that are unset, in a stable order.
pub fn missing_notifier_settings(
    api_key: Option<&str>,
    from_email: Option<&str>,
    to_email: Option<&str>,
) -> Vec<&'static str> {
    [
        ("RESEND_API_KEY", api_key),
        ("RESEND_FROM_EMAIL", from_email),
        ("NOTIFY_EMAIL", to_email),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_none())
    .map(|(name, _)| name)
    .collect()
}

/// Ten years.
pub const MAX_RETENTION_DAYS: i64 = 3650;

/// The archiver window must be between one day and `MAX_RETENTION_DAYS`.
pub fn validate_retention_days(days: i64) -> Result<i64> {
    if (1..=MAX_RETENTION_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(anyhow!(
            "Invalid ARCHIVE_RETENTION_DAYS {}: must be between 1 and {}",
            days,
            MAX_RETENTION_DAYS
        ))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sources: Vec<Source>,
    pub classifier: RelevanceClassifier,
    pub llm: LlmSettings,
    pub summary: SummarySettings,
    pub max_articles_per_source: usize,
    pub feed_timeout: Duration,
    pub native_language: String,
    pub output_dir: PathBuf,
    pub seen_file: PathBuf,
    pub retention_days: i64,
    pub notifier: Option<NotifierConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let sources = match get_env_var("SOURCES_FILE") {
            Some(path) => load_sources(Path::new(&path))?,
            None => default_sources(),
        };

        let classifier = match get_env_var("KEYWORDS_FILE") {
            Some(path) => RelevanceClassifier::from_file(Path::new(&path))?,
            None => RelevanceClassifier::default(),
        };

        let provider: LlmProvider = get_env_var_or("LLM_TYPE", "openai").parse()?;
        let default_model = match provider {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Ollama => "llama3",
        };
        let llm = LlmSettings {
            provider,
            api_key: get_env_var("OPENAI_API_KEY"),
            base_url: get_env_var("OPENAI_BASE_URL"),
            ollama_host: get_env_var_or("OLLAMA_HOST", "http://localhost"),
            ollama_port: get_env_var_parsed("OLLAMA_PORT", 11434)?,
            model: get_env_var_or("LLM_MODEL", default_model),
            temperature: get_env_var_parsed("LLM_TEMPERATURE", 0.0)?,
            timeout: Duration::from_secs(get_env_var_parsed("LLM_TIMEOUT_SECS", 60)?),
        };

        let summary = SummarySettings {
            summary_max_chars: get_env_var_parsed("SUMMARY_MAX_CHARS", 150)?,
            excerpt_max_chars: get_env_var_parsed("EXCERPT_MAX_CHARS", 1000)?,
            summary_language: get_env_var_or("SUMMARY_LANGUAGE", "Japanese"),
        };

        let notify_mode: NotifyMode = get_env_var_or("NOTIFY_MODE", "inline").parse()?;
        let (resend_key, from_email, to_email) = (
            get_env_var("RESEND_API_KEY"),
            get_env_var("RESEND_FROM_EMAIL"),
            get_env_var("NOTIFY_EMAIL"),
        );
        let missing = missing_notifier_settings(resend_key.as_deref(), from_email.as_deref(), to_email.as_deref());
        if !missing.is_empty() {
            info!(target: TARGET_NOTIFY, "Email notification disabled: {} not set", missing.join(", "));
        }
        let notifier = NotifierConfig::from_parts(resend_key, from_email, to_email, notify_mode);

        Ok(Self {
            sources,
            classifier,
            llm,
            summary,
            max_articles_per_source: get_env_var_parsed("MAX_ARTICLES_PER_SOURCE", 5)?,
            feed_timeout: Duration::from_secs(get_env_var_parsed("FEED_TIMEOUT_SECS", 30)?),
            native_language: get_env_var_or("NATIVE_LANGUAGE", "ja"),
            output_dir: PathBuf::from(get_env_var_or("OUTPUT_DIR", "output")),
            seen_file: PathBuf::from(get_env_var_or("SEEN_FILE", "data/posted.json")),
            retention_days: validate_retention_days(get_env_var_parsed("ARCHIVE_RETENTION_DAYS", 7)?)?,
            notifier,
        })
    }
}
