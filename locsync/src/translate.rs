//! Machine translation of newly added keys.
//!
//! The synchronizer never translates anything. After a file has been
//! synchronized the orchestrator hands its added keys to [`translate_entries`],
//! which cuts them into size-bounded batches and sends each batch to a
//! [`Translator`] with a bounded retry budget.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use rand::{Rng, thread_rng};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::Error;

/// Approximate cap on key + value characters per batch.
pub const DEFAULT_BATCH_SIZE_CAP: usize = 3000;
/// Attempts per batch before the whole run is aborted.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const TIMEOUT_SECS: u64 = 60;

/// One batch of strings to translate, keyed by rendered key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_language: String,
    pub target_language: String,
    pub entries: IndexMap<String, String>,
}

/// Something that can translate a batch of strings.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Returns the translated strings keyed like the request. The reply is
    /// validated by the caller.
    async fn translate(&self, request: &TranslationRequest) -> Result<IndexMap<String, String>, Error>;
}

/// Retry and batching knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPolicy {
    pub batch_size_cap: usize,
    pub max_attempts: usize,
    /// Base delay of the exponential backoff between attempts.
    pub base_delay: Duration,
}

impl Default for TranslationPolicy {
    fn default() -> Self {
        TranslationPolicy {
            batch_size_cap: DEFAULT_BATCH_SIZE_CAP,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(800),
        }
    }
}

fn backoff(base: Duration, attempt: usize) -> Duration {
    if base.is_zero() {
        return base;
    }
    let jitter: u64 = thread_rng().gen_range(0..200);
    base * 2_u32.pow(attempt.min(6) as u32) + Duration::from_millis(jitter)
}

/// Splits entries into batches whose key + value length stays within `cap`.
/// An entry larger than `cap` gets a batch of its own.
pub fn chunk_entries(entries: &IndexMap<String, String>, cap: usize) -> Vec<IndexMap<String, String>> {
    let mut chunks = Vec::new();
    let mut current = IndexMap::new();
    let mut current_size = 0usize;

    for (key, value) in entries {
        let size = key.len() + value.len();
        if !current.is_empty() && current_size + size > cap {
            chunks.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current.insert(key.clone(), value.clone());
        current_size += size;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Checks a reply against its request. Unknown keys are fatal; missing keys
/// are retryable.
pub fn validate_response(
    request: &TranslationRequest,
    response: IndexMap<String, String>,
) -> Result<IndexMap<String, String>, Error> {
    if let Some(key) = response.keys().find(|k| !request.entries.contains_key(*k)) {
        return Err(Error::UnexpectedTranslationKey { key: key.clone() });
    }
    let missing: Vec<&String> = request
        .entries
        .keys()
        .filter(|k| !response.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(Error::translation_response(format!(
            "{} key(s) missing from the reply, first: {}",
            missing.len(),
            missing[0]
        )));
    }
    Ok(response)
}

/// Translates all `entries` batch by batch.
///
/// A batch is retried up to `policy.max_attempts` times on retryable errors;
/// exhausting the budget, or any non-retryable error, aborts with `Err`.
pub async fn translate_entries(
    translator: &dyn Translator,
    source_language: &str,
    target_language: &str,
    entries: &IndexMap<String, String>,
    policy: &TranslationPolicy,
) -> Result<IndexMap<String, String>, Error> {
    let chunks = chunk_entries(entries, policy.batch_size_cap);
    if chunks.is_empty() {
        return Ok(IndexMap::new());
    }
    info!(
        language = target_language,
        keys = entries.len(),
        batches = chunks.len(),
        "translating"
    );

    let mut translated = IndexMap::with_capacity(entries.len());
    let total = chunks.len();
    for (index, chunk) in chunks.into_iter().enumerate() {
        info!("translating chunk {}/{}", index + 1, total);
        let request = TranslationRequest {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            entries: chunk,
        };

        let mut attempt = 0;
        let reply = loop {
            attempt += 1;
            let result = match translator.translate(&request).await {
                Ok(response) => validate_response(&request, response),
                Err(e) => Err(e),
            };
            match result {
                Ok(reply) => break reply,
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    warn!(attempt, max = policy.max_attempts, error = %e, "translation attempt failed");
                    tokio::time::sleep(backoff(policy.base_delay, attempt)).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(Error::TranslationExhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        };
        translated.extend(reply);
    }
    Ok(translated)
}

/// Translator backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl OpenAiTranslator {
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(OpenAiTranslator {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Reads the API key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, Error> {
        let key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config("OPENAI_API_KEY is not set"))?;
        Self::new(key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn prompt(request: &TranslationRequest, data: &str) -> String {
        format!(
            "You are a software localization translator. Translate from the language '{source}' \
             to the language '{target}'. The data is a JSON object of the form {{\"key\": \"value\"}}. \
             Translate only the values; keys must stay exactly as given and none may be dropped. \
             Keep interpolation placeholders such as {{{{count}}}} and HTML tags unchanged. \
             If a value is ambiguous, keep the original text. Reply with the JSON object only.\n\n{data}",
            source = request.source_language,
            target = request.target_language.to_uppercase(),
        )
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Extracts the JSON object from a model reply, tolerating code fences.
pub fn parse_reply(content: &str) -> Result<IndexMap<String, String>, Error> {
    let trimmed = content.trim();
    let body = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => return Err(Error::translation_response("reply contains no JSON object")),
    };
    serde_json::from_str::<IndexMap<String, String>>(body)
        .map_err(|e| Error::translation_response(format!("reply is not a string map: {e}")))
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<IndexMap<String, String>, Error> {
        let data = serde_json::to_string(&request.entries)?;
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": Self::prompt(request, &data) }
            ],
            "temperature": 0
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status.is_client_error() && status.as_u16() != 429 {
                return Err(Error::config(format!("translation service rejected the request ({status}): {text}")));
            }
            return Err(Error::translation_response(format!("HTTP {status}: {text}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::translation_response(format!("malformed completion: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::translation_response("completion has no content"))?;
        parse_reply(&content)
    }
}
