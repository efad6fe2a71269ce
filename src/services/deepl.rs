use std::thread;
use std::time::Duration;

use rand::{thread_rng, Rng};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::TranslationError;
use crate::model::language::LanguageCode;

/// Anything that turns a batch of texts into translations, in order.
pub trait TranslationBackend: Send + Sync {
    fn translate_batch(
        &self,
        texts: &[String],
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<Vec<String>, TranslationError>;
}

const MAX_ATTEMPTS: usize = 4;
const BASE_DELAY_MS: u64 = 800;
const MAX_BACKOFF_EXP: usize = 6;
const TIMEOUT_SECS: u64 = 60;

/// Upper bound of texts per request accepted by the API.
pub const MAX_BATCH: usize = 50;

const FREE_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";
const PRO_ENDPOINT: &str = "https://api.deepl.com/v2/translate";

fn backoff(attempt: usize) -> Duration {
    let jitter: u64 = thread_rng().gen_range(0..250);
    let exp = attempt.min(MAX_BACKOFF_EXP) as u32;
    Duration::from_millis(BASE_DELAY_MS * 2_u64.pow(exp) + jitter)
}

/// Free-plan keys end in `:fx` and must use the free host.
fn endpoint_for(api_key: &str) -> &'static str {
    if api_key.ends_with(":fx") {
        FREE_ENDPOINT
    } else {
        PRO_ENDPOINT
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<Translated>,
}

#[derive(Debug, Deserialize)]
struct Translated {
    text: String,
}

pub struct DeepL {
    client: Client,
    api_key: String,
    endpoint: String,
    max_attempts: usize,
}

impl DeepL {
    pub fn new(api_key: &str) -> Result<Self, TranslationError> {
        Self::with_endpoint(api_key, endpoint_for(api_key))
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Result<Self, TranslationError> {
        if api_key.trim().is_empty() {
            return Err(TranslationError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(TranslationError::Client)?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            endpoint: endpoint.to_string(),
            max_attempts: MAX_ATTEMPTS,
        })
    }

    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = n.max(1);
        self
    }
}

impl TranslationBackend for DeepL {
    fn translate_batch(
        &self,
        texts: &[String],
        source: LanguageCode,
        target: LanguageCode,
    ) -> Result<Vec<String>, TranslationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "text": texts,
            "source_lang": source.deepl_source(),
            "target_lang": target.deepl_target(),
        });

        let mut last_err = String::new();

        for attempt in 0..self.max_attempts {
            let retry = attempt + 1 < self.max_attempts;

            let res = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
                .json(&body)
                .send();

            let resp = match res {
                Ok(r) => r,
                Err(e) => {
                    last_err = if e.is_timeout() {
                        "request timed out".to_string()
                    } else {
                        e.to_string()
                    };
                    warn!(attempt, error = %last_err, "translation request failed");
                    if retry {
                        thread::sleep(backoff(attempt));
                    }
                    continue;
                }
            };

            let status = resp.status();
            // read as text first so an error body is not lost to a JSON failure
            let text = match resp.text() {
                Ok(t) => t,
                Err(e) => {
                    last_err = e.to_string();
                    if retry {
                        thread::sleep(backoff(attempt));
                    }
                    continue;
                }
            };

            if !status.is_success() {
                let message = extract_error_message(&text);
                if !should_retry_http(status) {
                    return Err(TranslationError::Rejected {
                        status: status.as_u16(),
                        message,
                    });
                }
                last_err = format!("HTTP {}: {}", status.as_u16(), message);
                warn!(attempt, status = status.as_u16(), "translation service busy");
                if retry {
                    thread::sleep(backoff(attempt));
                }
                continue;
            }

            let parsed: TranslateResponse = serde_json::from_str(&text)
                .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

            if parsed.translations.len() != texts.len() {
                return Err(TranslationError::InvalidResponse(format!(
                    "sent {} texts, got {} translations",
                    texts.len(),
                    parsed.translations.len()
                )));
            }

            debug!(count = texts.len(), target = %target, "batch translated");
            return Ok(parsed.translations.into_iter().map(|t| t.text).collect());
        }

        Err(TranslationError::Unavailable {
            attempts: self.max_attempts,
            last: last_err,
        })
    }
}

/// Rate limiting and server-side failures are worth another attempt.
fn should_retry_http(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn extract_error_message(body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body_text) {
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
    }

    let trimmed = body_text.trim();
    match trimmed.char_indices().nth(400) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
