//! Gemini generation backend over server-sent events.
//!
//! # Responsibility
//! - Issue one blocking `streamGenerateContent` call per generation request.
//! - Decode SSE data lines into ordered text fragments.
//!
//! # Invariants
//! - Construction fails without a credential; template-only callers simply
//!   hold no backend.
//! - Fragments preserve stream order; no buffering beyond the current line.

use super::{BackendError, BackendResult, GenerationBackend, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::{BufRead, BufReader};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";

/// Configuration for the Gemini backend.
///
/// Passed explicitly into [`GeminiBackend::new`]; an absent `api_key` means
/// the application runs in template-only mode.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; `None` disables the backend.
    pub api_key: Option<String>,
    pub model: String,
    /// API base URL, overridable for tests.
    pub endpoint: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl GeminiConfig {
    /// Reads the credential from `GEMINI_API_KEY`.
    ///
    /// Blank values count as absent so an empty export does not enable the
    /// external strategy.
    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Self {
            api_key,
            ..Self::default()
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: RequestGenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct RequestGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<StreamCandidate>,
}

#[derive(Debug, Deserialize)]
struct StreamCandidate {
    content: Option<StreamContent>,
}

#[derive(Debug, Deserialize)]
struct StreamContent {
    #[serde(default)]
    parts: Vec<StreamPart>,
}

#[derive(Debug, Deserialize)]
struct StreamPart {
    text: Option<String>,
}

/// Gemini-backed [`GenerationBackend`].
pub struct GeminiBackend {
    config: GeminiConfig,
    client: reqwest::blocking::Client,
}

impl GeminiBackend {
    /// Builds a backend from explicit configuration.
    pub fn new(config: GeminiConfig) -> BackendResult<Self> {
        if !config.has_credential() {
            return Err(BackendError::MissingCredential);
        }
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self { config, client })
    }

    /// Builds a backend when a credential is configured, `None` otherwise.
    pub fn from_config(config: GeminiConfig) -> Option<Self> {
        if config.has_credential() {
            Self::new(config).ok()
        } else {
            None
        }
    }

    fn stream_url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.config.endpoint, self.config.model, api_key
        )
    }
}

impl GenerationBackend for GeminiBackend {
    fn stream_generate(&self, request: &GenerationRequest) -> BackendResult<Vec<String>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(BackendError::MissingCredential)?;

        let body = GeminiRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: RequestGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.stream_url(api_key))
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let mut fragments = Vec::new();
        let reader = BufReader::new(response);
        for line in reader.lines() {
            let line =
                line.map_err(|err| BackendError::MalformedResponse(format!("stream read: {err}")))?;
            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            if payload.is_empty() {
                continue;
            }

            let chunk: StreamChunk = serde_json::from_str(payload)
                .map_err(|err| BackendError::MalformedResponse(format!("sse chunk: {err}")))?;
            for candidate in chunk.candidates {
                let Some(content) = candidate.content else {
                    continue;
                };
                for part in content.parts {
                    if let Some(text) = part.text {
                        fragments.push(text);
                    }
                }
            }
        }

        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::{GeminiBackend, GeminiConfig};
    use crate::backend::BackendError;

    #[test]
    fn backend_requires_credential() {
        let result = GeminiBackend::new(GeminiConfig::default());
        assert!(matches!(result, Err(BackendError::MissingCredential)));
    }

    #[test]
    fn from_config_without_credential_is_none() {
        assert!(GeminiBackend::from_config(GeminiConfig::default()).is_none());
    }

    #[test]
    fn blank_api_key_counts_as_absent() {
        let config = GeminiConfig {
            api_key: Some("   ".to_string()),
            ..GeminiConfig::default()
        };
        assert!(!config.has_credential());
        assert!(matches!(
            GeminiBackend::new(config),
            Err(BackendError::MissingCredential)
        ));
    }
}
