//! Text-generation backend boundary.
//!
//! # Responsibility
//! - Define the contract the article generator drives a backend through.
//! - Keep vendor wire details inside the implementing module.
//!
//! # Invariants
//! - Backend failures never reach generator callers; the generator recovers
//!   with its template strategy.
//! - A backend yields ordered text fragments; concatenated in order they
//!   form the full model response.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod gemini;

pub use gemini::{GeminiBackend, GeminiConfig};

pub type BackendResult<T> = Result<T, BackendError>;

/// Failure modes of an external generation call.
#[derive(Debug)]
pub enum BackendError {
    /// No API key configured; the backend cannot be constructed.
    MissingCredential,
    /// Transport-level failure (connect, TLS, timeout).
    Http(reqwest::Error),
    /// Non-success HTTP status from the backend.
    UnexpectedStatus { status: u16, body: String },
    /// Response body could not be decoded into generation fragments.
    MalformedResponse(String),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "generation backend credential is not configured"),
            Self::Http(err) => write!(f, "{err}"),
            Self::UnexpectedStatus { status, body } => {
                write!(f, "generation backend returned status {status}: {body}")
            }
            Self::MalformedResponse(message) => {
                write!(f, "malformed generation response: {message}")
            }
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// One bounded generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    /// Output-length cap forwarded to the backend.
    pub max_output_tokens: u32,
}

/// Contract for a streaming text-generation backend.
///
/// The blocking call returns once the stream is exhausted; callers fold the
/// fragments into one response string.
pub trait GenerationBackend {
    fn stream_generate(&self, request: &GenerationRequest) -> BackendResult<Vec<String>>;
}
