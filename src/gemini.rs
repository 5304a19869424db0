//! Client for the Gemini `generateContent` image editing endpoint.
//!
//! The rest of the crate only sees [`ImageEditor`]: an edit request goes in, a
//! decoded [`GeneratedImage`] or a [`GenerationError`] comes out.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::EditorConfig,
    image_utils::{GeneratedImage, MimeType, SourceImage},
};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Finish reasons that mean the output was filtered rather than missing.
const SAFETY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
];

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API_KEY environment variable is not set.")]
    MissingCredential,
    #[error("Request was blocked: {0}. Please adjust your prompt.")]
    Blocked(String),
    #[error("The API returned an empty response. Please try a different prompt.")]
    EmptyResponse,
    #[error("No image data found in the API response.")]
    NoImageData,
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Could not read the API response: {0}")]
    Decode(String),
    #[error("The edit worker stopped unexpectedly.")]
    WorkerPanicked,
}

impl GenerationError {
    /// Safety denials are reported separately from transport or service failures.
    pub fn is_denial(&self) -> bool {
        matches!(self, GenerationError::Blocked(_))
    }
}

/// One edit call: the source payload plus the composed instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditRequest {
    pub image_base64: String,
    pub mime: MimeType,
    pub prompt: String,
}

impl EditRequest {
    pub fn new(source: &SourceImage, prompt: impl Into<String>) -> Self {
        Self {
            image_base64: source.base64.to_string(),
            mime: source.mime,
            prompt: prompt.into(),
        }
    }
}

/// Anything that can turn an edit request into an image.
pub trait ImageEditor: Send + Sync {
    fn edit(&self, request: &EditRequest) -> Result<GeneratedImage, GenerationError>;
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        alias = "inline_data",
        default
    )]
    pub inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type", default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

pub fn build_request_body(request: &EditRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: request.mime.as_str().to_string(),
                        data: request.image_base64.clone(),
                    }),
                },
                Part {
                    text: Some(request.prompt.clone()),
                    inline_data: None,
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE".to_string()],
        },
    }
}

/// Pulls the first inline image out of a `generateContent` response body.
pub fn parse_generate_response(body: &str) -> Result<GeneratedImage, GenerationError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|err| GenerationError::Decode(err.to_string()))?;
    extract_image(response)
}

fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage, GenerationError> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
        .filter(|reason| !reason.is_empty());

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match block_reason {
            Some(reason) => GenerationError::Blocked(reason),
            None => GenerationError::EmptyResponse,
        });
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    if parts.is_empty() {
        if let Some(reason) = block_reason {
            return Err(GenerationError::Blocked(reason));
        }
        return Err(match candidate.finish_reason {
            Some(reason) if SAFETY_FINISH_REASONS.contains(&reason.as_str()) => {
                GenerationError::Blocked(reason)
            }
            _ => GenerationError::EmptyResponse,
        });
    }

    let Some(inline) = parts
        .into_iter()
        .filter_map(|part| part.inline_data)
        .find(|inline| !inline.data.is_empty())
    else {
        return Err(match candidate.finish_reason {
            Some(reason) if SAFETY_FINISH_REASONS.contains(&reason.as_str()) => {
                GenerationError::Blocked(reason)
            }
            _ => GenerationError::NoImageData,
        });
    };

    let bytes = BASE64
        .decode(inline.data.as_bytes())
        .map_err(|err| GenerationError::Decode(format!("image base64: {err}")))?;
    GeneratedImage::from_bytes(bytes, MimeType::parse(&inline.mime_type))
        .map_err(|err| GenerationError::Decode(err.to_string()))
}

/// Reads `error.message` from a failed response, falling back to the raw body.
pub fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "The API request failed".to_string()
            } else {
                trimmed.chars().take(300).collect()
            }
        }
    }
}

pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: &EditorConfig) -> Result<Self, GenerationError> {
        let api_key = match &config.api_key {
            Some(key) if config.has_credential() => key.trim().to_string(),
            _ => return Err(GenerationError::MissingCredential),
        };
        let http = HttpClient::builder()
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()?;
        Ok(Self {
            http,
            api_key,
            endpoint: endpoint_for_model(&config.api_base, &config.model),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub fn endpoint_for_model(api_base: &str, model: &str) -> String {
    let base = api_base.trim().trim_end_matches('/');
    let model = model.trim();
    let model_path = if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    };
    format!("{base}/{model_path}:generateContent")
}

impl ImageEditor for GeminiClient {
    fn edit(&self, request: &EditRequest) -> Result<GeneratedImage, GenerationError> {
        log::debug!(
            "POST {} ({}, {} base64 bytes, prompt {:?})",
            self.endpoint,
            request.mime,
            request.image_base64.len(),
            request.prompt
        );
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request_body(request))
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let message = api_error_message(&body);
            log::warn!("generation API returned {status}: {message}");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }
        parse_generate_response(&body)
    }
}
