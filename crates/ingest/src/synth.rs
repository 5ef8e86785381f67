// ABOUTME: Business-data synthesizer that asks a JSON-mode chat completion service for name/description/category.
// ABOUTME: Response shapes are explicit optional-field structs; missing fields fall back to page metadata.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ErrorCode, IngestError};
use crate::extract::ExtractedMetadata;
use crate::result::BusinessProfile;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const FALLBACK_DESCRIPTION: &str = "A business platform";
pub const FALLBACK_CATEGORY: &str = "Business Software";

const SYSTEM_PROMPT: &str = "You are a business analyst. Given the content of a company's website, \
extract the business name, a concise one or two sentence description of what the business offers, \
and a short category label such as \"Project Management\" or \"E-Commerce\". \
Respond with JSON in this format: {\"name\": string, \"description\": string, \"category\": string}.";

/// Settings for the chat completion service.
#[derive(Clone)]
pub struct SynthesizerConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl fmt::Debug for SynthesizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// The JSON object the model is asked to return.
#[derive(Debug, Default)]
struct ProfileFields {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
}

/// Client for the chat completion service.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    http: reqwest::Client,
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(http: reqwest::Client, config: SynthesizerConfig) -> Self {
        Self { http, config }
    }

    /// Derive a business profile from page metadata.
    ///
    /// A reply that is not a JSON object is a `MalformedResponse`; it is never
    /// treated as an empty object.
    pub async fn synthesize(
        &self,
        url: &Url,
        meta: &ExtractedMetadata,
    ) -> Result<BusinessProfile, IngestError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            IngestError::synthesis(
                ErrorCode::SynthesisUnavailable,
                url.as_str(),
                Some(anyhow::anyhow!("no API key configured")),
            )
        })?;

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_message(url, meta),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.config.temperature,
        };

        let endpoint = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                IngestError::synthesis(
                    ErrorCode::SynthesisUnavailable,
                    url.as_str(),
                    Some(anyhow::anyhow!("completion request failed: {}", e)),
                )
            })?;

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            IngestError::synthesis(
                ErrorCode::MalformedResponse,
                url.as_str(),
                Some(anyhow::anyhow!("unreadable completion envelope: {}", e)),
            )
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| IngestError::synthesis(ErrorCode::EmptyResponse, url.as_str(), None))?;

        let fields = parse_fields(&content).map_err(|e| {
            IngestError::synthesis(ErrorCode::MalformedResponse, url.as_str(), Some(e))
        })?;
        debug!(url = %url, "synthesized business profile");

        Ok(apply_fallbacks(fields, url, meta))
    }
}

fn user_message(url: &Url, meta: &ExtractedMetadata) -> String {
    format!(
        "Website URL: {}\nPage title: {}\nMeta description: {}\nPage content: {}",
        url, meta.title, meta.description, meta.body_text
    )
}

/// Parse the model's reply. It must be a JSON object; a field that is absent
/// or not a string counts as missing.
fn parse_fields(content: &str) -> anyhow::Result<ProfileFields> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let object = match value.as_object() {
        Some(object) => object,
        None => anyhow::bail!("expected a JSON object, got {}", value),
    };
    let field = |key: &str| {
        object
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    };
    Ok(ProfileFields {
        name: field("name"),
        description: field("description"),
        category: field("category"),
    })
}

/// Fill missing or blank fields from page metadata and fixed literals.
///
/// name: title, then the URL host. description: meta description, then
/// [`FALLBACK_DESCRIPTION`]. category: [`FALLBACK_CATEGORY`].
fn apply_fallbacks(fields: ProfileFields, url: &Url, meta: &ExtractedMetadata) -> BusinessProfile {
    let non_blank = |s: Option<String>| {
        s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    };
    let from_meta = |s: &str| Some(s.trim().to_string()).filter(|v| !v.is_empty());

    let name = non_blank(fields.name)
        .or_else(|| from_meta(&meta.title))
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_default();
    let description = non_blank(fields.description)
        .or_else(|| from_meta(&meta.description))
        .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string());
    let category =
        non_blank(fields.category).unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

    BusinessProfile {
        name,
        description,
        category,
    }
}
