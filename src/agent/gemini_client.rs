use crate::agent::{ChatRole, LanguageModel, ModelPrompt};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` over REST.
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Secret<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build the Gemini HTTP client.")?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(serde::Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(serde::Serialize)]
struct SystemInstruction<'a> {
    parts: [Part<'a>; 1],
}

#[derive(serde::Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(serde::Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(serde::Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl LanguageModel for GeminiClient {
    #[tracing::instrument(name = "Call Gemini", skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &ModelPrompt) -> Result<String, anyhow::Error> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateContentRequest {
            contents: prompt
                .turns
                .iter()
                .map(|turn| Content {
                    role: match turn.role {
                        ChatRole::User => "user",
                        ChatRole::Assistant => "model",
                    },
                    parts: [Part { text: &turn.text }],
                })
                .collect(),
            system_instruction: SystemInstruction {
                parts: [Part {
                    text: &prompt.system_instruction,
                }],
            },
            generation_config: GenerationConfig {
                temperature: 0.4,
                max_output_tokens: 1024,
            },
        };

        // The key travels as a header so it never shows up in a logged URL.
        let response: GenerateContentResponse = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to reach Gemini.")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("Gemini rejected the request.")?
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Gemini returned an unexpected payload.")?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            anyhow::bail!("Gemini returned no candidates.");
        }
        Ok(text)
    }
}
