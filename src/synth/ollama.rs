//! Ollama-backed annotator.
//!
//! Calls `POST {endpoint}/api/generate` with streaming disabled and reads the
//! `response` field of the reply.

use async_trait::async_trait;
use reqwest::Client;

use super::annotator::{AnnotationRequest, Annotator, AnnotatorError};
use super::prompt;
use crate::config::AnnotatorConfig;

pub struct OllamaAnnotator {
    http: Client,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
}

impl OllamaAnnotator {
    pub fn new(config: &AnnotatorConfig) -> Result<Self, AnnotatorError> {
        let http = Client::builder()
            .user_agent(concat!("codedoc/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(t) = self.temperature {
            body["options"] = serde_json::json!({ "temperature": t });
        }
        body
    }
}

#[async_trait]
impl Annotator for OllamaAnnotator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn annotate(&self, request: &AnnotationRequest<'_>) -> Result<String, AnnotatorError> {
        let prompt = prompt::build_prompt(request);
        tracing::debug!(
            model = %self.model,
            url = %self.generate_url(),
            prompt_chars = prompt.len(),
            "sending annotation request"
        );

        let response = self
            .http
            .post(self.generate_url())
            .json(&self.request_body(&prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AnnotatorError::Unavailable(format!(
                        "cannot reach {} (is Ollama running?): {}",
                        self.endpoint, e
                    ))
                } else {
                    AnnotatorError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnnotatorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnnotatorError::Decode(e.to_string()))?;
        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &serde_json::Value) -> Result<String, AnnotatorError> {
    if let Some(text) = json.get("response").and_then(|r| r.as_str()) {
        return Ok(text.to_string());
    }
    if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
        return Err(AnnotatorError::Unavailable(err.to_string()));
    }
    Err(AnnotatorError::Decode(
        "missing \"response\" field".to_string(),
    ))
}
