use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SUMMARY_MODEL;
use crate::error::{Error, Result};
use crate::models::Snapshot;
use crate::summary::prompts::SummaryRequest;
use crate::summary::provider::SummaryGenerator;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

impl GenerateContentRequest {
    fn new(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 200,
            },
        }
    }
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    fn into_text(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(Error::Summary(error.message));
        }

        let text = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Summary("Empty response from Gemini".to_string()));
        }
        Ok(text)
    }
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            base_url: GEMINI_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl SummaryGenerator for GeminiGenerator {
    async fn generate(&self, snapshot: &Snapshot) -> Result<String> {
        let prompt = SummaryRequest::from_snapshot(snapshot).to_prompt();
        tracing::debug!("Requesting summary from Gemini model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateContentRequest::new(prompt))
            .send()
            .await
            .map_err(|e| Error::Summary(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Summary(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Summary(format!("Failed to parse Gemini response: {}", e)))?;

        result.into_text()
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(GenerateContentRequest::new("hello".to_string())).unwrap();
        assert_eq!(body["contents"], json!([{"parts": [{"text": "hello"}]}]));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 200);
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_response_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "  A seasoned engineer.\n"}], "role": "model"}}]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "A seasoned engineer.");
    }

    #[test]
    fn test_unusable_responses() {
        let empty: GenerateContentResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(empty.into_text(), Err(Error::Summary(_))));

        let blocked: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert!(blocked.into_text().is_err());

        let error: GenerateContentResponse =
            serde_json::from_value(json!({"error": {"code": 400, "message": "API key not valid"}})).unwrap();
        match error.into_text() {
            Err(Error::Summary(message)) => assert_eq!(message, "API key not valid"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_endpoint() {
        let generator = GeminiGenerator::new("k".to_string(), None)
            .unwrap()
            .with_base_url("https://gemini.test/v1beta/");
        assert_eq!(
            generator.endpoint(),
            "https://gemini.test/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
        assert_eq!(generator.model(), DEFAULT_SUMMARY_MODEL);
    }
}
