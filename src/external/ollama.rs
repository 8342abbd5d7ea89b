use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AiConfig;
use crate::error::{AppError, AppResult};
use crate::services::ai_recommender::TextGenerator;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// 本地 Ollama 服务客户端
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &AiConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build Ollama HTTP client, using defaults: {e}");
                Client::new()
            });
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn is_available(&self) -> bool {
        match self.http.get(format!("{}/api/tags", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("Ollama server is not available: {e}");
                false
            }
        }
    }

    async fn generate(&self, prompt: &str) -> AppResult<String> {
        log::debug!("Calling Ollama with model: {}", self.model);
        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApiError(format!(
                "Ollama generate failed with HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }
}
