//! HTTP backend client.
//!
//! Thin `reqwest` wrapper over the assistant endpoints. Status handling and
//! body parsing live in pure functions (`read_body`, `parse_json`) for
//! testability.

use std::time::Duration;

use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::NutriBackend;
use super::config::ClientConfig;
use super::types::{
    ApiError, ChatResponse, HistoryResponse, HistoryTurn, LogAck, MealSubmission, MediaBlob, NutritionItem,
    NutritionRequest, NutritionTotals, TranscriptResponse,
};

const CHAT_PATH: &str = "/api/chat";
const HISTORY_PATH: &str = "/api/chat/history";
const NUTRITION_PATH: &str = "/api/nutrition/compute";
const MEAL_LOG_PATH: &str = "/api/meals/log";
const TRANSCRIBE_PATH: &str = "/api/transcribe";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client for the configured backend origin.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ConfigParse`] for a session cookie that is not a
    /// valid header value, or [`ApiError::HttpClientBuild`] if the TLS/HTTP
    /// stack fails to initialize.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ApiError::ConfigParse(format!("invalid session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl NutriBackend for HttpBackend {
    async fn chat(&self, message: &str, image: Option<&MediaBlob>) -> Result<ChatResponse, ApiError> {
        let mut form = Form::new().text("message", message.to_string());
        if let Some(image) = image {
            form = form.part("image", media_part(image)?);
        }
        debug!(has_image = image.is_some(), message_len = message.len(), "api: chat");
        let response = self
            .http
            .post(self.url(CHAT_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        parse_json(&read_body(response).await?)
    }

    async fn history(&self) -> Result<Vec<HistoryTurn>, ApiError> {
        let response = self
            .http
            .get(self.url(HISTORY_PATH))
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        let history: HistoryResponse = parse_json(&read_body(response).await?)?;
        Ok(history.messages)
    }

    async fn clear_history(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(HISTORY_PATH))
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        read_body(response).await.map(|_| ())
    }

    async fn nutrition_totals(&self, items: &[NutritionItem]) -> Result<NutritionTotals, ApiError> {
        let response = self
            .http
            .post(self.url(NUTRITION_PATH))
            .json(&NutritionRequest { items })
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        let totals: NutritionTotals = parse_json(&read_body(response).await?)?;
        Ok(totals.rounded())
    }

    async fn log_meal(&self, submission: &MealSubmission) -> Result<LogAck, ApiError> {
        let response = self
            .http
            .post(self.url(MEAL_LOG_PATH))
            .json(submission)
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        let body = read_body(response).await?;
        if body.trim().is_empty() {
            return Ok(LogAck::default());
        }
        parse_json(&body)
    }

    async fn transcribe(&self, audio: &MediaBlob) -> Result<Option<String>, ApiError> {
        let form = Form::new().part("audio", media_part(audio)?);
        let response = self
            .http
            .post(self.url(TRANSCRIBE_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
        let transcript: TranscriptResponse = parse_json(&read_body(response).await?)?;
        Ok(transcript.text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
    }
}

fn media_part(blob: &MediaBlob) -> Result<Part, ApiError> {
    Part::bytes(blob.bytes.clone())
        .file_name(blob.file_name.clone())
        .mime_str(&blob.mime)
        .map_err(|e| ApiError::ApiRequest(e.to_string()))
}

// =============================================================================
// PARSING
// =============================================================================

async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::ApiRequest(e.to_string()))?;
    check_status(status, text)
}

fn check_status(status: u16, body: String) -> Result<String, ApiError> {
    if (200..300).contains(&status) { Ok(body) } else { Err(ApiError::ApiResponse { status, body }) }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::ApiParse(e.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
