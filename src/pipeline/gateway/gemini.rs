use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{bare_model_name, LlmClient, ModelInfo};
use super::GatewayError;
use crate::config::AppConfig;

/// Listing pages fetched before giving up on `nextPageToken`.
const MAX_LISTING_PAGES: usize = 10;

/// HTTP client for the Generative Language REST API.
pub struct GeminiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Every request carries `timeout`.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| GatewayError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, GatewayError> {
        Self::new(
            &config.api_base,
            config.api_key.clone(),
            config.request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> Result<&str, GatewayError> {
        self.api_key.as_deref().ok_or(GatewayError::MissingApiKey)
    }

    fn map_send_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            GatewayError::Connection(self.base_url.clone())
        } else {
            GatewayError::HttpClient(e.to_string())
        }
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Response body from `generateContent`
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if any.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

/// Response body from `GET models`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ListedModel>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedModel {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl LlmClient for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GatewayError> {
        let key = self.key()?;
        let model = bare_model_name(model);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(match status.as_u16() {
                429 => GatewayError::RateLimited {
                    model: model.to_string(),
                    body,
                },
                404 => GatewayError::ModelNotFound(model.to_string()),
                code => GatewayError::Upstream { status: code, body },
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| GatewayError::ResponseParsing(e.to_string()))?;

        match parsed.into_text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GatewayError::EmptyResponse(model.to_string())),
        }
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>, GatewayError> {
        let key = self.key()?;
        let url = format!("{}/v1beta/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LISTING_PAGES {
            let mut request = self
                .client
                .get(&url)
                .header("x-goog-api-key", key)
                .query(&[("pageSize", "100")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().map_err(|e| self.map_send_error(e))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(GatewayError::Upstream {
                    status: status.as_u16(),
                    body,
                });
            }

            let page: ListModelsResponse = response
                .json()
                .map_err(|e| GatewayError::ResponseParsing(e.to_string()))?;

            models.extend(page.models.into_iter().map(|m| ModelInfo {
                name: bare_model_name(&m.name).to_string(),
                display_name: m.display_name,
                supported_generation_methods: m.supported_generation_methods,
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

/// Scripted LLM client for testing.
///
/// Each model name can be given a queue of results; once a queue is
/// drained (or for unscripted models) the default result is returned.
/// Every `generate` call is recorded so tests can assert the order in
/// which candidates were tried.
pub struct MockLlmClient {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, GatewayError>>>>,
    default: Result<String, GatewayError>,
    models: Vec<ModelInfo>,
    calls: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Every model answers with `response`.
    pub fn new(response: &str) -> Self {
        Self::with_default(Ok(response.to_string()))
    }

    /// Every model fails with `error`.
    pub fn failing(error: GatewayError) -> Self {
        Self::with_default(Err(error))
    }

    fn with_default(default: Result<String, GatewayError>) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            models: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue results for one model, consumed in order.
    pub fn script(self, model: &str, results: Vec<Result<String, GatewayError>>) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model.to_string(), results.into());
        self
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    /// Model names passed to `generate`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, model: &str, _prompt: &str) -> Result<String, GatewayError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(model.to_string());

        let scripted = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(model)
            .and_then(VecDeque::pop_front);

        scripted.unwrap_or_else(|| self.default.clone())
    }

    /// A failing mock fails listings with the same error.
    fn list_models(&self) -> Result<Vec<ModelInfo>, GatewayError> {
        match &self.default {
            Ok(_) => Ok(self.models.clone()),
            Err(e) => Err(e.clone()),
        }
    }
}
