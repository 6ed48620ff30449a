use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::language::Language;

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateRequest<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_lang: Option<Language>,
}

#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    pub translation: String,
}

/// The two server operations the client depends on
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, message: &str) -> Result<String, ClientError>;

    async fn translate(&self, text: &str, target: Option<Language>) -> Result<String, ClientError>;
}

/// `ChatBackend` over HTTP against the chat server
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a server-relative path (like an embedded graph image) into a full URL
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> Result<Resp, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn chat(&self, message: &str) -> Result<String, ClientError> {
        let response: ChatResponse = self.post("/chat", &ChatRequest { message }).await?;
        Ok(response.reply)
    }

    async fn translate(&self, text: &str, target: Option<Language>) -> Result<String, ClientError> {
        let request = TranslateRequest { text, target_lang: target };
        let response: TranslateResponse = self.post("/translate", &request).await?;
        Ok(response.translation)
    }
}
