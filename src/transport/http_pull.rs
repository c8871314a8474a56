use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::domain::Note;
use crate::transport::{PullAdapter, PullParams, TransportError};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Pull adapter for the `POST {origin}/api/{endpoint}` request API.
pub struct HttpPullAdapter {
    client: Client,
    api_base: String,
    credential: String,
    page_limit: u32,
}

impl HttpPullAdapter {
    pub fn new(client: Client, origin: &Url, credential: &str, page_limit: u32) -> Self {
        let api_base = format!("{}/api/", origin.as_str().trim_end_matches('/'));
        Self {
            client,
            api_base,
            credential: credential.to_string(),
            page_limit,
        }
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_base, endpoint.trim_start_matches('/'))
    }

    pub fn request_body(&self, params: &PullParams) -> Map<String, Value> {
        let mut body = params.extra.clone();
        body.insert("i".into(), Value::String(self.credential.clone()));
        body.entry("limit")
            .or_insert_with(|| Value::from(self.page_limit));
        if let Some(cursor) = &params.cursor {
            body.insert("untilId".into(), Value::String(cursor.clone()));
        }
        body
    }
}

#[async_trait]
impl PullAdapter for HttpPullAdapter {
    async fn pull(&self, endpoint: &str, params: &PullParams) -> Result<Vec<Note>, TransportError> {
        let url = self.endpoint_url(endpoint);
        let body = self.request_body(params);

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| unreadable_body(status.as_u16(), e))?;
            return Err(error_from_body(status.as_u16(), &text));
        }

        let bytes = response.bytes().await?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        notes_from_value(value)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_decode() {
            TransportError::InvalidResponse(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Turn a non-2xx response into a typed error, keeping the server's code.
pub fn error_from_body(status: u16, body: &str) -> TransportError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => TransportError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => TransportError::Http {
            status,
            message: body.trim().chars().take(200).collect(),
        },
    }
}

/// A failure response whose body could not be read still reports its status.
fn unreadable_body(status: u16, e: impl std::fmt::Display) -> TransportError {
    TransportError::Network(format!("HTTP {} with unreadable body: {}", status, e))
}

pub fn notes_from_value(value: Value) -> Result<Vec<Note>, TransportError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value::<Note>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TransportError::InvalidResponse(e.to_string())),
        _ => Err(TransportError::InvalidResponse(
            "Invalid response format".into(),
        )),
    }
}
