use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::criteria::RawCriteria;
use crate::models::{ErrorBody, FilterResponse, ListResponse};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },
}

/// The two retrieval calls the portal makes.
#[async_trait]
pub trait EligibilityApi: Send + Sync {
    async fn list_all(&self) -> Result<ListResponse, ClientError>;

    async fn filter_eligible(&self, criteria: &RawCriteria)
        -> Result<FilterResponse, ClientError>;
}

pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
}

impl PortalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/students{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await?;
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => format!("{}: {}", body.message, body.error),
            Err(_) => text,
        };
        Err(ClientError::Server { status, message })
    }
}

#[async_trait]
impl EligibilityApi for PortalClient {
    async fn list_all(&self) -> Result<ListResponse, ClientError> {
        let response = self.http.get(self.url("/all")).send().await?;
        Self::decode(response).await
    }

    async fn filter_eligible(
        &self,
        criteria: &RawCriteria,
    ) -> Result<FilterResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/filter-eligible"))
            .json(criteria)
            .send()
            .await?;
        Self::decode(response).await
    }
}
