//! HTTP client for the Sensay replica API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Serialize, de::DeserializeOwned};
use tracing::instrument;

use crate::config::SensayConfig;
use crate::retry::{RetryConfig, with_backoff};

use super::{Replica, SensayError};
use super::types::{ChatCompletion, ChatCompletionRequest, CreateUserRequest, SensayUser};

/// Replica answers can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sensay API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct SensayClient {
    inner: Arc<SensayClientInner>,
}

struct SensayClientInner {
    client: reqwest::Client,
    base_url: String,
    replica_uuid: String,
    retry: RetryConfig,
}

impl SensayClient {
    /// Create a new Sensay API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &SensayConfig, retry: RetryConfig) -> Result<Self, SensayError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "X-ORGANIZATION-SECRET",
            HeaderValue::from_str(config.api_key.expose_secret())
                .map_err(|e| SensayError::Parse(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(
            "X-API-Version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| SensayError::Parse(format!("Invalid API version: {e}")))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SensayClientInner {
                client,
                base_url: format!("{}/v1", config.api_url),
                replica_uuid: config.replica_uuid.clone(),
                retry,
            }),
        })
    }

    /// The replica that answers shopper messages.
    #[must_use]
    pub fn replica_uuid(&self) -> &str {
        &self.inner.replica_uuid
    }

    /// POST `body` to `path` and decode the JSON answer.
    async fn post<B, T>(
        &self,
        path: &str,
        user_id: Option<&str>,
        body: &B,
    ) -> Result<T, SensayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.inner.base_url);
        let url = url.as_str();

        with_backoff(&self.inner.retry, path, move || async move {
            let mut request = self.inner.client.post(url).json(body);
            if let Some(user_id) = user_id {
                request = request.header("X-USER-ID", user_id);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(1);
                return Err(SensayError::RateLimited(retry_after));
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(SensayError::Api {
                    status: status.as_u16(),
                    message: message.chars().take(200).collect(),
                });
            }

            response
                .json::<T>()
                .await
                .map_err(|e| SensayError::Parse(e.to_string()))
        })
        .await
    }

    /// Provision an external user with the given id.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self), fields(external_id = %external_id))]
    pub async fn create_user(&self, external_id: &str) -> Result<SensayUser, SensayError> {
        self.post("/users", None, &CreateUserRequest { id: external_id })
            .await
    }

    /// Send `content` to the replica on behalf of `sensay_user_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the replica reports
    /// `success: false`.
    #[instrument(skip(self, content), fields(sensay_user_id = %sensay_user_id))]
    pub async fn chat_completion(
        &self,
        sensay_user_id: &str,
        content: &str,
    ) -> Result<ChatCompletion, SensayError> {
        let path = format!("/replicas/{}/chat/completions", self.inner.replica_uuid);
        let completion: ChatCompletion = self
            .post(
                &path,
                Some(sensay_user_id),
                &ChatCompletionRequest { content },
            )
            .await?;

        if !completion.success {
            return Err(SensayError::Declined);
        }
        Ok(completion)
    }
}

impl Replica for SensayClient {
    async fn complete(
        &self,
        sensay_user_id: &str,
        prompt: &str,
    ) -> Result<ChatCompletion, SensayError> {
        self.chat_completion(sensay_user_id, prompt).await
    }
}
