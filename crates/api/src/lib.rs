pub mod error;

use std::time::Duration;

use async_trait::async_trait;
use error::{ApiError, Result};
use jira_lookup_auth::Credentials;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Request, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

/// Decoded upstream issue body. Kept as an untyped JSON object.
pub type IssueBody = Map<String, Value>;

const MAX_ERROR_BODY: usize = 512;

/// Anything that can resolve a single issue key to its JSON body.
#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn fetch_issue(&self, issue_key: &str) -> Result<IssueBody>;
}

/// HTTP client for the upstream issue tracker.
///
/// TLS certificate and hostname verification use reqwest's defaults and
/// cannot be turned off.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(ApiError::InvalidUrl)?;

        let client = Client::builder()
            .user_agent(format!("jira-lookup/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ApiError::RequestFailed)?;

        Ok(Self {
            client,
            base_url,
            credentials,
            timeout,
        })
    }

    /// Target URL for an issue: the base URL with the key appended as-is.
    pub fn issue_url(&self, issue_key: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, issue_key.trim())).map_err(ApiError::InvalidUrl)
    }

    /// GET for `url` with Basic credentials. The `Authorization` header is
    /// marked sensitive so it stays out of debug output.
    fn build_request(&self, url: Url) -> reqwest::Result<Request> {
        self.client
            .get(url)
            .basic_auth(self.credentials.username(), Some(self.credentials.token()))
            .header(CONTENT_TYPE, "application/json")
            .build()
    }

    pub async fn get_issue(&self, issue_key: &str) -> Result<IssueBody> {
        let url = self.issue_url(issue_key)?;

        debug!(issue_key, url = %url, "Sending request");

        let request = self.build_request(url).map_err(|e| self.classify(e))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        debug!(issue_key, status = status.as_u16(), "Received response");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ApiError::AuthenticationFailed {
                    status: status.as_u16(),
                })
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound {
                issue_key: issue_key.to_string(),
            }),
            status if status.is_success() => {
                let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
                serde_json::from_slice::<IssueBody>(&bytes)
                    .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            }
            _ => {
                let mut message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Unexpected status: {}", status));
                if message.len() > MAX_ERROR_BODY {
                    let cut = (0..=MAX_ERROR_BODY)
                        .rev()
                        .find(|i| message.is_char_boundary(*i))
                        .unwrap_or(0);
                    message.truncate(cut);
                }
                Err(ApiError::UnexpectedStatus {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                after: self.timeout,
            }
        } else if err.is_connect() {
            ApiError::ConnectionFailed {
                message: err.to_string(),
            }
        } else {
            ApiError::RequestFailed(err)
        }
    }
}

#[async_trait]
impl IssueSource for ApiClient {
    async fn fetch_issue(&self, issue_key: &str) -> Result<IssueBody> {
        self.get_issue(issue_key).await
    }
}
