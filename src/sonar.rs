use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Credentials, Token};

pub const DEFAULT_URL: &str = "http://localhost:9000";
pub const PROJECTS_CREATE: &str = "/api/projects/create";
pub const TOKENS_GENERATE: &str = "/api/user_tokens/generate";
pub const SYSTEM_STATUS: &str = "/api/system/status";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {message}")]
    Status { endpoint: String, status: u16, message: String },

    #[error("Unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Body of a successful `user_tokens/generate` call.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub login: String,
    pub name: String,
    pub token: String,
    pub created_at: String,
}

impl From<TokenResponse> for Token {
    fn from(response: TokenResponse) -> Self {
        Token { name: response.name, value: response.token }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SystemStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub status: String,
}

impl SystemStatus {
    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    msg: String,
}

/// The slice of the SonarQube Web API the orchestrator relies on.
pub trait SonarApi {
    fn create_project(&self, name: &str, organization: &str) -> Result<ProjectOutcome, ApiError>;

    fn create_token(&self, name: &str) -> Result<TokenResponse, ApiError>;

    /// `timeout` bounds this one request; implementations may cap it further.
    fn system_status(&self, timeout: Duration) -> Result<SystemStatus, ApiError>;
}

/// Blocking HTTP client for a local SonarQube instance.
pub struct SonarClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl SonarClient {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), credentials, timeout })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<Response, ApiError> {
        debug!(endpoint, "POST");
        self.http
            .post(self.url(endpoint))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .form(form)
            .send()
            .map_err(|source| ApiError::Transport { endpoint: endpoint.to_string(), source })
    }
}

impl SonarApi for SonarClient {
    fn create_project(&self, name: &str, organization: &str) -> Result<ProjectOutcome, ApiError> {
        let response = self.post_form(
            PROJECTS_CREATE,
            &[("project", name), ("organization", organization), ("name", name)],
        )?;
        let status = response.status();
        if status.is_success() {
            return Ok(ProjectOutcome::Created);
        }

        let message = error_message(response);
        if status == StatusCode::BAD_REQUEST && message.contains("already exists") {
            warn!(project = name, "{message}");
            return Ok(ProjectOutcome::AlreadyExists);
        }
        Err(ApiError::Status { endpoint: PROJECTS_CREATE.to_string(), status: status.as_u16(), message })
    }

    fn create_token(&self, name: &str) -> Result<TokenResponse, ApiError> {
        let response = self.post_form(TOKENS_GENERATE, &[("name", name)])?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                endpoint: TOKENS_GENERATE.to_string(),
                status: status.as_u16(),
                message: error_message(response),
            });
        }
        response
            .json::<TokenResponse>()
            .map_err(|source| ApiError::Decode { endpoint: TOKENS_GENERATE.to_string(), source })
    }

    fn system_status(&self, timeout: Duration) -> Result<SystemStatus, ApiError> {
        let response = self
            .http
            .get(self.url(SYSTEM_STATUS))
            .timeout(timeout.min(self.timeout))
            .send()
            .map_err(|source| ApiError::Transport { endpoint: SYSTEM_STATUS.to_string(), source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: SYSTEM_STATUS.to_string(),
                status: status.as_u16(),
                message: error_message(response),
            });
        }
        response
            .json::<SystemStatus>()
            .map_err(|source| ApiError::Decode { endpoint: SYSTEM_STATUS.to_string(), source })
    }
}

/// SonarQube reports failures as `{"errors":[{"msg":"..."}]}`; fall back to the raw body.
fn error_message(response: Response) -> String {
    let body = response.text().unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) if !parsed.errors.is_empty() => {
            parsed.errors.into_iter().map(|error| error.msg).collect::<Vec<_>>().join("; ")
        }
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}
