use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::{AuthError, SessionStore, User};
use crate::config::{BackendConfig, ConfigError};

const USER_AGENT: &str = "tripnote/0.1.0";

/// Errors returned by the REST data client.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {message}")]
    HttpStatus { status: StatusCode, message: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to deserialize response: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("requested record not found")]
    NotFound,
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl DataError {
    /// Text suitable for showing to the user: the backend's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            DataError::HttpStatus { message, .. } if !message.is_empty() => message.clone(),
            DataError::Auth(AuthError::NotAuthenticated) => "User not found".to_owned(),
            other => other.to_string(),
        }
    }
}

pub type DataResult<T> = Result<T, DataError>;

/// Sort direction for `order=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Row filter and ordering in the backend's query-string dialect.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.into()));
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.into(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        let direction = match direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        self.params.push(("order".into(), format!("{column}.{direction}")));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Client for the table endpoints under `/rest/v1`, authorized as the signed-in user.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    config: BackendConfig,
    auth: Arc<dyn SessionStore>,
}

impl RestClient {
    pub fn new(config: BackendConfig, auth: Arc<dyn SessionStore>) -> DataResult<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, config, auth })
    }

    /// The signed-in user, confirmed by the auth service.
    pub async fn current_user(&self) -> DataResult<User> {
        Ok(self.auth.get_user().await?)
    }

    pub async fn select<T>(&self, table: &str, query: &Query) -> DataResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let request = self.request(Method::GET, table, query).await?;
        self.send(request).await
    }

    /// Insert `rows` and return them as stored.
    pub async fn insert<B, T>(&self, table: &str, rows: &B) -> DataResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(Method::POST, table, &Query::new())
            .await?
            .header("Prefer", "return=representation")
            .json(rows);
        self.send(request).await
    }

    pub async fn update<B, T>(&self, table: &str, filter: &Query, patch: &B) -> DataResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(Method::PATCH, table, filter)
            .await?
            .header("Prefer", "return=representation")
            .json(patch);
        self.send(request).await
    }

    pub async fn delete(&self, table: &str, filter: &Query) -> DataResult<()> {
        let response = self.request(Method::DELETE, table, filter).await?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn request(&self, method: Method, table: &str, query: &Query) -> DataResult<RequestBuilder> {
        let endpoint = self.config.endpoint()?;
        let mut url = endpoint.url(&format!("rest/v1/{table}"))?;
        if !query.pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(query.pairs());
        }
        let session = self
            .auth
            .get_session()
            .await?
            .ok_or(AuthError::NotAuthenticated)?;
        debug!(method = method.as_str(), table, "rest request");
        Ok(self
            .http
            .request(method, url)
            .header("apikey", endpoint.api_key())
            .bearer_auth(&session.access_token))
    }

    async fn send<T>(&self, request: RequestBuilder) -> DataResult<T>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response).await);
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn status_error(response: reqwest::Response) -> DataError {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or(body);
    DataError::HttpStatus { status, message }
}
