mod auth;

use std::time::Duration;

use async_trait::async_trait;
use http::{
    Method,
    StatusCode,
    header::{AUTHORIZATION, WWW_AUTHENTICATE},
};
use reqwest::{Client, Url};

pub use self::auth::{Auth, BasicCredentials, BearerToken, DigestCredentials, NoAuth};
use crate::prelude::*;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Network-level failure, raised before any status code is known.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout(#[source] BoxError),

    #[error("failed to connect")]
    Connect(#[source] BoxError),

    #[error("protocol error")]
    Protocol(#[source] BoxError),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.into())
        } else if error.is_connect() {
            Self::Connect(error.into())
        } else {
            Self::Protocol(error.into())
        }
    }
}

#[must_use]
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,

    /// Path relative to the gateway base URL, including the query string.
    pub path: String,

    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: Method::GET, path: path.into(), body: None }
    }

    pub fn with_body(method: Method, path: impl Into<String>, body: serde_json::Value) -> Self {
        Self { method, path: path.into(), body: Some(body) }
    }
}

#[must_use]
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Sends a request to the gateway with the authentication attached.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// Default [`Transport`] on top of [`reqwest`].
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    auth: Box<dyn Auth>,
}

impl ReqwestTransport {
    /// The gateway is fast to accept a connection, but slow to respond.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(45);

    #[instrument(skip_all, fields(base_url = %base_url))]
    pub fn new(
        base_url: Url,
        auth: Box<dyn Auth>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("envoy-gateway/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            // Local gateways present self-signed certificates.
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(Error::Client)?;
        Ok(Self { client, base_url, auth })
    }

    async fn send_once(
        &self,
        request: &Request,
        url: Url,
        authorization: Option<String>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut builder = self.auth.attach(self.client.request(request.method.clone(), url));
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder.send().await
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip_all, level = Level::DEBUG, fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|error| TransportError::Protocol(error.into()))?;
        let mut response = self.send_once(&request, url.clone(), None).await?;
        if response.status() == StatusCode::UNAUTHORIZED
            && let Some(challenge) =
                response.headers().get(WWW_AUTHENTICATE).and_then(|value| value.to_str().ok())
            && let Some(authorization) = self.auth.respond(challenge, &request.method, &request.path)
        {
            debug!("answering the challenge");
            response = self.send_once(&request, url, Some(authorization)).await?;
        }
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        debug!(%status, n_bytes = body.len(), "received");
        Ok(Response { status, body })
    }
}
