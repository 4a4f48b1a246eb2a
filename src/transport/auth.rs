use http::Method;
use http_auth::{PasswordClient, PasswordParams};
use reqwest::RequestBuilder;

use crate::prelude::*;

/// Attaches credentials to every request.
///
/// Obtaining the credentials (cloud-issued tokens, installer passwords) is up to the caller.
pub trait Auth: Send + Sync {
    fn attach(&self, request: RequestBuilder) -> RequestBuilder;

    /// `Authorization` value answering the `WWW-Authenticate` challenge of a `401 Unauthorized`.
    ///
    /// `None` makes the transport return the `401` as is.
    fn respond(&self, _challenge: &str, _method: &Method, _uri: &str) -> Option<String> {
        None
    }
}

/// No credentials at all: legacy firmware exposes the read-only endpoints openly.
pub struct NoAuth;

impl Auth for NoAuth {
    fn attach(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}

/// Cloud-issued JWT, used by firmware 7 and newer.
pub struct BearerToken(String);

impl BearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Auth for BearerToken {
    fn attach(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.0)
    }
}

/// Local username and password, sent preemptively.
///
/// Legacy gateways guard the installer resources with a digest challenge instead,
/// use [`DigestCredentials`] for those.
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl Auth for BasicCredentials {
    fn attach(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }
}

/// Installer credentials of the legacy firmware, answering the digest challenge.
///
/// Nothing is cached between the requests, so every request costs two round trips.
pub struct DigestCredentials {
    pub username: String,
    pub password: String,
}

impl Auth for DigestCredentials {
    fn attach(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }

    fn respond(&self, challenge: &str, method: &Method, uri: &str) -> Option<String> {
        let mut client = PasswordClient::try_from(challenge)
            .inspect_err(|error| warn!(error = %error, "unsupported challenge"))
            .ok()?;
        client
            .respond(&PasswordParams {
                username: &self.username,
                password: &self.password,
                uri,
                method: method.as_str(),
                body: Some(&[]),
            })
            .inspect_err(|error| warn!(error = %error, "failed to answer the challenge"))
            .ok()
    }
}
