use http::StatusCode;

use crate::{capability::Capability, retry::CallKind, transport::TransportError};

/// Everything that may go wrong while talking to the gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transient failure that survived the retries: network, timeout, bad status or garbage body.
    #[error("failed to communicate with the gateway (`{path}`)")]
    Communication {
        path: String,

        #[source]
        source: FetchError,
    },

    /// The session is not authenticated, or the account is not allowed to access the endpoint.
    #[error("authentication required to access `{path}`")]
    AuthenticationRequired { path: String },

    /// No updater has claimed the production data.
    #[error("probe failed: {0}")]
    ProbeFailed(String),

    /// The gateway returned structurally valid but known-bad data.
    #[error("poor data quality: {0}")]
    PoorDataQuality(String),

    #[error("feature `{0:?}` is not available on this gateway")]
    FeatureNotAvailable(Capability),

    /// The command needs data from a previous aggregation cycle.
    #[error("no {0} data has been received yet")]
    NoData(&'static str),

    #[error("failed to serialize the request body")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to build the HTTP client")]
    Client(#[source] reqwest::Error),
}

impl Error {
    /// Convert a failed live call, keeping authentication failures distinct.
    pub fn live(path: &str, error: FetchError) -> Self {
        match error {
            FetchError::Unauthorized(_) => Self::AuthenticationRequired { path: path.to_owned() },
            source => Self::Communication { path: path.to_owned(), source },
        }
    }

    #[must_use]
    pub const fn is_authentication_required(&self) -> bool {
        matches!(self, Self::AuthenticationRequired { .. })
    }
}

/// Low-level failure of a single call, before any classification by the caller.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport failure")]
    Transport(#[from] TransportError),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("access denied with status {0}")]
    Unauthorized(StatusCode),

    #[error("failed to deserialize the response")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether the error is worth retrying for the given call kind.
    ///
    /// Malformed bodies are only retried for live calls: during probing, garbage means «not this source».
    #[must_use]
    pub const fn is_transient(&self, kind: CallKind) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Decode(_) => matches!(kind, CallKind::Live),
            Self::Status(_) | Self::Unauthorized(_) => false,
        }
    }
}
