use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    cache::EndpointCache,
    prelude::*,
    retry::{CallKind, RetryPolicy},
    snapshot::Snapshot,
    transport::{Request, Transport},
};

/// Gateway calls with the retry envelope and the per-pass response cache.
pub struct Session {
    transport: Box<dyn Transport>,
    cache: EndpointCache,
    probe_policy: RetryPolicy,
    live_policy: RetryPolicy,
}

impl Session {
    pub fn new(
        transport: Box<dyn Transport>,
        probe_policy: RetryPolicy,
        live_policy: RetryPolicy,
    ) -> Self {
        Self { transport, cache: EndpointCache::default(), probe_policy, live_policy }
    }

    /// Invalidate all the cached responses. Called by the orchestrators at each pass boundary.
    pub(crate) fn clear_cache(&mut self) {
        trace!(n_entries = self.cache.len(), "clearing the cache…");
        self.cache.clear();
    }

    /// Fetch the endpoint for probing.
    pub async fn probe<T: DeserializeOwned>(&mut self, path: &str) -> Result<T, FetchError> {
        let value = self.fetch(CallKind::Probe, path).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch the endpoint for probing without interpreting the payload.
    pub async fn probe_value(&mut self, path: &str) -> Result<Value, FetchError> {
        self.fetch(CallKind::Probe, path).await
    }

    /// Fetch the endpoint for the snapshot and record the raw payload in it.
    pub async fn live<T: DeserializeOwned>(
        &mut self,
        path: &str,
        snapshot: &mut Snapshot,
    ) -> Result<T> {
        let value = self.fetch(CallKind::Live, path).await.map_err(|error| Error::live(path, error))?;
        snapshot.raw.insert(path.to_owned(), value.clone());
        serde_json::from_value(value).map_err(|error| Error::live(path, error.into()))
    }

    /// Send a state-changing request: no caching, no retries.
    #[instrument(skip_all, fields(method = %method, path = path))]
    pub async fn command(&self, method: Method, path: &str, body: Value) -> Result<Value> {
        info!("sending…");
        let response = self
            .transport
            .send(Request::with_body(method, path, body))
            .await
            .map_err(|error| Error::live(path, error.into()))?;
        check_status(response.status).map_err(|error| Error::live(path, error))?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body).map_err(|error| Error::live(path, error.into()))
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(kind = ?kind, path = path))]
    async fn fetch(&mut self, kind: CallKind, path: &str) -> Result<Value, FetchError> {
        if let Some(value) = self.cache.get(path) {
            trace!("cache hit");
            return Ok(value.clone());
        }
        let policy = match kind {
            CallKind::Probe => self.probe_policy,
            CallKind::Live => self.live_policy,
        };
        let transport = &*self.transport;
        let value = policy.run(kind, || fetch_once(transport, path)).await?;
        self.cache.insert(path, value.clone());
        Ok(value)
    }
}

async fn fetch_once(transport: &dyn Transport, path: &str) -> Result<Value, FetchError> {
    let response = transport.send(Request::get(path)).await?;
    check_status(response.status)?;
    let value: Value = serde_json::from_slice(&response.body)?;
    if let Some(status) = embedded_status(&value)
        && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
    {
        return Err(FetchError::Unauthorized(status));
    }
    Ok(value)
}

fn check_status(status: StatusCode) -> Result<(), FetchError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::Unauthorized(status)),
        status if status.is_success() => Ok(()),
        status => Err(FetchError::Status(status)),
    }
}

/// Some firmware answers `200 OK` with `{"status": 401, "message": "Unauthorized"}` in the body.
fn embedded_status(value: &Value) -> Option<StatusCode> {
    let object = value.as_object()?;
    object.get("message")?;
    let status = u16::try_from(object.get("status")?.as_u64()?).ok()?;
    StatusCode::from_u16(status).ok()
}
