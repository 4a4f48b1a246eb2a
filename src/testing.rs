//! In-memory gateway for the unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;

use crate::{
    info::{Firmware, GatewayInfo},
    retry::RetryPolicy,
    session::Session,
    transport::{Request, Response, Transport, TransportError},
};

/// Session without the retry delays.
pub fn new_session(transport: &MockTransport) -> Session {
    Session::new(Box::new(transport.clone()), RetryPolicy::immediate(2), RetryPolicy::immediate(3))
}

pub fn gateway_info(firmware: Firmware, is_metered: bool) -> GatewayInfo {
    GatewayInfo::builder()
        .serial_number("122243095631")
        .firmware(firmware)
        .is_metered(is_metered)
        .build()
}

#[derive(Clone)]
enum Reply {
    Body(StatusCode, String),
    ConnectionRefused,
}

#[derive(Default)]
struct State {
    replies: HashMap<String, Reply>,
    n_calls: HashMap<String, usize>,
    bodies: HashMap<String, Value>,
}

/// Scripted gateway: unknown paths answer `404 Not Found`.
///
/// Clones share the state, so a test may keep one to inspect the calls.
#[derive(Clone, Default)]
pub struct MockTransport(Arc<Mutex<State>>);

impl MockTransport {
    pub fn with_json(self, path: &str, value: Value) -> Self {
        self.set_json(path, value);
        self
    }

    pub fn with_status(self, path: &str, status: StatusCode) -> Self {
        self.with_body(path, status, "")
    }

    pub fn with_body(self, path: &str, status: StatusCode, body: &str) -> Self {
        self.set(path, Reply::Body(status, body.to_owned()));
        self
    }

    pub fn with_connection_refused(self, path: &str) -> Self {
        self.set(path, Reply::ConnectionRefused);
        self
    }

    pub fn set_json(&self, path: &str, value: Value) {
        self.set(path, Reply::Body(StatusCode::OK, value.to_string()));
    }

    fn set(&self, path: &str, reply: Reply) {
        self.0.lock().unwrap().replies.insert(path.to_owned(), reply);
    }

    pub fn n_calls(&self, path: &str) -> usize {
        self.0.lock().unwrap().n_calls.get(path).copied().unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.0.lock().unwrap().n_calls.values().sum()
    }

    pub fn reset_calls(&self) {
        self.0.lock().unwrap().n_calls.clear();
    }

    pub fn last_body(&self, path: &str) -> Option<Value> {
        self.0.lock().unwrap().bodies.get(path).cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut state = self.0.lock().unwrap();
        *state.n_calls.entry(request.path.clone()).or_default() += 1;
        if let Some(body) = request.body {
            state.bodies.insert(request.path.clone(), body);
        }
        match state.replies.get(&request.path).cloned() {
            Some(Reply::Body(status, body)) => Ok(Response { status, body: body.into_bytes() }),
            Some(Reply::ConnectionRefused) => {
                Err(TransportError::Connect("connection refused".into()))
            }
            None => Ok(Response { status: StatusCode::NOT_FOUND, body: Vec::new() }),
        }
    }
}
