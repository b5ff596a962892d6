#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use courier::{
    Connection, ConnectionConfig, DefaultAuthenticators, Headers, HttpMethod, Payload, RawResponse,
    Serializer, Transport, TransportError,
};
use parking_lot::Mutex;

pub const BASE_URL: &str = "https://api.example.com";
pub const CHANNEL: &str = "channel-1";
pub const DEVICE: &str = "device-1";

#[derive(Debug, Clone)]
pub struct Call {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Headers,
    pub payload: Option<Payload>,
}

/// Transport answering per path from a script.
///
/// Each path has a queue of responses; the last one repeats. Unscripted
/// paths answer `200 {}`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<RawResponse>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .entry(path.to_owned())
            .or_default()
            .push_back(RawResponse::new(status, body.to_owned()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.path == path)
            .cloned()
            .collect()
    }

    fn answer(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.calls.lock().push(Call {
            method,
            path: path.to_owned(),
            headers: headers.clone(),
            payload: payload.cloned(),
        });
        let mut routes = self.routes.lock();
        let response = match routes.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| RawResponse::new(200, "{}")))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn set_serializer(&self, _serializer: Serializer) {}

    fn add_headers(&self, _headers: &Headers) {}

    async fn get(
        &self,
        _base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.answer(HttpMethod::Get, path, headers, payload)
    }

    async fn post(
        &self,
        _base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.answer(HttpMethod::Post, path, headers, payload)
    }

    async fn patch(
        &self,
        _base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.answer(HttpMethod::Patch, path, headers, payload)
    }

    async fn put(
        &self,
        _base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.answer(HttpMethod::Put, path, headers, payload)
    }

    async fn delete(
        &self,
        _base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.answer(HttpMethod::Delete, path, headers, payload)
    }

    async fn head(
        &self,
        _base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.answer(HttpMethod::Head, path, headers, payload)
    }
}

pub fn bare_connection(transport: &Arc<ScriptedTransport>) -> Connection {
    Connection::new(
        transport.clone(),
        &ConnectionConfig::new(BASE_URL, CHANNEL),
        DefaultAuthenticators::default(),
    )
}

pub fn connection(transport: &Arc<ScriptedTransport>, defaults: DefaultAuthenticators) -> Connection {
    Connection::new(
        transport.clone(),
        &ConnectionConfig::new(BASE_URL, CHANNEL),
        defaults,
    )
}
