#![allow(dead_code)]

//! Test doubles shared by the integration suites.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use courier::{
    AuthError, Authenticator, Headers, HttpMethod, Payload, RawResponse, Request, Serializer,
    Transport, TransportError,
};
use parking_lot::Mutex;

/// One dispatched call as seen by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: HttpMethod,
    pub base_url: String,
    pub path: String,
    pub headers: Headers,
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetSerializer(Serializer),
    AddHeaders(Headers),
    Call(Call),
}

/// Transport that records every interaction and replays canned responses.
///
/// Queued responses are returned first; afterwards every call gets the
/// fallback response.
pub struct RecordingTransport {
    events: Mutex<Vec<Event>>,
    queued: Mutex<VecDeque<RawResponse>>,
    fallback: RawResponse,
    fail: bool,
}

impl RecordingTransport {
    pub fn responding(response: RawResponse) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            queued: Mutex::new(VecDeque::new()),
            fallback: response,
            fail: false,
        })
    }

    pub fn ok_json(body: &str) -> Arc<Self> {
        Self::responding(RawResponse::new(200, body.to_owned()).with_header("content-type", "application/json"))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            queued: Mutex::new(VecDeque::new()),
            fallback: RawResponse::new(200, ""),
            fail: true,
        })
    }

    pub fn enqueue(&self, response: RawResponse) {
        self.queued.lock().push_back(response);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Call(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn serializers(&self) -> Vec<Serializer> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::SetSerializer(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn record(
        &self,
        method: HttpMethod,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.events.lock().push(Event::Call(Call {
            method,
            base_url: base_url.to_owned(),
            path: path.to_owned(),
            headers: headers.clone(),
            payload: payload.cloned(),
        }));
        if self.fail {
            return Err(TransportError::Connect(Box::new(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))));
        }
        let queued = self.queued.lock().pop_front();
        Ok(queued.unwrap_or_else(|| self.fallback.clone()))
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn set_serializer(&self, serializer: Serializer) {
        self.events.lock().push(Event::SetSerializer(serializer));
    }

    fn add_headers(&self, headers: &Headers) {
        self.events.lock().push(Event::AddHeaders(headers.clone()));
    }

    async fn get(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.record(HttpMethod::Get, base_url, path, headers, payload)
    }

    async fn post(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.record(HttpMethod::Post, base_url, path, headers, payload)
    }

    async fn patch(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.record(HttpMethod::Patch, base_url, path, headers, payload)
    }

    async fn put(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.record(HttpMethod::Put, base_url, path, headers, payload)
    }

    async fn delete(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.record(HttpMethod::Delete, base_url, path, headers, payload)
    }

    async fn head(
        &self,
        base_url: &str,
        path: &str,
        headers: &Headers,
        payload: Option<&Payload>,
    ) -> Result<RawResponse, TransportError> {
        self.record(HttpMethod::Head, base_url, path, headers, payload)
    }
}

/// Authenticator that appends its label to an `x-trail` header on the way
/// out and on the way back, remembering what it was given
pub struct Probe {
    label: &'static str,
    pub seen_request_headers: Mutex<Vec<Headers>>,
    pub seen_response_headers: Mutex<Vec<Headers>>,
    pub seen_response_requests: Mutex<Vec<Request>>,
}

impl Probe {
    pub fn new(label: &'static str) -> Arc<Self> {
        Arc::new(Self {
            label,
            seen_request_headers: Mutex::new(Vec::new()),
            seen_response_headers: Mutex::new(Vec::new()),
            seen_response_requests: Mutex::new(Vec::new()),
        })
    }

    fn extend_trail(&self, current: Option<&str>) -> String {
        match current {
            Some(trail) => format!("{trail},{}", self.label),
            None => self.label.to_owned(),
        }
    }
}

#[async_trait]
impl Authenticator for Probe {
    async fn intercept_request(&self, request: Request) -> Result<Request, AuthError> {
        self.seen_request_headers.lock().push(request.headers().clone());
        let trail = self.extend_trail(request.headers().get("x-trail"));
        Ok(request.with_header("x-trail", trail)?)
    }

    async fn intercept_response(
        &self,
        request: &Request,
        response: RawResponse,
    ) -> Result<RawResponse, AuthError> {
        self.seen_response_requests.lock().push(request.clone());
        self.seen_response_headers.lock().push(response.headers.clone());
        let trail = self.extend_trail(response.headers.get("x-trail"));
        Ok(response.with_header("x-trail", trail))
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

/// Authenticator that rejects in the configured phase
pub struct Rejecting {
    pub on_request: bool,
}

#[async_trait]
impl Authenticator for Rejecting {
    async fn intercept_request(&self, request: Request) -> Result<Request, AuthError> {
        if self.on_request {
            return Err(AuthError::Unauthorized("request rejected".to_owned()));
        }
        Ok(request)
    }

    async fn intercept_response(
        &self,
        _request: &Request,
        response: RawResponse,
    ) -> Result<RawResponse, AuthError> {
        if self.on_request {
            return Ok(response);
        }
        Err(AuthError::Unauthorized(format!("status {}", response.status)))
    }
}

/// Interceptor that swaps the request for one with a different path
pub struct PathRewriter;

#[async_trait]
impl Authenticator for PathRewriter {
    async fn intercept_request(&self, request: Request) -> Result<Request, AuthError> {
        Request::builder()
            .method(request.method())
            .path("/somewhere-else")
            .build()
            .map_err(|e| AuthError::Other(Box::new(e)))
    }
}

/// Interceptor that adds one fixed header
pub struct HeaderInjector {
    pub name: &'static str,
    pub value: &'static str,
}

#[async_trait]
impl Authenticator for HeaderInjector {
    async fn intercept_request(&self, request: Request) -> Result<Request, AuthError> {
        Ok(request.with_header(self.name, self.value)?)
    }
}
