//! In-memory transport that replays queued responses
//!
//! Used by tests to drive the token protocol and the sync engine without a
//! network. Every request is recorded so tests can assert on exactly what
//! was sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{HttpRequest, HttpResponse, Transport, TransportError};

/// Transport returning pre-scripted results in FIFO order
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn push_response(&self, response: HttpResponse) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, value: serde_json::Value) -> &Self {
        self.push_response(HttpResponse::json(status, &value))
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: TransportError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    /// All requests sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose URL contains `fragment`
    pub fn count_matching(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    /// Responses still queued
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Network(format!(
                    "no scripted response for {} {}",
                    request.method, request.url
                )))
            })
    }
}
