//! `ureq`-backed transport
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use log::debug;
use std::time::Duration;
use ureq::Agent;

use super::{HttpRequest, HttpResponse, Method, RequestBody, Transport, TransportError};

/// Production transport built on a shared `ureq::Agent`
pub struct UreqTransport {
    agent: Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UreqTransport {
    /// Create a transport, optionally bounding every request by `timeout`
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();

        Self {
            agent: Agent::new_with_config(config),
        }
    }

    fn execute(
        &self,
        request: &HttpRequest,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let url = request.url.as_str();
        match request.method {
            Method::Get => {
                let mut builder = self.agent.get(url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            Method::Post | Method::Put => {
                let mut builder = if request.method == Method::Post {
                    self.agent.post(url)
                } else {
                    self.agent.put(url)
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    RequestBody::Empty => builder.send_empty(),
                    RequestBody::Form(pairs) => {
                        builder.send_form(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    }
                    RequestBody::Json(value) => builder.send_json(value),
                }
            }
        }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("{} {}", request.method, strip_query(&request.url));

        let mut response = self.execute(request).map_err(map_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.body_mut().read_to_string().map_err(map_error)?;

        debug!("{} {} -> {}", request.method, strip_query(&request.url), status);
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

fn map_error(error: ureq::Error) -> TransportError {
    match error {
        timeout @ ureq::Error::Timeout(_) => TransportError::Timeout(timeout.to_string()),
        other => TransportError::Network(other.to_string()),
    }
}

/// URL without its query string, for logging
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
