//! HTTP transport used by the seeding pipeline.
//!
//! The pipeline only sees the [`Transport`] trait: one blocking request in,
//! one [`StepResult`] (or [`TransportError`]) out. Non-2xx statuses are
//! ordinary responses here; deciding what a status means is the pipeline's
//! job. [`HttpTransport`] is the `ureq`-backed implementation used by the CLI.
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// HTTP methods the pipeline issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn has_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw response to a single request.
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    pub status: u16,
    pub body: Vec<u8>,
    /// The body parsed as JSON, when it parses.
    pub parsed: Option<Value>,
}

impl StepResult {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        let parsed = serde_json::from_slice(&body).ok();
        Self {
            status,
            body,
            parsed,
        }
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Network-level failures, distinct from any HTTP status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("encode request body: {0}")]
    Encode(String),
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        let message = err.to_string();
        match err {
            ureq::Error::Io(io) => match io.kind() {
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted => Self::Connect(io.to_string()),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                    Self::Timeout(io.to_string())
                }
                _ => Self::Io(io),
            },
            ureq::Error::Timeout(_) => Self::Timeout(message),
            ureq::Error::HostNotFound => Self::Connect(message),
            _ => Self::Protocol(message),
        }
    }
}

/// Performs a single synchronous request against the search engine.
///
/// `path` is relative to the host the transport was built for. When
/// `payload` is present it is sent as `application/json`; `credential` is
/// attached as a bearer token on every request.
pub trait Transport {
    fn send(
        &self,
        method: Method,
        path: &str,
        credential: &str,
        payload: Option<&Value>,
    ) -> Result<StepResult, TransportError>;
}

/// Blocking `ureq` transport bound to one host.
pub struct HttpTransport {
    agent: ureq::Agent,
    host: String,
}

impl HttpTransport {
    /// `host` is expected without a trailing slash; see `RunConfig::new`.
    pub fn new(host: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            host: host.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        path: &str,
        credential: &str,
        payload: Option<&Value>,
    ) -> Result<StepResult, TransportError> {
        let url = self.url(path);
        let auth = format!("Bearer {credential}");
        let body = payload
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| TransportError::Encode(err.to_string()))?;
        if body.is_some() && !method.has_body() {
            return Err(TransportError::Encode(format!(
                "{method} requests cannot carry a body"
            )));
        }

        let start = Instant::now();
        let response = match method {
            Method::Get => self
                .agent
                .get(url.as_str())
                .header("Authorization", auth.as_str())
                .call(),
            Method::Delete => self
                .agent
                .delete(url.as_str())
                .header("Authorization", auth.as_str())
                .call(),
            Method::Post | Method::Put => {
                let request = if method == Method::Post {
                    self.agent.post(url.as_str())
                } else {
                    self.agent.put(url.as_str())
                };
                let request = request
                    .header("Authorization", auth.as_str())
                    .header("Content-Type", "application/json");
                match &body {
                    Some(bytes) => request.send(bytes.as_slice()),
                    None => request.send_empty(),
                }
            }
        };
        let mut response = response?;
        let status = response.status().as_u16();
        let bytes = response.body_mut().read_to_vec()?;

        tracing::debug!(
            method = method.as_str(),
            url = url.as_str(),
            status,
            response_bytes = bytes.len(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "http request complete"
        );
        Ok(StepResult::new(status, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn step_result_parses_json_bodies() {
        let result = StepResult::new(202, br#"{"taskUid": 7}"#.to_vec());
        assert_eq!(result.parsed.as_ref().and_then(|v| v["taskUid"].as_u64()), Some(7));
    }

    #[test]
    fn step_result_keeps_raw_body_when_not_json() {
        let result = StepResult::new(502, b"Bad Gateway".to_vec());
        assert!(result.parsed.is_none());
        assert_eq!(result.body_text(), "Bad Gateway");
    }

    #[test]
    fn only_post_and_put_carry_bodies() {
        assert!(Method::Post.has_body());
        assert!(Method::Put.has_body());
        assert!(!Method::Get.has_body());
        assert!(!Method::Delete.has_body());
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    /// A loopback address with nothing listening on it.
    fn closed_port_host() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
        let addr = listener.local_addr().expect("probe address");
        drop(listener);
        format!("http://{addr}")
    }

    #[test]
    fn refused_connection_is_a_connect_error() {
        let transport = HttpTransport::new(&closed_port_host(), Duration::from_secs(2));
        let err = transport
            .send(Method::Get, "/health", "key", None)
            .expect_err("no server listening");
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }

    #[test]
    fn silent_server_is_a_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind silent server");
        let host = format!("http://{}", listener.local_addr().expect("address"));
        // Accept and hold connections open without ever answering.
        thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming() {
                held.push(stream);
            }
        });

        let transport = HttpTransport::new(&host, Duration::from_secs(1));
        let started = Instant::now();
        let err = transport
            .send(Method::Get, "/health", "key", None)
            .expect_err("server never replies");
        assert!(matches!(err, TransportError::Timeout(_)), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn body_on_get_is_rejected_before_sending() {
        let transport = HttpTransport::new(&closed_port_host(), Duration::from_secs(2));
        let payload = serde_json::json!({"q": "x"});
        let err = transport
            .send(Method::Get, "/health", "key", Some(&payload))
            .expect_err("GET cannot carry a body");
        assert!(matches!(err, TransportError::Encode(_)));
    }
}
