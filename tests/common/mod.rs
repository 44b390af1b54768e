//! Shared test infrastructure for integration tests.
//!
//! `FakeEngine` is an axum server on a loopback port that records each
//! request and answers from a caller-supplied function.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;

/// A request as seen by the fake engine.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

type Handler = dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync;

#[derive(Clone)]
struct EngineState {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct FakeEngine {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeEngine {
    /// Serve on an ephemeral loopback port until the test process exits.
    pub fn start(
        handler: impl Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake engine");
        listener.set_nonblocking(true).expect("nonblocking listener");
        let addr = listener.local_addr().expect("fake engine address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = EngineState {
            handler: Arc::new(handler),
            requests: Arc::clone(&requests),
        };
        let app = Router::new().fallback(answer).with_state(state);

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("fake engine runtime");
            runtime.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("adopt listener");
                axum::serve(listener, app).await.expect("fake engine run");
            });
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

/// Requests are recorded before the response is written, so a client that
/// has seen its response can rely on the request being visible.
async fn answer(
    State(state): State<EngineState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let request = RecordedRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect(),
        body: body.to_vec(),
    };
    let (status, response_body) = (state.handler)(&request);
    state.requests.lock().expect("requests lock").push(request);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        response_body,
    )
}

/// A loopback address with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}")
}

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_meili-seed"))
}

/// Run the CLI with a clean environment for the variables it reads.
pub fn run_cli(args: &[&str]) -> Output {
    Command::new(binary())
        .args(args)
        .env_remove("MEILISEARCH_HOST")
        .env_remove("MEILISEARCH_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("run meili-seed")
}
