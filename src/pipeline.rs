//! The seeding pipeline: create, configure, ingest, verify.
//!
//! Steps run strictly in order and every step runs regardless of how the
//! previous one went. Each response is classified at the step boundary and
//! absorbed; `Pipeline::run` never fails, it returns a `PipelineOutcome`
//! describing what happened.
use crate::config::RunConfig;
use crate::dataset::{self, PRIMARY_KEY};
use crate::report::{Reporter, StepEvent};
use crate::transport::{Method, StepResult, Transport, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Instant;

pub const VERIFICATION_QUERY: &str = "adventure";
pub const VERIFICATION_FILTER: &str = "rating > 7.8";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    HealthCheck,
    DropIndex,
    CreateIndex,
    SearchableAttributes,
    FilterableAttributes,
    IngestDocuments,
    Synonyms,
    VerificationSearch,
}

impl StepName {
    pub fn as_str(self) -> &'static str {
        match self {
            StepName::HealthCheck => "health check",
            StepName::DropIndex => "drop index",
            StepName::CreateIndex => "create index",
            StepName::SearchableAttributes => "searchable attributes",
            StepName::FilterableAttributes => "filterable attributes",
            StepName::IngestDocuments => "ingest documents",
            StepName::Synonyms => "synonyms",
            StepName::VerificationSearch => "verification search",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a step counts as failed. None of these stop the run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport(String),
    /// The server rejected the request as malformed (400).
    Rejected(u16),
    UnexpectedStatus(u16),
    /// Expected status, but the body could not be interpreted.
    MalformedBody(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport(err) => write!(f, "transport error: {err}"),
            FailureKind::Rejected(status) => write!(f, "rejected ({status})"),
            FailureKind::UnexpectedStatus(status) => write!(f, "unexpected status {status}"),
            FailureKind::MalformedBody(err) => write!(f, "malformed body: {err}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Success,
    /// Non-success status meaning the desired state already holds.
    BenignConflict,
    Failure(FailureKind),
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Success => f.write_str("success"),
            Classification::BenignConflict => f.write_str("benign conflict"),
            Classification::Failure(kind) => write!(f, "failure: {kind}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: StepName,
    pub classification: Classification,
    pub message: String,
}

/// The reported fields of one search hit, kept as the engine sent them.
///
/// Hits are not schema-checked: a hit whose `title` is a number, or that is
/// not an object at all, is still listed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Hit {
    pub title: Option<Value>,
    pub rating: Option<Value>,
}

impl Hit {
    pub fn from_document(document: &Value) -> Self {
        let field = |name: &str| document.get(name).filter(|value| !value.is_null()).cloned();
        Self {
            title: field("title"),
            rating: field("rating"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchListing {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub hits: Vec<Hit>,
}

impl SearchListing {
    pub fn label(&self) -> String {
        match &self.filter {
            Some(filter) => format!("'{}' with {filter}", self.query),
            None => format!("'{}'", self.query),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub benign_conflict: usize,
    pub failure: usize,
}

/// Everything a run produced, in step order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub steps: Vec<StepOutcome>,
    pub searches: Vec<SearchListing>,
}

impl PipelineOutcome {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for outcome in &self.steps {
            match outcome.classification {
                Classification::Success => counts.success += 1,
                Classification::BenignConflict => counts.benign_conflict += 1,
                Classification::Failure(_) => counts.failure += 1,
            }
        }
        counts
    }
}

/// Classification plus the human-readable line that goes with it.
struct Verdict {
    classification: Classification,
    message: String,
}

impl Verdict {
    fn success(message: impl Into<String>) -> Self {
        Self {
            classification: Classification::Success,
            message: message.into(),
        }
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self {
            classification: Classification::BenignConflict,
            message: message.into(),
        }
    }

    fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            classification: Classification::Failure(kind),
            message: message.into(),
        }
    }

    fn unexpected(response: &StepResult) -> Self {
        Self::failure(
            FailureKind::UnexpectedStatus(response.status),
            format!(
                "unexpected response: {} - {}",
                response.status,
                response.body_text()
            ),
        )
    }
}

/// One request and whatever came back for it.
struct Exchange {
    method: Method,
    path: String,
    payload: Option<Value>,
    result: Result<StepResult, TransportError>,
}

impl Exchange {
    /// Transport failures short-circuit; responses go to `interpret`.
    fn classify(&self, interpret: impl FnOnce(&StepResult) -> Verdict) -> Verdict {
        match &self.result {
            Ok(response) => interpret(response),
            Err(err) => Verdict::failure(
                FailureKind::Transport(err.to_string()),
                format!("{} {} failed: {err}", self.method, self.path),
            ),
        }
    }

    fn request_summary(&self) -> String {
        match &self.payload {
            Some(payload) => format!("{} {} {}", self.method, self.path, payload),
            None => format!("{} {}", self.method, self.path),
        }
    }

    fn response_summary(&self) -> String {
        match &self.result {
            Ok(response) => format!("{} {}", response.status, response.body_text()),
            Err(err) => format!("transport error: {err}"),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<Value>,
}

/// Drives the seeding steps against one transport and reporter.
pub struct Pipeline<'a, T: Transport, R: Reporter> {
    config: &'a RunConfig,
    transport: &'a T,
    reporter: &'a mut R,
    outcome: PipelineOutcome,
}

impl<'a, T: Transport, R: Reporter> Pipeline<'a, T, R> {
    pub fn new(config: &'a RunConfig, transport: &'a T, reporter: &'a mut R) -> Self {
        Self {
            config,
            transport,
            reporter,
            outcome: PipelineOutcome::default(),
        }
    }

    pub fn run(mut self) -> PipelineOutcome {
        tracing::info!(
            host = self.config.host.as_str(),
            index = self.config.index.as_str(),
            "seeding started"
        );
        if self.config.check_health {
            self.check_health();
        }
        if self.config.fresh {
            self.drop_index();
        }
        self.create_index();
        self.configure_searchable_attributes();
        self.configure_filterable_attributes();
        self.ingest_documents();
        self.configure_synonyms();
        self.verification_search();

        let counts = self.outcome.counts();
        tracing::info!(
            success = counts.success,
            benign_conflict = counts.benign_conflict,
            failure = counts.failure,
            "seeding finished"
        );
        self.reporter.finish(&self.outcome);
        self.outcome
    }

    fn index_path(&self, suffix: &str) -> String {
        format!("/indexes/{}{suffix}", self.config.index)
    }

    fn send(
        &self,
        step: StepName,
        method: Method,
        path: String,
        payload: Option<Value>,
    ) -> Exchange {
        let start = Instant::now();
        let result = self
            .transport
            .send(method, &path, &self.config.credential, payload.as_ref());
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(response) => tracing::debug!(
                step = step.as_str(),
                method = method.as_str(),
                path = path.as_str(),
                status = response.status,
                elapsed_ms,
                "step response"
            ),
            Err(err) => tracing::warn!(
                step = step.as_str(),
                method = method.as_str(),
                path = path.as_str(),
                elapsed_ms,
                error = %err,
                "step transport failure"
            ),
        }
        Exchange {
            method,
            path,
            payload,
            result,
        }
    }

    fn emit(&mut self, step: StepName, exchange: &Exchange, verdict: &Verdict) {
        let event = StepEvent {
            step,
            request: exchange.request_summary(),
            response: exchange.response_summary(),
            classification: &verdict.classification,
            message: &verdict.message,
        };
        self.reporter.step(&event);
    }

    fn record(&mut self, step: StepName, verdict: Verdict) {
        if let Classification::Failure(kind) = &verdict.classification {
            tracing::warn!(step = step.as_str(), reason = %kind, "step failed");
        }
        self.outcome.steps.push(StepOutcome {
            step,
            classification: verdict.classification,
            message: verdict.message,
        });
    }

    /// Emit one event for one request and record it as the step's outcome.
    fn settle(&mut self, step: StepName, exchange: &Exchange, verdict: Verdict) {
        self.emit(step, exchange, &verdict);
        self.record(step, verdict);
    }

    fn check_health(&mut self) {
        let step = StepName::HealthCheck;
        let exchange = self.send(step, Method::Get, "/health".to_string(), None);
        let verdict = exchange.classify(|response| match response.status {
            200 => Verdict::success("search engine is available"),
            _ => Verdict::unexpected(response),
        });
        self.settle(step, &exchange, verdict);
    }

    fn drop_index(&mut self) {
        let step = StepName::DropIndex;
        let exchange = self.send(step, Method::Delete, self.index_path(""), None);
        let verdict = exchange.classify(|response| match response.status {
            202 => Verdict::success(format!(
                "index deletion enqueued{}",
                task_suffix(response)
            )),
            404 => Verdict::conflict("index did not exist"),
            _ => Verdict::unexpected(response),
        });
        self.settle(step, &exchange, verdict);
    }

    fn create_index(&mut self) {
        let step = StepName::CreateIndex;
        let payload = json!({ "uid": self.config.index, "primaryKey": PRIMARY_KEY });
        let exchange = self.send(step, Method::Post, "/indexes".to_string(), Some(payload));
        let verdict = exchange.classify(|response| match response.status {
            201 => Verdict::success("index created"),
            409 => Verdict::conflict("index already exists"),
            400 => Verdict::failure(
                FailureKind::Rejected(400),
                format!("index creation failed: {}", response.body_text()),
            ),
            _ => Verdict::unexpected(response),
        });
        self.settle(step, &exchange, verdict);
    }

    fn configure_searchable_attributes(&mut self) {
        self.put_setting(
            StepName::SearchableAttributes,
            "searchable-attributes",
            json!(dataset::SEARCHABLE_ATTRIBUTES),
        );
    }

    fn configure_filterable_attributes(&mut self) {
        self.put_setting(
            StepName::FilterableAttributes,
            "filterable-attributes",
            json!(dataset::FILTERABLE_ATTRIBUTES),
        );
    }

    /// Settings are applied asynchronously by the engine, so the status is
    /// recorded but not interpreted.
    fn put_setting(&mut self, step: StepName, setting: &str, payload: Value) {
        let path = self.index_path(&format!("/settings/{setting}"));
        let exchange = self.send(step, Method::Put, path, Some(payload));
        let verdict = exchange.classify(|response| {
            Verdict::success(format!("{setting} sent (status {})", response.status))
        });
        self.settle(step, &exchange, verdict);
    }

    fn ingest_documents(&mut self) {
        let step = StepName::IngestDocuments;
        let documents = dataset::movies();
        let count = documents.len();
        let payload = json!(documents);
        let exchange = self.send(step, Method::Post, self.index_path("/documents"), Some(payload));
        let verdict = exchange.classify(|response| match response.status {
            202 => Verdict::success(format!(
                "{count} documents enqueued{}",
                task_suffix(response)
            )),
            _ => Verdict::failure(
                FailureKind::UnexpectedStatus(response.status),
                format!("failed to add documents: {}", response.body_text()),
            ),
        });
        self.settle(step, &exchange, verdict);
    }

    fn configure_synonyms(&mut self) {
        let step = StepName::Synonyms;
        let payload = json!(dataset::synonyms());
        let path = self.index_path("/settings/synonyms");
        let exchange = self.send(step, Method::Put, path, Some(payload));
        let verdict = exchange.classify(|response| match response.status {
            202 => Verdict::success(format!("synonyms configured{}", task_suffix(response))),
            _ => Verdict::failure(
                FailureKind::UnexpectedStatus(response.status),
                format!("failed to configure synonyms: {}", response.body_text()),
            ),
        });
        self.settle(step, &exchange, verdict);
    }

    /// Both queries always run; the step succeeds only if both do.
    fn verification_search(&mut self) {
        let step = StepName::VerificationSearch;
        let plain = self.search(VERIFICATION_QUERY, None);
        let filtered = self.search(VERIFICATION_QUERY, Some(VERIFICATION_FILTER));
        let message = format!("{}; {}", plain.message, filtered.message);
        let verdict = match (plain.classification, filtered.classification) {
            (Classification::Failure(kind), _) | (_, Classification::Failure(kind)) => {
                Verdict::failure(kind, message)
            }
            _ => Verdict::success(message),
        };
        self.record(step, verdict);
    }

    fn search(&mut self, query: &str, filter: Option<&str>) -> Verdict {
        let step = StepName::VerificationSearch;
        let payload = match filter {
            Some(filter) => json!({ "q": query, "filter": filter }),
            None => json!({ "q": query }),
        };
        let exchange = self.send(step, Method::Post, self.index_path("/search"), Some(payload));
        let mut listing = None;
        let verdict = exchange.classify(|response| match response.status {
            200 => match serde_json::from_slice::<SearchResponse>(&response.body) {
                Ok(parsed) => {
                    let found = SearchListing {
                        query: query.to_string(),
                        filter: filter.map(str::to_string),
                        hits: parsed.hits.iter().map(Hit::from_document).collect(),
                    };
                    let message = format!("{} returned {} hits", found.label(), found.hits.len());
                    listing = Some(found);
                    Verdict::success(message)
                }
                Err(err) => Verdict::failure(
                    FailureKind::MalformedBody(err.to_string()),
                    format!("search response had no usable hits: {err}"),
                ),
            },
            _ => Verdict::failure(
                FailureKind::UnexpectedStatus(response.status),
                format!("search failed: {}", response.body_text()),
            ),
        });
        self.emit(step, &exchange, &verdict);
        if let Some(listing) = listing {
            self.reporter.hits(&listing);
            self.outcome.searches.push(listing);
        }
        verdict
    }
}

fn task_suffix(response: &StepResult) -> String {
    let task = response
        .parsed
        .as_ref()
        .and_then(|value| value.get("taskUid"))
        .and_then(Value::as_u64);
    match task {
        Some(uid) => format!(" (task {uid})"),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
