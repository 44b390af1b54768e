//! Rendering of pipeline progress and search results.
//!
//! The pipeline emits every event unconditionally; the reporter decides
//! what to show. Hit listings are always shown, step events only when
//! verbose, and `--json` swaps all text for a single summary document.
use crate::pipeline::{
    Classification, Hit, OutcomeCounts, PipelineOutcome, SearchListing, StepName, StepOutcome,
};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};

/// One request/response pair as seen by the pipeline.
#[derive(Debug)]
pub struct StepEvent<'a> {
    pub step: StepName,
    pub request: String,
    pub response: String,
    pub classification: &'a Classification,
    pub message: &'a str,
}

pub trait Reporter {
    fn step(&mut self, event: &StepEvent<'_>);
    fn hits(&mut self, listing: &SearchListing);
    fn finish(&mut self, outcome: &PipelineOutcome);
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    counts: OutcomeCounts,
    steps: &'a [StepOutcome],
    searches: &'a [SearchListing],
}

/// Line-oriented reporter for terminals and pipes.
pub struct ConsoleReporter<W: Write> {
    out: W,
    verbose: bool,
    json: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(verbose: bool, json: bool) -> Self {
        Self::new(io::stdout(), verbose, json)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool, json: bool) -> Self {
        Self { out, verbose, json }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(err) = self.out.write_fmt(args).and_then(|()| self.out.write_all(b"\n")) {
            tracing::warn!(error = %err, "failed to write report output");
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn step(&mut self, event: &StepEvent<'_>) {
        if !self.verbose || self.json {
            return;
        }
        self.line(format_args!("[{}] {}", event.step, event.request));
        self.line(format_args!("  -> {}", event.response));
        self.line(format_args!("  = {}: {}", event.classification, event.message));
    }

    fn hits(&mut self, listing: &SearchListing) {
        if self.json {
            return;
        }
        if self.verbose {
            self.line(format_args!(
                "Search {} returned {} results",
                listing.label(),
                listing.hits.len()
            ));
        }
        for hit in &listing.hits {
            self.line(format_args!("{}", HitLine(hit)));
        }
    }

    fn finish(&mut self, outcome: &PipelineOutcome) {
        if self.json {
            let summary = JsonSummary {
                counts: outcome.counts(),
                steps: &outcome.steps,
                searches: &outcome.searches,
            };
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => self.line(format_args!("{json}")),
                Err(err) => tracing::warn!(error = %err, "failed to encode run summary"),
            }
            return;
        }
        if !self.verbose {
            return;
        }
        let counts = outcome.counts();
        self.line(format_args!(
            "Summary: {} succeeded, {} already in place, {} failed",
            counts.success, counts.benign_conflict, counts.failure
        ));
        for step in &outcome.steps {
            self.line(format_args!(
                "  {}: {} - {}",
                step.step, step.classification, step.message
            ));
        }
    }
}

struct HitLine<'a>(&'a Hit);

impl fmt::Display for HitLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = field_text(self.0.title.as_ref()).unwrap_or(Cow::Borrowed("<untitled>"));
        match field_text(self.0.rating.as_ref()) {
            Some(rating) => write!(f, "- {title} ({rating})"),
            None => write!(f, "- {title} (unrated)"),
        }
    }
}

/// Strings print bare; anything else prints as its JSON text.
fn field_text(value: Option<&Value>) -> Option<Cow<'_, str>> {
    match value? {
        Value::String(text) => Some(Cow::Borrowed(text.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}
