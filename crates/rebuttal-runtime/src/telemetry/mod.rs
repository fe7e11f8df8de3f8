//! Span recording and export.
//!
//! [`Tracer::in_span`] wraps any fallible future in a `tracing` span and
//! records a [`SpanRecord`] when the span closes, whatever the exit path.
//! Records are buffered in-process and shipped by [`Tracer::flush`].

mod export;

pub use export::{ExportBatch, HttpSpanExporter, Resource};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::config::Settings;

/// Service name attached to every export.
pub const SERVICE_NAME: &str = "rebuttal";

/// Key/value attributes attached to a span.
pub type SpanAttributes = BTreeMap<String, String>;

/// Build span attributes from string pairs.
pub fn attributes<const N: usize>(pairs: [(&str, &str); N]) -> SpanAttributes {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// How a span ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
}

/// A closed span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanRecord {
    pub name: String,
    pub attributes: SpanAttributes,
    pub start: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: SpanStatus,
}

type SpanBuffer = Arc<Mutex<Vec<SpanRecord>>>;

/// Records a span into the buffer when dropped.
///
/// Status stays `Error` unless the wrapped operation returned `Ok`, so a
/// panic or a dropped future is recorded as a failure.
struct SpanGuard {
    buffer: SpanBuffer,
    name: &'static str,
    attributes: SpanAttributes,
    start: DateTime<Utc>,
    started: Instant,
    status: SpanStatus,
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        let record = SpanRecord {
            name: self.name.to_string(),
            attributes: std::mem::take(&mut self.attributes),
            start: self.start,
            duration_ms: self.started.elapsed().as_millis() as u64,
            status: self.status,
        };
        self.buffer.lock().push(record);
    }
}

/// Span wrapper and buffer.
#[derive(Debug, Clone)]
pub struct Tracer {
    buffer: SpanBuffer,
    exporter: Option<HttpSpanExporter>,
    environment: String,
}

impl Tracer {
    /// A tracer that only logs its spans.
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            exporter: None,
            environment: environment.into(),
        }
    }

    /// Build from settings; export is enabled when both a token and an
    /// endpoint are configured.
    pub fn from_settings(settings: &Settings) -> Self {
        let tracer = Self::new(settings.environment.clone());

        match (&settings.observability_token, &settings.observability_endpoint) {
            (Some(token), Some(endpoint)) => {
                match HttpSpanExporter::new(endpoint.clone(), token.clone()) {
                    Ok(exporter) => tracer.with_exporter(exporter),
                    Err(e) => {
                        tracing::warn!(error = %e, "Span exporter unavailable, spans will only be logged");
                        tracer
                    }
                }
            }
            _ => tracer,
        }
    }

    /// Attach an exporter.
    pub fn with_exporter(mut self, exporter: HttpSpanExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Whether spans are shipped on flush.
    pub fn is_exporting(&self) -> bool {
        self.exporter.is_some()
    }

    /// Run `op` inside a span named `name`.
    ///
    /// The operation's value or error is returned untouched. A [`SpanRecord`]
    /// is buffered when the span closes.
    pub async fn in_span<T, E, F>(
        &self,
        name: &'static str,
        attributes: SpanAttributes,
        op: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let span = tracing::info_span!("span", otel.name = name, attributes = ?attributes);
        let mut guard = SpanGuard {
            buffer: Arc::clone(&self.buffer),
            name,
            attributes,
            start: Utc::now(),
            started: Instant::now(),
            status: SpanStatus::Error,
        };

        let result = op.instrument(span).await;
        if result.is_ok() {
            guard.status = SpanStatus::Ok;
        }
        result
    }

    /// Snapshot of buffered spans.
    pub fn records(&self) -> Vec<SpanRecord> {
        self.buffer.lock().clone()
    }

    /// Drain the buffer and export it. Never fails.
    pub async fn flush(&self) {
        let spans = std::mem::take(&mut *self.buffer.lock());
        if spans.is_empty() {
            return;
        }

        let Some(exporter) = &self.exporter else {
            for span in &spans {
                tracing::debug!(
                    name = %span.name,
                    status = ?span.status,
                    duration_ms = span.duration_ms,
                    attributes = ?span.attributes,
                    "Span closed"
                );
            }
            return;
        };

        let batch = ExportBatch::new(SERVICE_NAME, &self.environment, &spans);
        match exporter.export(&batch).await {
            Ok(()) => tracing::debug!(count = spans.len(), "Exported spans"),
            Err(e) => tracing::warn!(error = %e, count = spans.len(), "Span export failed"),
        }
    }
}
