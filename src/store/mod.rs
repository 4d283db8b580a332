// src/store/mod.rs

pub mod s3;

pub use s3::{S3PutSink, S3StreamSink};

use crate::error::{BoxError, WriteError};
use crate::pipeline::Stage;
use crate::table::{to_csv_bytes, Table};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use tracing::{error, info, warn, Span};

/// Bucket + key of the output object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub bucket: String,
    pub key: String,
}

impl Destination {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `{prefix}{file_name}` inside `bucket`; the prefix is used verbatim.
    pub fn from_prefix(bucket: &str, prefix: &str, file_name: &str) -> Self {
        Self::new(bucket, format!("{}{}", prefix, file_name))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// A way of writing one object to storage.
#[async_trait]
pub trait ObjectSink: Send + Sync {
    fn name(&self) -> &str;

    async fn put(&self, dest: &Destination, body: Bytes) -> Result<(), BoxError>;
}

/// How a write ended.
#[derive(Debug)]
pub enum WriteOutcome {
    Written,
    FallbackWritten { primary: BoxError },
    Failed(WriteError),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        !matches!(self, WriteOutcome::Failed(_))
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, WriteOutcome::FallbackWritten { .. })
    }
}

/// Serialize `table` once and write it through `primary`, falling back to
/// `fallback` (at most once, with identical bytes) if the primary write fails.
///
/// Returns the CSV length alongside the outcome; it is 0 when serialization fails.
pub async fn write_with_fallback(
    primary: &dyn ObjectSink,
    fallback: &dyn ObjectSink,
    table: &Table,
    dest: &Destination,
    span: &Span,
) -> (usize, WriteOutcome) {
    let body = match to_csv_bytes(table) {
        Ok(body) => Bytes::from(body),
        Err(e) => {
            error!(parent: span, destination = %dest, error = %e, "CSV serialization failed");
            return (0, WriteOutcome::Failed(WriteError::Serialize(e)));
        }
    };
    let len = body.len();
    (len, write_bytes(primary, fallback, body, dest, span).await)
}

async fn write_bytes(
    primary: &dyn ObjectSink,
    fallback: &dyn ObjectSink,
    body: Bytes,
    dest: &Destination,
    span: &Span,
) -> WriteOutcome {
    info!(
        parent: span,
        stage = Stage::WritePrimaryAttempted.as_str(),
        sink = primary.name(),
        destination = %dest,
        bytes = body.len(),
        "writing CSV"
    );
    let primary_err = match primary.put(dest, body.clone()).await {
        Ok(()) => {
            info!(parent: span, destination = %dest, sink = primary.name(), "written");
            return WriteOutcome::Written;
        }
        Err(e) => e,
    };

    warn!(
        parent: span,
        stage = Stage::WriteFallbackAttempted.as_str(),
        sink = fallback.name(),
        destination = %dest,
        error = ?primary_err,
        "primary write failed, trying fallback"
    );
    match fallback.put(dest, body).await {
        Ok(()) => {
            info!(parent: span, destination = %dest, sink = fallback.name(), "written via fallback");
            WriteOutcome::FallbackWritten {
                primary: primary_err,
            }
        }
        Err(fallback_err) => {
            error!(
                parent: span,
                destination = %dest,
                error = ?fallback_err,
                "fallback write failed"
            );
            WriteOutcome::Failed(WriteError::Exhausted {
                destination: dest.to_string(),
                primary: primary_err,
                fallback: fallback_err,
            })
        }
    }
}
