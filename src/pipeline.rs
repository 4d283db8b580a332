// src/pipeline.rs

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::fetch::Fetcher;
use crate::store::{
    write_with_fallback, Destination, ObjectSink, S3PutSink, S3StreamSink, WriteOutcome,
};
use crate::table::{apply_schema, parse_workbook};
use tracing::{error, info, Span};

/// Where a load run is. Runs move strictly forward:
/// `Start → Fetched → Parsed → WritePrimaryAttempted → [WriteFallbackAttempted →] Done | Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    Fetched,
    Parsed,
    WritePrimaryAttempted,
    WriteFallbackAttempted,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Start => "start",
            Stage::Fetched => "fetched",
            Stage::Parsed => "parsed",
            Stage::WritePrimaryAttempted => "write_primary_attempted",
            Stage::WriteFallbackAttempted => "write_fallback_attempted",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

/// Summary of a successful run.
#[derive(Debug)]
pub struct LoadReport {
    pub destination: Destination,
    pub rows: usize,
    pub columns: usize,
    /// Length of the CSV body handed to the sinks.
    pub bytes: usize,
    /// `Written` or `FallbackWritten`; failures surface as `LoadError::Write`.
    pub outcome: WriteOutcome,
}

/// Fetch → parse → (schema) → write, one run per call.
pub struct Loader {
    config: LoaderConfig,
    fetcher: Fetcher,
    primary: Box<dyn ObjectSink>,
    fallback: Box<dyn ObjectSink>,
    span: Span,
}

impl Loader {
    /// Build a loader with the S3 sinks: the primary from the storage
    /// settings, the fallback from the default credential chain.
    pub async fn from_config(config: LoaderConfig, span: Span) -> Result<Self, LoadError> {
        config.validate()?;
        let fetcher = Fetcher::new(config.retry.clone(), span.clone())?;
        let primary = S3PutSink::from_config(&config.storage).await;
        let fallback = S3StreamSink::from_env(config.storage.part_size, span.clone()).await;
        Ok(Self::new(
            config,
            fetcher,
            Box::new(primary),
            Box::new(fallback),
            span,
        ))
    }

    pub fn new(
        config: LoaderConfig,
        fetcher: Fetcher,
        primary: Box<dyn ObjectSink>,
        fallback: Box<dyn ObjectSink>,
        span: Span,
    ) -> Self {
        Self {
            config,
            fetcher,
            primary,
            fallback,
            span,
        }
    }

    /// Load the dataset into `{bucket}/{prefix}{file_name}`.
    pub async fn run(&self, bucket: &str, prefix: &str) -> Result<LoadReport, LoadError> {
        let destination = Destination::from_prefix(bucket, prefix, &self.config.file_name);
        let url = self.config.dataset_url()?;

        info!(parent: &self.span, stage = Stage::Start.as_str(), %url, "fetching data");
        let body = self.fetcher.fetch(&url).await?;
        info!(
            parent: &self.span,
            stage = Stage::Fetched.as_str(),
            bytes = body.len(),
            "extracting CSV"
        );

        let mut table = parse_workbook(&body)?;
        drop(body);
        if let Some(schema) = &self.config.schema {
            table = apply_schema(table, schema)?;
        }
        let (rows, columns) = (table.num_rows(), table.num_columns());
        info!(parent: &self.span, stage = Stage::Parsed.as_str(), rows, columns, "parsed");

        info!(parent: &self.span, destination = %destination, "writing CSV");
        let (bytes, outcome) = write_with_fallback(
            self.primary.as_ref(),
            self.fallback.as_ref(),
            &table,
            &destination,
            &self.span,
        )
        .await;

        match outcome {
            WriteOutcome::Failed(err) => {
                error!(
                    parent: &self.span,
                    stage = Stage::Failed.as_str(),
                    destination = %destination,
                    "load failed"
                );
                Err(err.into())
            }
            outcome => {
                info!(
                    parent: &self.span,
                    stage = Stage::Done.as_str(),
                    destination = %destination,
                    fallback = outcome.used_fallback(),
                    bytes,
                    "load complete"
                );
                Ok(LoadReport {
                    destination,
                    rows,
                    columns,
                    bytes,
                    outcome,
                })
            }
        }
    }
}
