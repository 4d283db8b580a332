// src/store/s3.rs

use super::{Destination, ObjectSink};
use crate::config::StorageConfig;
use crate::error::BoxError;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    config::Builder,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use bytes::Bytes;
use tracing::{debug, warn, Span};

const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Primary path: one `PutObject` with the whole body, through a client
/// built from the configured region and endpoint.
pub struct S3PutSink {
    client: Client,
}

impl S3PutSink {
    pub async fn from_config(storage: &StorageConfig) -> Self {
        let sdk = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let conf = apply_storage(Builder::from(&sdk), storage).build();
        Self::with_client(Client::from_conf(conf))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Region, endpoint and addressing overrides from the storage settings.
fn apply_storage(mut builder: Builder, storage: &StorageConfig) -> Builder {
    if let Some(region) = &storage.region {
        builder = builder.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &storage.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }
    builder.force_path_style(storage.force_path_style)
}

#[async_trait]
impl ObjectSink for S3PutSink {
    fn name(&self) -> &str {
        "s3-put"
    }

    async fn put(&self, dest: &Destination, body: Bytes) -> Result<(), BoxError> {
        self.client
            .put_object()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .content_type(CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await?;
        Ok(())
    }
}

/// Fallback path: a separate client on the default credential chain that
/// streams the body as a multipart upload, aborting it on failure so no
/// partial object is left behind.
pub struct S3StreamSink {
    client: Client,
    part_size: usize,
    span: Span,
}

impl S3StreamSink {
    pub async fn from_env(part_size: usize, span: Span) -> Self {
        let sdk = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::with_client(Client::new(&sdk), part_size, span)
    }

    pub fn with_client(client: Client, part_size: usize, span: Span) -> Self {
        Self {
            client,
            part_size,
            span,
        }
    }

    async fn upload_parts(
        &self,
        dest: &Destination,
        upload_id: &str,
        body: &Bytes,
    ) -> Result<Vec<CompletedPart>, BoxError> {
        let mut completed = Vec::new();
        for (index, chunk) in split_parts(body, self.part_size).enumerate() {
            let part_number = index as i32 + 1;
            debug!(parent: &self.span, part_number, bytes = chunk.len(), "uploading part");
            let resp = self
                .client
                .upload_part()
                .bucket(&dest.bucket)
                .key(&dest.key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await?;
            completed.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(resp.e_tag().map(str::to_string))
                    .build(),
            );
        }
        Ok(completed)
    }

    async fn finish(
        &self,
        dest: &Destination,
        upload_id: &str,
        body: &Bytes,
    ) -> Result<(), BoxError> {
        let parts = self.upload_parts(dest, upload_id, body).await?;
        self.client
            .complete_multipart_upload()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectSink for S3StreamSink {
    fn name(&self) -> &str {
        "s3-multipart"
    }

    async fn put(&self, dest: &Destination, body: Bytes) -> Result<(), BoxError> {
        let create = self
            .client
            .create_multipart_upload()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .content_type(CONTENT_TYPE)
            .send()
            .await?;
        let upload_id = create
            .upload_id()
            .ok_or("multipart upload created without an upload id")?
            .to_string();

        if let Err(e) = self.finish(dest, &upload_id, &body).await {
            if let Err(abort) = self
                .client
                .abort_multipart_upload()
                .bucket(&dest.bucket)
                .key(&dest.key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                warn!(
                    parent: &self.span,
                    destination = %dest,
                    upload_id = %upload_id,
                    error = %abort,
                    "abort failed"
                );
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Consecutive slices of at most `part_size` bytes; an empty body yields one empty part.
fn split_parts(body: &Bytes, part_size: usize) -> impl Iterator<Item = Bytes> + '_ {
    let part_size = part_size.max(1);
    let count = body.len().div_ceil(part_size).max(1);
    (0..count).map(move |i| body.slice(i * part_size..((i + 1) * part_size).min(body.len())))
}
