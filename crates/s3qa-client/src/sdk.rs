// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! S3 SDK wrapper.
//!
//! Every method issues one storage operation, logs the response and turns any
//! failure into [`Error::Client`] so suites can assert on the service message.

use std::fmt::Debug;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{Region, ResponseChecksumValidation};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::delete_bucket::DeleteBucketOutput;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::operation::head_bucket::HeadBucketOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use s3qa_core::{Error, PasswordManager, Result, S3Config};
use tracing::{debug, error, info};

use crate::files::create_file;

/// Objects deleted per `DeleteObjects` request.
const DELETE_BATCH: usize = 1000;

/// Files larger than this are uploaded in parts by [`S3Lib::object_upload`].
pub const MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Part size used by [`S3Lib::object_upload`].
pub const PART_SIZE: u64 = 8 * 1024 * 1024;

/// Credential provider name reported to the SDK.
const PROVIDER_NAME: &str = "s3qa";

/// Native SDK client used by the suites.
#[derive(Debug, Clone)]
pub struct S3Lib {
    client: Client,
}

impl S3Lib {
    /// Build a client from suite settings.
    ///
    /// Encrypted credentials are revealed through `passwords`.
    ///
    /// # Errors
    ///
    /// Returns an error if an encrypted credential cannot be decrypted.
    pub fn new(config: &S3Config, passwords: &PasswordManager) -> Result<Self> {
        let access_key = passwords.reveal(&config.access_key)?;
        let secret_key = passwords.reveal(&config.secret_key)?;
        let session_token =
            config.session_token.as_deref().map(|token| passwords.reveal(token)).transpose()?;

        debug!(
            endpoint = %config.endpoint,
            region = %config.region,
            path_style = config.force_path_style,
            max_attempts = config.max_attempts,
            "Creating S3 client"
        );

        let credentials =
            Credentials::new(access_key, secret_key, session_token, None, PROVIDER_NAME);
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style)
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts.max(1)))
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        Ok(Self::from_client(Client::from_conf(sdk_config)))
    }

    /// Wrap an existing SDK client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Create a bucket and return its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the request.
    pub async fn create_bucket(&self, bucket: &str) -> Result<String> {
        info!(bucket, "Creating bucket");
        let response = self
            .client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| client_error("create_bucket", e))?;
        debug!(?response, "create_bucket response");
        Ok(bucket.to_string())
    }

    /// Names of every bucket owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the request.
    pub async fn bucket_list(&self) -> Result<Vec<String>> {
        let response =
            self.client.list_buckets().send().await.map_err(|e| client_error("bucket_list", e))?;
        debug!(?response, "list_buckets response");
        Ok(response.buckets().iter().filter_map(|b| b.name().map(str::to_string)).collect())
    }

    /// Check that a bucket exists and is accessible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the bucket is missing or inaccessible.
    pub async fn head_bucket(&self, bucket: &str) -> Result<HeadBucketOutput> {
        let response = self
            .client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| client_error("head_bucket", e))?;
        debug!(?response, "head_bucket response");
        Ok(response)
    }

    /// Delete a bucket. With `force` every object is deleted first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if listing, emptying or deleting fails.
    pub async fn delete_bucket(&self, bucket: &str, force: bool) -> Result<DeleteBucketOutput> {
        info!(bucket, force, "Deleting bucket");
        if force {
            self.empty_bucket(bucket).await?;
        }
        let response = self
            .client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| client_error("delete_bucket", e))?;
        debug!(?response, "delete_bucket response");
        Ok(response)
    }

    /// Force-delete each of `buckets`.
    ///
    /// # Errors
    ///
    /// Returns the first failure; later buckets are not attempted.
    pub async fn delete_multiple_buckets(&self, buckets: &[String]) -> Result<()> {
        for bucket in buckets {
            self.delete_bucket(bucket, true).await?;
        }
        info!(count = buckets.len(), "Buckets deleted");
        Ok(())
    }

    /// Force-delete every bucket whose name starts with `prefix` and return
    /// the deleted names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if listing or deleting fails.
    pub async fn delete_buckets_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let buckets: Vec<String> =
            self.bucket_list().await?.into_iter().filter(|b| b.starts_with(prefix)).collect();
        if !buckets.is_empty() {
            self.delete_multiple_buckets(&buckets).await?;
        }
        Ok(buckets)
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<()> {
        let keys = self.object_list(bucket).await?;
        for chunk in keys.chunks(DELETE_BATCH) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::client("delete_bucket", e.to_string()))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| Error::client("delete_bucket", e.to_string()))?;
            self.client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| client_error("delete_bucket", e))?;
        }
        debug!(bucket, count = keys.len(), "Bucket emptied");
        Ok(())
    }

    /// Upload a local file in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the file cannot be read or the upload
    /// fails.
    pub async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<PutObjectOutput> {
        info!(bucket, key, path = %path.display(), "Putting object");
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| Error::client("put_object", e.to_string()))?;
        let response = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| client_error("put_object", e))?;
        debug!(?response, "put_object response");
        Ok(response)
    }

    /// Upload a local file, in parts when it exceeds [`MULTIPART_THRESHOLD`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the file cannot be read or any part of
    /// the upload fails. A failed multipart upload is aborted.
    pub async fn object_upload(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::client("object_upload", e.to_string()))?
            .len();
        if size <= MULTIPART_THRESHOLD {
            self.put_object(bucket, key, path).await?;
            return Ok(());
        }

        info!(bucket, key, size, "Uploading object in parts");
        let upload = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| client_error("object_upload", e))?;
        let upload_id = upload
            .upload_id()
            .ok_or_else(|| Error::client("object_upload", "missing upload id"))?
            .to_string();

        match self.upload_parts(bucket, key, &upload_id, path, size).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder().set_parts(Some(parts)).build(),
                    )
                    .send()
                    .await
                    .map_err(|e| client_error("object_upload", e))?;
                Ok(())
            }
            Err(e) => {
                let abort = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await;
                if let Err(abort_err) = abort {
                    error!(error = %DisplayErrorContext(&abort_err), "Failed to abort upload");
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        path: &Path,
        size: u64,
    ) -> Result<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        let mut offset = 0;
        let mut part_number = 1;
        while offset < size {
            let length = PART_SIZE.min(size - offset);
            let body = ByteStream::read_from()
                .path(path)
                .offset(offset)
                .length(Length::Exact(length))
                .build()
                .await
                .map_err(|e| Error::client("object_upload", e.to_string()))?;
            let response = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(body)
                .send()
                .await
                .map_err(|e| client_error("object_upload", e))?;
            debug!(part_number, length, "Part uploaded");
            parts.push(
                CompletedPart::builder()
                    .set_e_tag(response.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
            offset += length;
            part_number += 1;
        }
        Ok(parts)
    }

    /// Fetch an object. The body is left unread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the request.
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<GetObjectOutput> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| client_error("get_object", e))?;
        debug!(
            bucket,
            key,
            content_length = ?response.content_length(),
            e_tag = ?response.e_tag(),
            "get_object response"
        );
        Ok(response)
    }

    /// Delete an object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the request.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<DeleteObjectOutput> {
        info!(bucket, key, "Deleting object");
        let response = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| client_error("delete_object", e))?;
        debug!(?response, "delete_object response");
        Ok(response)
    }

    /// Keys of every object in `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if any listing page fails.
    pub async fn object_list(&self, bucket: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| client_error("object_list", e))?;
            keys.extend(response.contents().iter().filter_map(|o| o.key().map(str::to_string)));

            match response.next_continuation_token() {
                Some(token) if response.is_truncated() == Some(true) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }
        debug!(bucket, count = keys.len(), "Objects listed");
        Ok(keys)
    }

    /// Create `bucket` and put the file at `path` into it as `key`.
    ///
    /// A file of `size_mb` MiB is created first when `path` does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or either storage
    /// operation fails.
    pub async fn create_bucket_put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        size_mb: u64,
    ) -> Result<PutObjectOutput> {
        if !path.exists() {
            create_file(path, size_mb).await?;
        }
        self.create_bucket(bucket).await?;
        self.put_object(bucket, key, path).await
    }
}

/// Convert an SDK failure into [`Error::Client`].
///
/// The message is `"<Code>: <Message>"` when the service returned an error
/// body, otherwise the full error chain.
pub(crate) fn client_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    let message = match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        _ => DisplayErrorContext(&err).to_string(),
    };
    error!(operation, error = %message, "S3 client operation failed");
    Error::client(operation, message)
}
