//! Bucket and object tagging operations.

use std::path::Path;

use aws_sdk_s3::operation::create_multipart_upload::CreateMultipartUploadOutput;
use aws_sdk_s3::operation::delete_bucket_tagging::DeleteBucketTaggingOutput;
use aws_sdk_s3::operation::delete_object_tagging::DeleteObjectTaggingOutput;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::operation::put_bucket_tagging::PutBucketTaggingOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::operation::put_object_tagging::PutObjectTaggingOutput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Tag, Tagging};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use s3qa_core::{Error, Result};
use tracing::{debug, info};

use crate::files::create_file;
use crate::sdk::{client_error, S3Lib};

/// A tag as a key/value pair.
pub type TagPair = (String, String);

/// Size of the file created by [`S3Lib::put_object_with_tagging`] when the
/// source path is missing.
const TAGGED_FILE_SIZE_MB: u64 = 1;

/// `count` tags named `{key}{i}` with values `{value}{i}`.
#[must_use]
pub fn numbered_tags(key: &str, value: &str, count: usize) -> Vec<TagPair> {
    (0..count).map(|i| (format!("{key}{i}"), format!("{value}{i}"))).collect()
}

/// Two tags sharing `key` with values `{value}0` and `{value}1`.
#[must_use]
pub fn duplicate_key_tags(key: &str, value: &str) -> Vec<TagPair> {
    (0..2).map(|i| (key.to_string(), format!("{value}{i}"))).collect()
}

/// Two tags `{key}0` and `{key}1` sharing `value`.
#[must_use]
pub fn duplicate_value_tags(key: &str, value: &str) -> Vec<TagPair> {
    (0..2).map(|i| (format!("{key}{i}"), value.to_string())).collect()
}

/// A single tag whose key and value carry the base64 encoding of `?`.
#[must_use]
pub fn invalid_char_tag(key: &str, value: &str) -> Vec<TagPair> {
    let encoded = STANDARD.encode(b"?");
    vec![(format!("{key}{encoded}"), format!("{value}{encoded}"))]
}

/// Tag pairs of a tag set, in order.
#[must_use]
pub fn tag_pairs(tags: &[Tag]) -> Vec<TagPair> {
    tags.iter().map(|t| (t.key().to_string(), t.value().to_string())).collect()
}

fn tagging(operation: &'static str, pairs: &[TagPair]) -> Result<Tagging> {
    let tags = pairs
        .iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::client(operation, e.to_string()))?;
    Tagging::builder()
        .set_tag_set(Some(tags))
        .build()
        .map_err(|e| Error::client(operation, e.to_string()))
}

impl S3Lib {
    /// Tag a bucket with [`numbered_tags`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the tag set.
    pub async fn set_bucket_tag(
        &self,
        bucket: &str,
        key: &str,
        value: &str,
        tag_count: usize,
    ) -> Result<PutBucketTaggingOutput> {
        info!(bucket, tag_count, "Set bucket tagging");
        self.put_bucket_tag_set("set_bucket_tag", bucket, &numbered_tags(key, value, tag_count))
            .await
    }

    /// Tag a bucket with two tags sharing one key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the tag set.
    pub async fn set_bucket_tag_duplicate_keys(
        &self,
        bucket: &str,
        key: &str,
        value: &str,
    ) -> Result<PutBucketTaggingOutput> {
        info!(bucket, "Set bucket tag with duplicate key");
        self.put_bucket_tag_set("set_bucket_tag_duplicate_keys", bucket, &duplicate_key_tags(key, value))
            .await
    }

    /// Tag a bucket with [`invalid_char_tag`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the tag set.
    pub async fn set_bucket_tag_invalid_char(
        &self,
        bucket: &str,
        key: &str,
        value: &str,
    ) -> Result<PutBucketTaggingOutput> {
        info!(bucket, "Set bucket tag with invalid special chars in key");
        self.put_bucket_tag_set("set_bucket_tag_invalid_char", bucket, &invalid_char_tag(key, value))
            .await
    }

    async fn put_bucket_tag_set(
        &self,
        operation: &'static str,
        bucket: &str,
        pairs: &[TagPair],
    ) -> Result<PutBucketTaggingOutput> {
        debug!(?pairs, "Put bucket tagging");
        let response = self
            .client()
            .put_bucket_tagging()
            .bucket(bucket)
            .tagging(tagging(operation, pairs)?)
            .send()
            .await
            .map_err(|e| client_error(operation, e))?;
        debug!(?response, "put_bucket_tagging response");
        Ok(response)
    }

    /// The tag set of a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the bucket is missing or has no tags.
    pub async fn get_bucket_tags(&self, bucket: &str) -> Result<Vec<Tag>> {
        info!(bucket, "Getting bucket tagging");
        let response = self
            .client()
            .get_bucket_tagging()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| client_error("get_bucket_tags", e))?;
        let tags = response.tag_set().to_vec();
        debug!(tags = ?tag_pairs(&tags), "get_bucket_tagging response");
        Ok(tags)
    }

    /// Remove every tag from a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the request.
    pub async fn delete_bucket_tagging(&self, bucket: &str) -> Result<DeleteBucketTaggingOutput> {
        info!(bucket, "Deleting bucket tagging");
        let response = self
            .client()
            .delete_bucket_tagging()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| client_error("delete_bucket_tagging", e))?;
        debug!(?response, "delete_bucket_tagging response");
        Ok(response)
    }

    /// Tag an existing object with [`numbered_tags`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the tag set.
    pub async fn set_object_tag(
        &self,
        bucket: &str,
        key: &str,
        tag_key: &str,
        tag_value: &str,
        tag_count: usize,
    ) -> Result<PutObjectTaggingOutput> {
        info!(bucket, key, tag_count, "Set object tagging");
        self.put_object_tag_set(
            "set_object_tag",
            bucket,
            key,
            &numbered_tags(tag_key, tag_value, tag_count),
        )
        .await
    }

    /// Tag an object with two tags sharing a key, or sharing a value when
    /// `duplicate_key` is false.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the tag set.
    pub async fn set_duplicate_object_tags(
        &self,
        bucket: &str,
        key: &str,
        tag_key: &str,
        tag_value: &str,
        duplicate_key: bool,
    ) -> Result<PutObjectTaggingOutput> {
        info!(bucket, key, duplicate_key, "Set duplicate tag set to an object");
        let pairs = if duplicate_key {
            duplicate_key_tags(tag_key, tag_value)
        } else {
            duplicate_value_tags(tag_key, tag_value)
        };
        self.put_object_tag_set("set_duplicate_object_tags", bucket, key, &pairs).await
    }

    /// Tag an object with [`invalid_char_tag`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the tag set.
    pub async fn set_object_tag_invalid_char(
        &self,
        bucket: &str,
        key: &str,
        tag_key: &str,
        tag_value: &str,
    ) -> Result<PutObjectTaggingOutput> {
        info!(bucket, key, "Set object tag with invalid special char in key");
        self.put_object_tag_set(
            "set_object_tag_invalid_char",
            bucket,
            key,
            &invalid_char_tag(tag_key, tag_value),
        )
        .await
    }

    async fn put_object_tag_set(
        &self,
        operation: &'static str,
        bucket: &str,
        key: &str,
        pairs: &[TagPair],
    ) -> Result<PutObjectTaggingOutput> {
        debug!(?pairs, "Put object tagging");
        let response = self
            .client()
            .put_object_tagging()
            .bucket(bucket)
            .key(key)
            .tagging(tagging(operation, pairs)?)
            .send()
            .await
            .map_err(|e| client_error(operation, e))?;
        debug!(?response, "put_object_tagging response");
        Ok(response)
    }

    /// The tag set of an object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the object is missing.
    pub async fn get_object_tags(&self, bucket: &str, key: &str) -> Result<Vec<Tag>> {
        info!(bucket, key, "Getting object tags");
        let response = self
            .client()
            .get_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| client_error("get_object_tags", e))?;
        let tags = response.tag_set().to_vec();
        debug!(tags = ?tag_pairs(&tags), "get_object_tagging response");
        Ok(tags)
    }

    /// Remove every tag from an object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the request.
    pub async fn delete_object_tagging(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<DeleteObjectTaggingOutput> {
        info!(bucket, key, "Deleting object tagging");
        let response = self
            .client()
            .delete_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| client_error("delete_object_tagging", e))?;
        debug!(?response, "delete_object_tagging response");
        Ok(response)
    }

    /// Initiate a multipart upload carrying `tag` (URL-encoded `k=v` pairs).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the request.
    pub async fn create_multipart_upload_with_tagging(
        &self,
        bucket: &str,
        key: &str,
        tag: &str,
    ) -> Result<CreateMultipartUploadOutput> {
        info!(bucket, key, tag, "Creating multipart upload with tagging");
        let response = self
            .client()
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .tagging(tag)
            .send()
            .await
            .map_err(|e| client_error("create_multipart_upload_with_tagging", e))?;
        info!(upload_id = ?response.upload_id(), "Multipart upload created");
        Ok(response)
    }

    /// Put a file with optional tagging (`k=v` pairs) and one optional
    /// metadata entry. A 1 MiB file is created when `path` does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the file cannot be read or the service
    /// rejects the request.
    pub async fn put_object_with_tagging(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        tag: Option<&str>,
        metadata: Option<(&str, &str)>,
    ) -> Result<PutObjectOutput> {
        info!(bucket, key, ?tag, "Putting object with tagging");
        if !path.exists() {
            create_file(path, TAGGED_FILE_SIZE_MB).await?;
        }
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| Error::client("put_object_with_tagging", e.to_string()))?;

        let mut request = self.client().put_object().bucket(bucket).key(key).body(body);
        if let Some(tag) = tag {
            request = request.tagging(tag);
        }
        if let Some((meta_key, meta_value)) = metadata {
            request = request.metadata(meta_key, meta_value);
        }
        let response =
            request.send().await.map_err(|e| client_error("put_object_with_tagging", e))?;
        debug!(?response, "put_object response");
        Ok(response)
    }

    /// Fetch an object that was stored with tagging.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the service rejects the request.
    pub async fn get_object_with_tagging(&self, bucket: &str, key: &str) -> Result<GetObjectOutput> {
        info!(bucket, key, "Getting object with tagging");
        let response = self
            .client()
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| client_error("get_object_with_tagging", e))?;
        debug!(tag_count = ?response.tag_count(), "get_object response");
        Ok(response)
    }
}
