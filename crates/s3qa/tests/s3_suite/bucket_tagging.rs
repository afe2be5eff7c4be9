//! Bucket and object tagging tests.

use s3qa_client::tagging::{tag_pairs, TagPair};
use serde::Deserialize;
use serial_test::serial;

use crate::{assert_fails_with, SuiteContext};

const SUITE: &str = "s3/test_bucket_tagging.yaml";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TagCase {
    bucket_name: String,
    key: String,
    value: String,
    tag_count: usize,
    tag_id: usize,
    err_message: String,
    spl_chars_list: Vec<String>,
    bucket_count: usize,
}

impl Default for TagCase {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            key: String::new(),
            value: String::new(),
            tag_count: 1,
            tag_id: 0,
            err_message: String::new(),
            spl_chars_list: Vec::new(),
            bucket_count: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaggedObjectCase {
    bucket_name: String,
    obj_name: String,
    mb_count: u64,
    bkt_key: String,
    bkt_value: String,
    obj_key: String,
    obj_value: String,
    obj_tags: usize,
    err_message: String,
}

#[derive(Debug, Deserialize)]
struct ObjectTaggingCase {
    bucket_name: String,
    obj_name: String,
    mb_count: u64,
    key: String,
    value: String,
    tag_count: usize,
    tag: String,
    metadata_key: String,
    metadata_value: String,
    err_message: String,
}

async fn setup(case: &str) -> (SuiteContext, TagCase) {
    let ctx = SuiteContext::setup(SUITE, "bucket_tag").await;
    let case = ctx.section(case);
    (ctx, case)
}

/// Tags `key{i}=value{i}` ordered by their numeric suffix.
fn sorted_by_suffix(mut tags: Vec<TagPair>, key: &str) -> Vec<TagPair> {
    tags.sort_by_key(|(k, _)| k[key.len()..].parse::<usize>().unwrap_or(usize::MAX));
    tags
}

fn assert_numbered(tags: &[TagPair], key: &str, value: &str, count: usize) {
    assert_eq!(tags.len(), count, "{tags:?}");
    for (num, (tag_key, tag_value)) in tags.iter().enumerate() {
        assert_eq!(*tag_key, format!("{key}{num}"));
        assert_eq!(*tag_value, format!("{value}{num}"));
    }
}

/// Set one tag and check that it comes back with the expected suffix.
async fn set_and_check_single_tag(ctx: &SuiteContext, case: &TagCase) {
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, 1).await.unwrap();
    let tags = tag_pairs(&ctx.s3.get_bucket_tags(&bucket).await.unwrap());
    assert_eq!(tags[0].0, format!("{}{}", case.key, case.tag_id));
    assert_eq!(tags[0].1, format!("{}{}", case.value, case.tag_id));
}

/// Setting a tag on a fresh bucket fails with the configured error.
async fn set_expect_failure(ctx: &SuiteContext, case: &TagCase) {
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    let result = ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, case.tag_count).await;
    assert_fails_with(result, &case.err_message);
}

/// PUT bucket tagging.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_put_bucket_tagging_2432() {
    let (ctx, case) = setup("test_2432").await;
    set_and_check_single_tag(&ctx, &case).await;
    ctx.teardown().await;
}

/// GET bucket tagging returns exactly the tag set.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_get_bucket_tagging_2433() {
    let (ctx, case) = setup("test_2433").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, case.tag_count).await.unwrap();
    let tags = tag_pairs(&ctx.s3.get_bucket_tags(&bucket).await.unwrap());
    assert_eq!(tags, vec![(format!("{}{}", case.key, case.tag_id), format!("{}{}", case.value, case.tag_id))]);

    ctx.teardown().await;
}

/// DELETE bucket tagging leaves no tag set behind.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_delete_bucket_tagging_2434() {
    let (ctx, case) = setup("test_2434").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, 1).await.unwrap();
    let tags = ctx.s3.get_bucket_tags(&bucket).await.unwrap();
    assert_eq!(tags.len(), 1);

    ctx.s3.delete_bucket_tagging(&bucket).await.unwrap();
    assert_fails_with(ctx.s3.get_bucket_tags(&bucket).await, &case.err_message);

    ctx.teardown().await;
}

/// Tag keys up to 128 characters are accepted.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_key_128_chars_2435() {
    let (ctx, case) = setup("test_2435").await;
    assert_eq!(case.key.chars().count() + 1, 128);
    set_and_check_single_tag(&ctx, &case).await;
    ctx.teardown().await;
}

/// Tag keys over 128 characters are rejected.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_key_over_128_chars_2436() {
    let (ctx, case) = setup("test_2436").await;
    set_expect_failure(&ctx, &case).await;
    ctx.teardown().await;
}

/// Tag values up to 256 characters are accepted.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_value_256_chars_2437() {
    let (ctx, case) = setup("test_2437").await;
    assert_eq!(case.value.chars().count() + 1, 256);
    set_and_check_single_tag(&ctx, &case).await;
    ctx.teardown().await;
}

/// Tag values over 256 characters are rejected.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_value_over_256_chars_2438() {
    let (ctx, case) = setup("test_2438").await;
    set_expect_failure(&ctx, &case).await;
    ctx.teardown().await;
}

/// A bucket accepts up to 50 tags.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_bucket_tags_up_to_50_2439() {
    let (ctx, case) = setup("test_2439").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, case.tag_count).await.unwrap();
    let tags = tag_pairs(&ctx.s3.get_bucket_tags(&bucket).await.unwrap());
    assert_numbered(&sorted_by_suffix(tags, &case.key), &case.key, &case.value, case.tag_count);

    ctx.teardown().await;
}

/// More than 50 tags are rejected.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_bucket_tags_over_50_2440() {
    let (ctx, case) = setup("test_2440").await;
    set_expect_failure(&ctx, &case).await;
    ctx.teardown().await;
}

/// Tag keys keep their case.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_key_case_sensitive_2441() {
    let (ctx, case) = setup("test_2441").await;
    set_and_check_single_tag(&ctx, &case).await;
    ctx.teardown().await;
}

/// Tag values keep their case.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_value_case_sensitive_2442() {
    let (ctx, case) = setup("test_2442").await;
    set_and_check_single_tag(&ctx, &case).await;
    ctx.teardown().await;
}

/// Allowed special characters around the key are kept.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_key_special_chars_2443() {
    let (ctx, case) = setup("test_2443").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    for ch in &case.spl_chars_list {
        let tag_key = format!("{ch}{}{ch}", case.key);
        ctx.s3.set_bucket_tag(&bucket, &tag_key, &case.value, 1).await.unwrap();
        let tags = tag_pairs(&ctx.s3.get_bucket_tags(&bucket).await.unwrap());
        assert_eq!(tags[0].0, format!("{tag_key}{}", case.tag_id));
        assert_eq!(tags[0].1, format!("{}{}", case.value, case.tag_id));
    }

    ctx.teardown().await;
}

/// Keys wrapped in disallowed characters are rejected.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_key_invalid_special_chars_2444() {
    let (ctx, case) = setup("test_2444").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    for ch in &case.spl_chars_list {
        let tag_key = format!("{ch}{}{ch}", case.key);
        let result = ctx.s3.set_bucket_tag(&bucket, &tag_key, &case.value, 1).await;
        assert_fails_with(result, &case.err_message);
    }

    ctx.teardown().await;
}

/// Values wrapped in disallowed characters are rejected.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_value_invalid_special_chars_2445() {
    let (ctx, case) = setup("test_2445").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    for ch in &case.spl_chars_list {
        let tag_value = format!("{ch}{}{ch}", case.value);
        let result = ctx.s3.set_bucket_tag(&bucket, &case.key, &tag_value, 1).await;
        assert_fails_with(result, &case.err_message);
    }

    ctx.teardown().await;
}

/// A tag set with a repeated key is rejected.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_duplicate_tag_keys_2446() {
    let (ctx, case) = setup("test_2446").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    let result = ctx.s3.set_bucket_tag_duplicate_keys(&bucket, &case.key, &case.value).await;
    assert_fails_with(result, &case.err_message);

    ctx.teardown().await;
}

/// Setting the same tag set twice replaces it rather than appending.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_set_replaced_2447() {
    let (ctx, case) = setup("test_2447").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    for _ in 0..2 {
        ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, case.tag_count).await.unwrap();
    }
    let tags = tag_pairs(&ctx.s3.get_bucket_tags(&bucket).await.unwrap());
    assert_numbered(&sorted_by_suffix(tags, &case.key), &case.key, &case.value, case.tag_count);

    ctx.teardown().await;
}

/// Base64-looking suffixes on keys and values are plain characters.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_tag_encoded_special_chars_2448() {
    let (ctx, case) = setup("test_2448").await;
    let bucket = ctx.unique(&case.bucket_name);
    ctx.create_bucket(&bucket).await;

    ctx.s3.set_bucket_tag_invalid_char(&bucket, &case.key, &case.value).await.unwrap();
    let tags = tag_pairs(&ctx.s3.get_bucket_tags(&bucket).await.unwrap());
    assert_eq!(tags.len(), 1);
    assert!(tags[0].0.starts_with(&case.key), "{tags:?}");

    ctx.teardown().await;
}

/// Deleting a bucket drops the bucket tags and its objects' tags.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_delete_tagged_bucket_with_tagged_objects_2449() {
    let ctx = SuiteContext::setup(SUITE, "bucket_tag").await;
    let case: TaggedObjectCase = ctx.section("test_2449");
    let bucket = ctx.unique(&case.bucket_name);
    let object = ctx.unique(&case.obj_name);
    let file = ctx.data_path(&object);

    ctx.s3.create_bucket_put_object(&bucket, &object, &file, case.mb_count).await.unwrap();
    ctx.s3.set_bucket_tag(&bucket, &case.bkt_key, &case.bkt_value, 1).await.unwrap();
    ctx.s3.set_object_tag(&bucket, &object, &case.obj_key, &case.obj_value, case.obj_tags).await.unwrap();

    let bucket_tags = tag_pairs(&ctx.s3.get_bucket_tags(&bucket).await.unwrap());
    assert_eq!(bucket_tags, vec![(format!("{}0", case.bkt_key), format!("{}0", case.bkt_value))]);

    let object_tags = tag_pairs(&ctx.s3.get_object_tags(&bucket, &object).await.unwrap());
    assert_numbered(
        &sorted_by_suffix(object_tags, &case.obj_key),
        &case.obj_key,
        &case.obj_value,
        case.obj_tags,
    );

    ctx.s3.delete_bucket(&bucket, true).await.unwrap();
    assert_fails_with(ctx.s3.get_bucket_tags(&bucket).await, &case.err_message);
    assert_fails_with(ctx.s3.get_object_tags(&bucket, &object).await, &case.err_message);

    ctx.teardown().await;
}

/// Several buckets each carrying the maximum tag set.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_buckets_with_max_tags_2450() {
    let (ctx, case) = setup("test_2450").await;

    let buckets: Vec<String> =
        (0..case.bucket_count).map(|i| ctx.unique(&format!("{}{i}-", case.bucket_name))).collect();
    for bucket in &buckets {
        ctx.create_bucket(bucket).await;
    }
    let listed = ctx.s3.bucket_list().await.unwrap();
    for bucket in &buckets {
        assert!(listed.contains(bucket), "{bucket} missing from {listed:?}");
        ctx.s3.set_bucket_tag(bucket, &case.key, &case.value, case.tag_count).await.unwrap();
        let tags = ctx.s3.get_bucket_tags(bucket).await.unwrap();
        assert_eq!(tags.len(), case.tag_count);
    }

    ctx.teardown().await;
}

/// PUT bucket tagging on a missing bucket.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_put_tagging_missing_bucket_2451() {
    let (ctx, case) = setup("test_2451").await;
    let bucket = ctx.unique(&case.bucket_name);

    let result = ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, 1).await;
    assert_fails_with(result, &case.err_message);

    ctx.teardown().await;
}

/// GET bucket tagging on a missing bucket.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_get_tagging_missing_bucket_2452() {
    let (ctx, case) = setup("test_2452").await;
    let bucket = ctx.unique(&case.bucket_name);

    let result = ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, 1).await;
    assert_fails_with(result, &case.err_message);
    assert_fails_with(ctx.s3.get_bucket_tags(&bucket).await, &case.err_message);

    ctx.teardown().await;
}

/// DELETE bucket tagging on a missing bucket.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_delete_tagging_missing_bucket_2453() {
    let (ctx, case) = setup("test_2453").await;
    let bucket = ctx.unique(&case.bucket_name);

    let result = ctx.s3.set_bucket_tag(&bucket, &case.key, &case.value, 1).await;
    assert_fails_with(result, &case.err_message);
    assert_fails_with(ctx.s3.delete_bucket_tagging(&bucket).await, &case.err_message);

    ctx.teardown().await;
}

async fn setup_object(ctx: &SuiteContext, case: &ObjectTaggingCase) -> (String, String) {
    let bucket = ctx.unique(&case.bucket_name);
    let object = ctx.unique(&case.obj_name);
    let file = ctx.data_path(&object);
    ctx.s3.create_bucket_put_object(&bucket, &object, &file, case.mb_count).await.unwrap();
    (bucket, object)
}

/// PUT, GET and DELETE object tagging.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_object_tagging_lifecycle() {
    let ctx = SuiteContext::setup(SUITE, "bucket_tag").await;
    let case: ObjectTaggingCase = ctx.section("object_tagging");
    let (bucket, object) = setup_object(&ctx, &case).await;

    ctx.s3.set_object_tag(&bucket, &object, &case.key, &case.value, case.tag_count).await.unwrap();
    let tags = tag_pairs(&ctx.s3.get_object_tags(&bucket, &object).await.unwrap());
    assert_numbered(&sorted_by_suffix(tags, &case.key), &case.key, &case.value, case.tag_count);

    ctx.s3.delete_object_tagging(&bucket, &object).await.unwrap();
    let tags = ctx.s3.get_object_tags(&bucket, &object).await.unwrap();
    assert!(tags.is_empty(), "{tags:?}");

    ctx.teardown().await;
}

/// Duplicate keys are rejected on objects; duplicate values are not.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_object_tagging_duplicates() {
    let ctx = SuiteContext::setup(SUITE, "bucket_tag").await;
    let case: ObjectTaggingCase = ctx.section("object_tagging");
    let (bucket, object) = setup_object(&ctx, &case).await;

    let result = ctx.s3.set_duplicate_object_tags(&bucket, &object, &case.key, &case.value, true).await;
    assert_fails_with(result, &case.err_message);

    ctx.s3.set_duplicate_object_tags(&bucket, &object, &case.key, &case.value, false).await.unwrap();
    let tags = tag_pairs(&ctx.s3.get_object_tags(&bucket, &object).await.unwrap());
    assert_eq!(tags.len(), 2);
    assert!(tags.iter().all(|(_, value)| *value == case.value), "{tags:?}");

    ctx.s3.set_object_tag_invalid_char(&bucket, &object, &case.key, &case.value).await.unwrap();
    assert_eq!(ctx.s3.get_object_tags(&bucket, &object).await.unwrap().len(), 1);

    ctx.teardown().await;
}

/// Tags and metadata sent with PUT object are returned by GET object.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_put_object_with_tagging() {
    let ctx = SuiteContext::setup(SUITE, "bucket_tag").await;
    let case: ObjectTaggingCase = ctx.section("object_tagging");
    let bucket = ctx.unique(&case.bucket_name);
    let object = ctx.unique(&case.obj_name);
    ctx.create_bucket(&bucket).await;

    ctx.s3
        .put_object_with_tagging(
            &bucket,
            &object,
            &ctx.data_path(&object),
            Some(case.tag.as_str()),
            Some((case.metadata_key.as_str(), case.metadata_value.as_str())),
        )
        .await
        .unwrap();

    let response = ctx.s3.get_object_with_tagging(&bucket, &object).await.unwrap();
    assert_eq!(response.tag_count(), Some(1));
    let metadata = response.metadata().cloned().unwrap_or_default();
    assert_eq!(metadata.get(&case.metadata_key), Some(&case.metadata_value));

    let tags = tag_pairs(&ctx.s3.get_object_tags(&bucket, &object).await.unwrap());
    let (tag_key, tag_value) = case.tag.split_once('=').unwrap();
    assert_eq!(tags, vec![(tag_key.to_string(), tag_value.to_string())]);

    ctx.teardown().await;
}

/// A multipart upload can be started with tagging.
#[tokio::test]
#[serial(s3)]
#[ignore = "requires a live S3 endpoint"]
async fn test_multipart_upload_with_tagging() {
    let ctx = SuiteContext::setup(SUITE, "bucket_tag").await;
    let case: ObjectTaggingCase = ctx.section("object_tagging");
    let bucket = ctx.unique(&case.bucket_name);
    let object = ctx.unique(&case.obj_name);
    ctx.create_bucket(&bucket).await;

    let response = ctx.s3.create_multipart_upload_with_tagging(&bucket, &object, &case.tag).await.unwrap();
    let upload_id = response.upload_id().unwrap();
    assert!(!upload_id.is_empty());

    ctx.s3
        .client()
        .abort_multipart_upload()
        .bucket(&bucket)
        .key(&object)
        .upload_id(upload_id)
        .send()
        .await
        .unwrap();

    ctx.teardown().await;
}
