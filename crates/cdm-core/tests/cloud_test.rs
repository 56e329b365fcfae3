// Integration tests for archive targets and AWS native accounts.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Map, json};
use url::Url;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cdm_api::Dispatcher;
use cdm_core::{
    AwsNativeAccountRequest, Cdm, ClientConfig, CoreError, Credentials, JobStatus,
    S3ArchiveRequest, S3Encryption,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Cdm) {
    let server = MockServer::start().await;
    let creds = Credentials::new("cluster.test", "admin", SecretString::from("pw".to_owned()));
    let dispatcher = Dispatcher::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        creds.clone(),
    );
    let mut config = ClientConfig::new(creds);
    config.poll_interval = Duration::from_millis(5);
    (server, Cdm::with_dispatcher(dispatcher, config))
}

fn s3_request(name: &str, bucket: &str) -> S3ArchiveRequest {
    S3ArchiveRequest {
        archive_name: name.into(),
        bucket: bucket.into(),
        region: "us-east-1".into(),
        storage_class: "standard".into(),
        access_key: "AKIAEXAMPLE".into(),
        secret_key: SecretString::from("s3-secret".to_owned()),
        encryption: S3Encryption::Kms("kms-key-1".into()),
    }
}

/// How the cluster reports an S3 target: the echoed fields plus its own.
fn s3_store(id: &str, name: &str, bucket: &str) -> serde_json::Value {
    json!({
        "id": id,
        "definition": {
            "objectStoreType": "S3",
            "name": name,
            "accessKey": "AKIAEXAMPLE",
            "bucket": bucket,
            "defaultRegion": "us-east-1",
            "storageClass": "STANDARD",
            "isComputeEnabled": false,
            "isConsolidationEnabled": false,
            "numBuckets": 1,
            "kmsMasterKeyId": "kms-key-1"
        }
    })
}

async fn mount_stores(server: &MockServer, stores: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/api/internal/archive/object_store"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": stores.len(),
            "hasMore": false,
            "data": stores
        })))
        .mount(server)
        .await;
}

// ── Archive targets ─────────────────────────────────────────────────

#[tokio::test]
async fn test_s3_archive_already_configured_never_posts() {
    let (server, cdm) = setup().await;
    mount_stores(&server, vec![s3_store("S3:::1", "Archive-A", "my-bucket")]).await;

    Mock::given(method("POST"))
        .and(path("/api/internal/archive/object_store"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = cdm
        .aws_s3_cloud_out(&s3_request("Archive-A", "My-Bucket"), None)
        .await
        .unwrap();
    assert!(outcome.is_no_change());
}

#[tokio::test]
async fn test_s3_archive_name_taken_by_other_bucket() {
    let (server, cdm) = setup().await;
    mount_stores(&server, vec![s3_store("S3:::1", "Archive-A", "other-bucket")]).await;

    let err = cdm
        .aws_s3_cloud_out(&s3_request("Archive-A", "my-bucket"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict { .. }));
}

#[tokio::test]
async fn test_s3_archive_created_and_connect_job_awaited() {
    let (server, cdm) = setup().await;
    mount_stores(&server, vec![]).await;

    Mock::given(method("POST"))
        .and(path("/api/internal/archive/object_store"))
        .and(body_partial_json(json!({
            "name": "Archive-B",
            "bucket": "my-bucket",
            "storageClass": "STANDARD",
            "secretKey": "s3-secret",
            "kmsMasterKeyId": "kms-key-1"
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"jobInstanceId": "CONNECT_1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/internal/archive/location/job/connect/CONNECT_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCEEDED"})))
        .expect(1)
        .mount(&server)
        .await;

    let report = cdm
        .aws_s3_cloud_out(&s3_request("Archive-B", "MY-BUCKET"), None)
        .await
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(report.status, JobStatus::Succeeded);
}

#[tokio::test]
async fn test_s3_archive_bad_region_fails_before_io() {
    let (server, cdm) = setup().await;

    let mut request = s3_request("Archive-A", "b");
    request.region = "moon-1".into();
    let err = cdm.aws_s3_cloud_out(&request, None).await.unwrap_err();
    assert!(err.is_validation());
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── CloudOn ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_s3_cloud_on_matching_network_is_no_change() {
    let (server, cdm) = setup().await;

    let mut store = s3_store("S3:::1", "Archive-A", "my-bucket");
    store["definition"]["defaultComputeNetworkConfig"] = json!({
        "vNetId": "vpc-1",
        "subnetId": "subnet-1",
        "securityGroupId": "sg-1",
        "resourceGroupId": ""
    });
    mount_stores(&server, vec![store]).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = cdm
        .aws_s3_cloud_on("Archive-A", "vpc-1", "subnet-1", "sg-1", None)
        .await
        .unwrap();
    assert!(outcome.is_no_change());
}

#[tokio::test]
async fn test_s3_cloud_on_patches_network_config() {
    let (server, cdm) = setup().await;
    mount_stores(&server, vec![s3_store("S3:::1", "Archive-A", "my-bucket")]).await;

    Mock::given(method("PATCH"))
        .and(path("/api/internal/archive/object_store/S3:::1"))
        .and(body_json(json!({
            "defaultComputeNetworkConfig": {
                "vNetId": "vpc-1",
                "subnetId": "subnet-1",
                "securityGroupId": "sg-1"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "S3:::1"})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = cdm
        .aws_s3_cloud_on("Archive-A", "vpc-1", "subnet-1", "sg-1", None)
        .await
        .unwrap();
    assert!(outcome.is_applied());
}

#[tokio::test]
async fn test_cloud_on_unknown_archive() {
    let (server, cdm) = setup().await;
    mount_stores(&server, vec![]).await;

    let err = cdm
        .aws_s3_cloud_on("Missing", "vpc-1", "subnet-1", "sg-1", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ── Archive locations ───────────────────────────────────────────────

async fn mount_location(server: &MockServer, name: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path("/api/internal/archive/location"))
        .and(query_param("name", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "hasMore": false,
            "data": [{"id": id, "name": name, "locationType": "S3", "isActive": true}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_remove_archive_location_tolerates_already_paused() {
    let (server, cdm) = setup().await;
    mount_location(&server, "Archive-A", "LOC-1").await;

    Mock::given(method("POST"))
        .and(path("/api/internal/archive/location/LOC-1/owner/pause"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorType": "user_error",
            "message": "Archival location LOC-1 is already paused"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/internal/archive/location/LOC-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = cdm.remove_archive_location("Archive-A", None).await.unwrap();
    assert_eq!(outcome.applied().unwrap(), json!({"statusCode": 204}));
}

#[tokio::test]
async fn test_remove_archive_location_other_pause_error_propagates() {
    let (server, cdm) = setup().await;
    mount_location(&server, "Archive-A", "LOC-1").await;

    Mock::given(method("POST"))
        .and(path("/api/internal/archive/location/LOC-1/owner/pause"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "errorType": "internal",
            "message": "Archival location is busy"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let err = cdm.remove_archive_location("Archive-A", None).await.unwrap_err();
    assert_eq!(err.to_string(), "Archival location is busy");
}

#[tokio::test]
async fn test_remove_missing_archive_location_is_no_change() {
    let (server, cdm) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/internal/archive/location"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 0,
            "hasMore": false,
            "data": []
        })))
        .mount(&server)
        .await;

    let outcome = cdm.remove_archive_location("Archive-A", None).await.unwrap();
    assert!(outcome.is_no_change());
}

#[tokio::test]
async fn test_update_archive_location_skips_matching_settings() {
    let (server, cdm) = setup().await;
    mount_location(&server, "Archive-A", "LOC-1").await;

    Mock::given(method("GET"))
        .and(path("/api/internal/archive/object_store/LOC-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_store("LOC-1", "Archive-A", "b")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = Map::new();
    config.insert("storageClass".into(), json!("STANDARD"));
    config.insert("numBuckets".into(), json!(1.0));
    let outcome = cdm
        .update_cloud_archive_location("Archive-A", &config, None)
        .await
        .unwrap();
    assert!(outcome.is_no_change());
}

#[tokio::test]
async fn test_update_archive_location_patches_changed_settings() {
    let (server, cdm) = setup().await;
    mount_location(&server, "Archive-A", "LOC-1").await;

    Mock::given(method("GET"))
        .and(path("/api/internal/archive/object_store/LOC-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(s3_store("LOC-1", "Archive-A", "b")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/internal/archive/object_store/LOC-1"))
        .and(body_json(json!({"numBuckets": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "LOC-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Map::new();
    config.insert("numBuckets".into(), json!(4));
    let outcome = cdm
        .update_cloud_archive_location("Archive-A", &config, None)
        .await
        .unwrap();
    assert!(outcome.is_applied());
}

// ── AWS native accounts ─────────────────────────────────────────────

async fn mount_accounts(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/cluster/me/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": version})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/internal/aws/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "hasMore": false,
            "data": [{"id": "AWS-1", "name": "prod"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/internal/aws/account/AWS-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "AWS-1",
            "name": "prod",
            "accessKey": "AKIAPROD",
            "regions": ["us-east-1"]
        })))
        .mount(server)
        .await;
}

fn account_request(name: &str, access_key: &str) -> AwsNativeAccountRequest {
    AwsNativeAccountRequest {
        name: name.into(),
        access_key: access_key.into(),
        secret_key: SecretString::from("aws-secret".to_owned()),
        regions: vec!["us-east-1".into()],
        regional_bolt_network_configs: vec![],
    }
}

#[tokio::test]
async fn test_aws_account_with_same_access_key_is_no_change() {
    let (server, cdm) = setup().await;
    mount_accounts(&server, "5.0.1-1280").await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = cdm
        .add_aws_native_account(&account_request("prod-2", "AKIAPROD"), None)
        .await
        .unwrap();
    assert!(outcome.is_no_change());
}

#[tokio::test]
async fn test_aws_account_name_conflict() {
    let (server, cdm) = setup().await;
    mount_accounts(&server, "5.0.1-1280").await;

    let err = cdm
        .add_aws_native_account(&account_request("prod", "AKIANEW"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict { .. }));
}

#[tokio::test]
async fn test_aws_account_requires_cdm_4_2() {
    let (server, cdm) = setup().await;
    mount_accounts(&server, "4.1.0-100").await;

    let err = cdm
        .add_aws_native_account(&account_request("dev", "AKIADEV"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedVersion { .. }));
}

#[tokio::test]
async fn test_aws_account_summary_and_missing_removal() {
    let (server, cdm) = setup().await;
    mount_accounts(&server, "5.0.1-1280").await;

    let account = cdm.aws_account_summary("prod", None).await.unwrap();
    assert_eq!(account.id, "AWS-1");
    assert_eq!(account.access_key, "AKIAPROD");

    let outcome = cdm.remove_aws_account("staging", false, None).await.unwrap();
    assert!(outcome.is_no_change());
}

#[tokio::test]
async fn test_remove_aws_account_waits_for_job() {
    let (server, cdm) = setup().await;
    mount_accounts(&server, "5.0.1-1280").await;

    Mock::given(method("DELETE"))
        .and(path("/api/internal/aws/account/AWS-1"))
        .and(query_param("delete_existing_snapshots", "true"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "DELETE_AWS_1",
            "links": [{"href": format!("{}/api/internal/aws/account/request/DELETE_AWS_1", server.uri()), "rel": "self"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/internal/aws/account/request/DELETE_AWS_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCEEDED"})))
        .mount(&server)
        .await;

    let report = cdm
        .remove_aws_account("prod", true, None)
        .await
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(report.status, JobStatus::Succeeded);
}
