// Integration tests for `Dispatcher` using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cdm_api::{ApiVersion, Credentials, DispatchResult, Dispatcher, Error, Method};

const TIMEOUT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

fn dispatcher_for(server: &MockServer, credentials: Credentials) -> Dispatcher {
    let base = Url::parse(&server.uri()).unwrap();
    Dispatcher::with_client(reqwest::Client::new(), base, credentials)
}

async fn setup() -> (MockServer, Dispatcher) {
    let server = MockServer::start().await;
    let creds = Credentials::new("cluster.test", "admin", SecretString::from("pw".to_owned()));
    let dispatcher = dispatcher_for(&server, creds);
    (server, dispatcher)
}

// ── Request shape ───────────────────────────────────────────────────

#[tokio::test]
async fn test_get_sends_basic_auth_and_json_headers() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/cluster/me"))
        .and(header("authorization", "Basic YWRtaW46cHc="))
        .and(header("accept", "application/json"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "5.0.1-1280"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher
        .get(ApiVersion::V1, "/cluster/me", TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result.into_value(), json!({"version": "5.0.1-1280"}));
}

#[tokio::test]
async fn test_anonymous_credentials_send_no_authorization() {
    let server = MockServer::start().await;
    let dispatcher = dispatcher_for(&server, Credentials::anonymous("cluster.test"));

    Mock::given(method("GET"))
        .and(path("/api/internal/cluster/me/bootstrap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
        .mount(&server)
        .await;

    dispatcher
        .get(ApiVersion::Internal, "/cluster/me/bootstrap", TIMEOUT)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_get_url_is_percent_encoded() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sla_domain"))
        .and(query_param("name", "Gold SLA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0, "data": []})))
        .expect(1)
        .mount(&server)
        .await;

    dispatcher
        .get(ApiVersion::V1, "/sla_domain?name=Gold SLA", TIMEOUT)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_post_without_body_sends_empty_object() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/vmware/vcenter/vc1/refresh"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"id": "job-1"})))
        .expect(1)
        .mount(&server)
        .await;

    dispatcher
        .execute(Method::Post, ApiVersion::V1, "/vmware/vcenter/vc1/refresh", None, TIMEOUT)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_patch_serializes_body() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/cluster/me"))
        .and(body_json(json!({"timezone": {"timezone": "UTC"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timezone": {"timezone": "UTC"}})))
        .expect(1)
        .mount(&server)
        .await;

    dispatcher
        .patch(ApiVersion::V1, "/cluster/me", &json!({"timezone": {"timezone": "UTC"}}), TIMEOUT)
        .await
        .unwrap();
}

// ── Response classification ─────────────────────────────────────────

#[tokio::test]
async fn test_delete_no_content_synthesizes_status() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/internal/aws/account/a1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result = dispatcher
        .delete(ApiVersion::Internal, "/aws/account/a1", TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result, DispatchResult::Status(204));
    assert_eq!(result.into_value(), json!({"statusCode": 204}));
}

#[tokio::test]
async fn test_error_type_is_reported_verbatim() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"errorType": "user_error", "message": "Invalid SLA"})),
        )
        .mount(&server)
        .await;

    let err = dispatcher
        .get(ApiVersion::V1, "/sla_domain", TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.api_message(), Some("Invalid SLA"));
    assert_eq!(err.to_string(), "Invalid SLA");
}

#[tokio::test]
async fn test_array_body_is_success_even_on_error_status() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!([{"id": "n1"}])))
        .mount(&server)
        .await;

    let result = dispatcher
        .get(ApiVersion::Internal, "/cluster/me/node", TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result.as_array().map(<[_]>::len), Some(1));
}

#[tokio::test]
async fn test_unparseable_body_reports_status_line() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = dispatcher
        .get(ApiVersion::V1, "/cluster/me", TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::Decode { status } if status == "502 Bad Gateway"));
}

// ── Validation & transport ──────────────────────────────────────────

#[tokio::test]
async fn test_bad_endpoint_fails_before_any_request() {
    let (server, dispatcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let missing_slash = dispatcher.get(ApiVersion::V1, "cluster/me", TIMEOUT).await;
    let trailing_slash = dispatcher.get(ApiVersion::V1, "/cluster/me/", TIMEOUT).await;

    assert!(missing_slash.unwrap_err().is_validation());
    assert!(trailing_slash.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_unknown_api_version_is_rejected() {
    let err = ApiVersion::parse("v3").unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let creds = Credentials::new("127.0.0.1:1", "admin", SecretString::from("pw".to_owned()));
    let dispatcher = Dispatcher::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:1").unwrap(),
        creds,
    );

    let err = dispatcher
        .get(ApiVersion::V1, "/cluster/me", Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::Unreachable { host } if host == "127.0.0.1:1"));
    assert!(err.is_transient());
}
