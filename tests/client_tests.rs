mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tsheets::auth::{ManagedTokenProvider, StaticTokenProvider};
use tsheets::client::{ApiClient, ReportType, ResourceType};
use tsheets::error::TsheetsError;
use tsheets::transport::CLIENT_USER_AGENT;
use tsheets::util::RetryPolicy;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{connection, grant_response, stale_token};

fn static_client(server: &MockServer, access_token: &str) -> ApiClient {
    ApiClient::new(
        connection(server),
        Arc::new(StaticTokenProvider::new(access_token)),
    )
}

#[tokio::test]
async fn get_sends_filters_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobcodes"))
        .and(query_param("active", "yes"))
        .and(query_param("name", "Field work & travel"))
        .and(header("authorization", "Bearer good-token"))
        .and(header("user-agent", CLIENT_USER_AGENT))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":{}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let body = static_client(&server, "good-token")
        .get(
            ResourceType::Jobcodes,
            &[("active", "yes"), ("name", "Field work & travel")],
        )
        .await
        .expect("get jobcodes");

    assert_eq!(body, r#"{"results":{}}"#);
}

#[tokio::test]
async fn get_without_filters_has_no_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/current_user"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    static_client(&server, "t")
        .get(ResourceType::CurrentUser, &[])
        .await
        .expect("get current user");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn bad_token_yields_401_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(header("authorization", "Bearer badtoken"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": 401, "message": "Unauthorized" }
        })))
        .mount(&server)
        .await;

    let err = static_client(&server, "badtoken")
        .get(ResourceType::Users, &[])
        .await
        .unwrap_err();

    let api = err.api_error().expect("transport error");
    assert_eq!(api.http_status_code(), "401");
    assert_eq!(api.error_code(), "401");
    assert_eq!(api.error_text(), "Unauthorized");
    assert!(api.request_url().ends_with("/api/v1/users"));
    assert!(matches!(err, TsheetsError::Api(_)));
}

#[tokio::test]
async fn add_wraps_items_in_data_array() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/timesheets"))
        .and(body_json(json!({
            "data": [
                { "user_id": 1, "jobcode_id": 10 },
                { "user_id": 2, "jobcode_id": 20 },
                { "user_id": 3, "jobcode_id": 30 }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":{"timesheets":{}}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let items = vec![
        json!({ "user_id": 1, "jobcode_id": 10 }),
        json!({ "user_id": 2, "jobcode_id": 20 }),
        json!({ "user_id": 3, "jobcode_id": 30 }),
    ];
    static_client(&server, "t")
        .add(ResourceType::Timesheets, &items)
        .await
        .expect("add timesheets");
}

#[tokio::test]
async fn edit_uses_put_with_same_wrapping() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/jobcodes"))
        .and(body_json(json!({ "data": [{ "id": 7, "name": "Renamed" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    #[derive(serde::Serialize)]
    struct JobcodeEdit<'a> {
        id: u64,
        name: &'a str,
    }

    static_client(&server, "t")
        .edit(
            ResourceType::Jobcodes,
            &[JobcodeEdit {
                id: 7,
                name: "Renamed",
            }],
        )
        .await
        .expect("edit jobcodes");
}

#[tokio::test]
async fn raw_bodies_are_sent_unmodified() {
    let server = MockServer::start().await;
    let raw = r#"{"data":[{"name":"raw"}]}"#;
    Mock::given(method("POST"))
        .and(path("/api/v1/customfielditems"))
        .and(body_string(raw))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/customfielditems"))
        .and(body_string(raw))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = static_client(&server, "t");
    client
        .add_raw(ResourceType::CustomFieldItems, raw)
        .await
        .expect("add raw");
    client
        .edit_raw(ResourceType::CustomFieldItems, raw)
        .await
        .expect("edit raw");
}

#[tokio::test]
async fn delete_joins_ids_into_one_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/timesheets"))
        .and(query_param("ids", "5,9,14"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    static_client(&server, "t")
        .delete(ResourceType::Timesheets, &[5, 9, 14])
        .await
        .expect("delete timesheets");

    let requests = server.received_requests().await.expect("recording enabled");
    let pairs: Vec<_> = requests[0].url.query_pairs().into_owned().collect();
    assert_eq!(pairs, vec![("ids".to_string(), "5,9,14".to_string())]);
}

#[tokio::test]
async fn report_posts_body_to_report_endpoint() {
    let server = MockServer::start().await;
    let request = r#"{"data":{"start_date":"2024-01-01","end_date":"2024-01-31"}}"#;
    Mock::given(method("POST"))
        .and(path("/api/v1/reports/payroll"))
        .and(body_string(request))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":{"payroll_report":{}}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let body = static_client(&server, "t")
        .get_report(ReportType::Payroll, request)
        .await
        .expect("payroll report");
    assert_eq!(body, r#"{"results":{"payroll_report":{}}}"#);
}

#[tokio::test]
async fn server_error_is_not_returned_as_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/geolocations"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = static_client(&server, "t")
        .get(ResourceType::Geolocations, &[])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.is_retryable());
    assert_eq!(err.api_error().unwrap().error_text(), "maintenance");
}

#[tokio::test]
async fn managed_provider_refreshes_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/grant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(grant_response("new-access", "new-refresh")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/effective_settings"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(2)
        .mount(&server)
        .await;

    let connection = connection(&server);
    let provider = ManagedTokenProvider::new(connection.clone())
        .with_token(stale_token("old-access", "old-refresh"));
    let client = ApiClient::new(connection, Arc::new(provider));

    client
        .get(ResourceType::EffectiveSettings, &[])
        .await
        .expect("first call refreshes");
    client
        .get(ResourceType::EffectiveSettings, &[])
        .await
        .expect("second call reuses token");
}

#[tokio::test]
async fn unauthenticated_provider_fails_before_any_request() {
    let server = MockServer::start().await;
    let connection = connection(&server);
    let client = ApiClient::new(
        connection.clone(),
        Arc::new(ManagedTokenProvider::new(connection)),
    );

    let err = client.get(ResourceType::Users, &[]).await.unwrap_err();
    assert!(matches!(err, TsheetsError::NotAuthenticated));
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

fn retrying_client(server: &MockServer) -> ApiClient {
    static_client(server, "t").with_retry(
        RetryPolicy::attempts(3).with_backoff(Duration::from_millis(5), Duration::from_millis(20)),
    )
}

async fn mount_busy_once(server: &MockServer, http_method: &str, endpoint: &str) {
    Mock::given(method(http_method))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn retry_policy_replays_transient_get_failure() {
    let server = MockServer::start().await;
    mount_busy_once(&server, "GET", "/api/v1/users").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":{}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let body = retrying_client(&server)
        .get(ResourceType::Users, &[("active", "yes")])
        .await
        .expect("second attempt succeeds");
    assert_eq!(body, r#"{"results":{}}"#);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.url.query() == Some("active=yes")));
}

#[tokio::test]
async fn retry_policy_replays_read_only_report() {
    let server = MockServer::start().await;
    mount_busy_once(&server, "POST", "/api/v1/reports/project").await;
    Mock::given(method("POST"))
        .and(path("/api/v1/reports/project"))
        .and(body_string("{}"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    retrying_client(&server)
        .get_report(ReportType::Project, "{}")
        .await
        .expect("report retried");
}

#[tokio::test]
async fn add_is_never_replayed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/timesheets"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let err = retrying_client(&server)
        .add_raw(ResourceType::Timesheets, r#"{"data":[]}"#)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn client_errors_are_not_replayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobcodes"))
        .respond_with(ResponseTemplate::new(417).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let err = retrying_client(&server)
        .get(ResourceType::Jobcodes, &[])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(417));
}

#[tokio::test]
async fn unusable_token_is_refused_before_sending() {
    let server = MockServer::start().await;

    let err = static_client(&server, "line\nbreak")
        .get(ResourceType::Users, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, TsheetsError::Configuration(_)));
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}
