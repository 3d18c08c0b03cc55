//! Lifecycle operations against a mock control plane

use std::time::Duration;

use astractl_core::{
    AuthenticatedClient, AuthenticatedSession, BundleKind, ControlPlane, CoreError,
    CreateResourceSpec, ListFilter, Operation, SessionSettings, Status, Transport, WaitPolicies,
    WaitPolicy,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const TOKEN: &str = "AstraCS:test-token";

fn client_for(server: &MockServer) -> AuthenticatedClient {
    client_with_timeout(&server.uri(), Duration::from_secs(5))
}

fn client_with_timeout(base_url: &str, timeout: Duration) -> AuthenticatedClient {
    let transport = Transport::new(base_url, timeout).unwrap();
    let session = AuthenticatedSession::new(TOKEN, SessionSettings::default());
    AuthenticatedClient::new(transport, session)
        .with_wait_policies(WaitPolicies::uniform(WaitPolicy::new(5, 0)))
}

fn database(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": status,
        "info": {"name": "mydb", "region": "us-east1", "tier": "serverless", "capacityUnits": 1}
    })
}

async fn requests_matching(server: &MockServer, verb: &str, route: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .collect()
}

#[tokio::test]
async fn create_waits_until_active() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(header("accept", "application/json"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "name": "mydb",
            "cloudProvider": "GCP",
            "tier": "serverless",
            "capacityUnits": 1,
            "region": "us-east1"
        })))
        .respond_with(ResponseTemplate::new(201).insert_header(
            "Location",
            format!("{}/v2/databases/abc123", server.uri()).as_str(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("abc123", "PROVISIONING")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("abc123", "ACTIVE")))
        .mount(&server)
        .await;

    let spec = CreateResourceSpec::new("mydb")
        .with_region("us-east1")
        .with_tier("serverless")
        .with_capacity_units(1);
    let db = client_for(&server).create(&spec).await.unwrap();

    assert_eq!(db.id, "abc123");
    assert_eq!(db.status, Status::Active);
    assert_eq!(
        requests_matching(&server, "GET", "/v2/databases/abc123")
            .await
            .len(),
        3
    );
}

#[tokio::test]
async fn create_without_location_is_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create(&CreateResourceSpec::new("mydb"))
        .await
        .unwrap_err();

    assert!(matches!(err.root(), CoreError::UnexpectedResponse(_)));
    assert!(requests_matching(&server, "GET", "/v2/databases").await.is_empty());
}

#[tokio::test]
async fn create_stops_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "broken1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/broken1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("broken1", "ERROR")))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create(&CreateResourceSpec::new("mydb"))
        .await
        .unwrap_err();

    assert!(matches!(err.root(), CoreError::ResourceErrorStatus { id } if id == "broken1"));
    assert!(err.to_string().starts_with("create database failed for broken1"));
    assert_eq!(
        requests_matching(&server, "GET", "/v2/databases/broken1")
            .await
            .len(),
        1
    );
}

#[tokio::test]
async fn create_rejects_invalid_spec_without_network() {
    let server = MockServer::start().await;
    let err = client_for(&server)
        .create(&CreateResourceSpec::new(""))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn terminate_treats_unauthorized_lookup_as_gone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x1/terminate"))
        .and(query_param("preparedStateOnly", "false"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/x1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"ID": 401, "message": "The requested database does not exist"}]
        })))
        .mount(&server)
        .await;

    client_for(&server).terminate("x1", false).await.unwrap();

    assert_eq!(requests_matching(&server, "GET", "/v2/databases/x1").await.len(), 1);
}

#[tokio::test]
async fn terminate_accepts_terminating() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x2/terminate"))
        .and(query_param("preparedStateOnly", "true"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/x2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("x2", "TERMINATING")))
        .mount(&server)
        .await;

    client_for(&server).terminate("x2", true).await.unwrap();
}

#[tokio::test]
async fn park_conflict_is_api_error_without_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x2/park"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "errors": [{"ID": 2000367, "message": "database is not in a parkable state"}]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).park("x2").await.unwrap_err();

    let api = err.api_error().expect("api error");
    assert_eq!(api.status, 409);
    assert_eq!(api.entries()[0].id, 2000367);
    assert!(err.is_conflict());
    assert!(matches!(
        err,
        CoreError::Operation {
            operation: Operation::Park,
            ..
        }
    ));
    assert!(requests_matching(&server, "GET", "/v2/databases/x2").await.is_empty());
}

#[tokio::test]
async fn unpark_waits_through_lookup_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x3/unpark"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/x3"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/x3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("x3", "UNPARKING")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/x3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("x3", "ACTIVE")))
        .mount(&server)
        .await;

    client_for(&server).unpark("x3").await.unwrap();

    assert_eq!(requests_matching(&server, "GET", "/v2/databases/x3").await.len(), 3);
}

#[tokio::test]
async fn unpark_waits_through_request_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x6/unpark"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/x6"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(database("x6", "ACTIVE"))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/x6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("x6", "ACTIVE")))
        .mount(&server)
        .await;

    client_with_timeout(&server.uri(), Duration::from_secs(1))
        .unpark("x6")
        .await
        .unwrap();

    assert_eq!(requests_matching(&server, "GET", "/v2/databases/x6").await.len(), 2);
}

#[tokio::test]
async fn find_past_deadline_is_transport_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(database("slow", "ACTIVE"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let err = client_with_timeout(&server.uri(), Duration::from_secs(1))
        .find("slow")
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(err.root(), CoreError::Transport(_)));
    assert!(err.is_timeout());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn find_against_closed_port_is_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = client_with_timeout(&format!("http://127.0.0.1:{port}"), Duration::from_secs(1))
        .find("db-1")
        .await
        .unwrap_err();

    assert!(matches!(err.root(), CoreError::Transport(_)));
    assert!(err.api_error().is_none());
    assert!(!err.is_resource_gone());
}

#[tokio::test]
async fn park_times_out_with_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x4/park"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/x4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("x4", "PARKING")))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .with_wait_policies(WaitPolicies::uniform(WaitPolicy::new(3, 0)))
        .park("x4")
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    match err.root() {
        CoreError::WaitTimeout { id, awaited, .. } => {
            assert_eq!(id, "x4");
            assert_eq!(awaited, &vec![Status::Parked]);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(requests_matching(&server, "GET", "/v2/databases/x4").await.len(), 3);
}

#[tokio::test]
async fn resize_is_not_polled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x5/resize"))
        .and(body_json(json!({"capacityUnits": 3})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).resize("x5", 3).await.unwrap();

    assert!(requests_matching(&server, "GET", "/v2/databases/x5").await.is_empty());
}

#[tokio::test]
async fn resize_rejects_zero_capacity() {
    let server = MockServer::start().await;
    let err = client_for(&server).resize("x5", 0).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn find_not_found_keeps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(&server)
        .await;

    let err = client_for(&server).find("missing").await.unwrap_err();

    assert!(err.is_not_found());
    let api = err.api_error().unwrap();
    assert!(!api.is_undecodable());
    assert!(api.entries().is_empty());
}

#[tokio::test]
async fn verbose_session_reports_same_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("v1", "ACTIVE")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/databases/v2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(&server)
        .await;

    let transport = Transport::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let settings = SessionSettings {
        verbose: true,
        ..SessionSettings::default()
    };
    let session = AuthenticatedSession::new(TOKEN, settings);
    assert!(session.verbose());
    let client = AuthenticatedClient::new(transport, session);

    assert_eq!(client.find("v1").await.unwrap().status, Status::Active);
    assert!(client.find("v2").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn list_sends_only_non_empty_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/databases"))
        .and(query_param("provider", "AWS"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            database("a", "ACTIVE"),
            database("b", "PARKED")
        ])))
        .mount(&server)
        .await;

    let filter = ListFilter {
        include: Some(String::new()),
        provider: Some("AWS".to_string()),
        starting_after: None,
        limit: 10,
    };
    let dbs = client_for(&server).list(&filter).await.unwrap();

    assert_eq!(dbs.len(), 2);
    assert_eq!(dbs[1].status, Status::Parked);
    let received = requests_matching(&server, "GET", "/v2/databases").await;
    assert_eq!(received[0].url.query(), Some("provider=AWS&limit=10"));
}

#[tokio::test]
async fn list_tiers_decodes_costs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/availableRegions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "tier": "serverless",
            "cloudProvider": "GCP",
            "region": "us-east1",
            "regionDisplay": "Moncks Corner, South Carolina",
            "cost": {"costPerMinCents": 0.0, "costPerMonthCents": 0.0},
            "databaseCountUsed": 2,
            "databaseCountLimit": 5,
            "capacityUnitsUsed": 2,
            "capacityUnitsLimit": 10
        }])))
        .mount(&server)
        .await;

    let tiers = client_for(&server).list_tiers().await.unwrap();
    assert_eq!(tiers.len(), 1);
    assert_eq!(tiers[0].database_count_limit, 5);
}

#[tokio::test]
async fn fetch_and_download_bundle() {
    let server = MockServer::start().await;
    let bundle_url = format!("{}/bundles/scb.zip", server.uri());
    Mock::given(method("POST"))
        .and(path("/v2/databases/x6/secureBundleURL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "downloadURL": bundle_url,
            "downloadURLInternal": "",
            "downloadURLMigrationProxy": "",
            "downloadURLMigrationProxyInternal": ""
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bundles/scb.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zip".to_vec()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let urls = client.fetch_bundle("x6").await.unwrap();
    assert_eq!(urls.url_for(BundleKind::External), Some(bundle_url.as_str()));

    let bytes = client
        .download_bundle(&urls, BundleKind::External)
        .await
        .unwrap();
    assert_eq!(bytes, b"PK\x03\x04zip".to_vec());

    let err = client
        .download_bundle(&urls, BundleKind::Internal)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn add_keyspace_and_reset_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x7/keyspaces/analytics"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x7/resetPassword"))
        .and(body_json(json!({"username": "admin", "password": "n3w"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.add_keyspace("x7", "analytics").await.unwrap();
    client.reset_password("x7", "admin", "n3w").await.unwrap();
}

#[tokio::test]
async fn undecodable_error_body_is_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/databases/x8/keyspaces/ks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add_keyspace("x8", "ks")
        .await
        .unwrap_err();

    let api = err.api_error().unwrap();
    assert!(api.is_undecodable());
    assert!(err.is_retryable());
}
