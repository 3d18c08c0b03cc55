//! Credential resolution and service-account exchange over HTTP

use std::time::Duration;

use astractl_core::{
    AuthenticatedClient, ControlPlane, CoreError, CredentialSource, Result, ServiceAccount,
    SessionSettings,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Stored {
    token: Option<String>,
    account: Option<ServiceAccount>,
}

impl CredentialSource for Stored {
    fn token(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }

    fn service_account(&self) -> Result<Option<ServiceAccount>> {
        Ok(self.account.clone())
    }
}

fn settings() -> SessionSettings {
    SessionSettings {
        timeout: Duration::from_secs(5),
        verbose: false,
    }
}

fn account_only() -> Stored {
    Stored {
        token: None,
        account: Some(ServiceAccount::new("ops@example.com", "cid", "csecret")),
    }
}

#[tokio::test]
async fn service_account_is_exchanged_once_and_used_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/authenticateServiceAccount"))
        .and(body_json(json!({
            "clientName": "ops@example.com",
            "clientId": "cid",
            "clientSecret": "csecret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "exchanged"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/availableRegions"))
        .and(header("authorization", "Bearer exchanged"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = AuthenticatedClient::connect(&server.uri(), &account_only(), settings())
        .await
        .unwrap();
    assert_eq!(client.session().token(), "exchanged");
    assert!(client.list_tiers().await.unwrap().is_empty());
}

#[tokio::test]
async fn token_never_calls_exchange() {
    let server = MockServer::start().await;
    let source = Stored {
        token: Some("AstraCS:direct".to_string()),
        account: Some(ServiceAccount::new("ops", "cid", "csecret")),
    };

    let client = AuthenticatedClient::connect(&server.uri(), &source, settings())
        .await
        .unwrap();

    assert_eq!(client.session().token(), "AstraCS:direct");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn rejected_exchange_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/authenticateServiceAccount"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"ID": 401, "message": "invalid credentials"}]
        })))
        .mount(&server)
        .await;

    let err = AuthenticatedClient::connect(&server.uri(), &account_only(), settings())
        .await
        .unwrap_err();

    assert!(matches!(
        err.root(),
        CoreError::Authentication(msg) if msg.contains("invalid credentials")
    ));
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn empty_token_in_exchange_response_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/authenticateServiceAccount"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": ""})))
        .mount(&server)
        .await;

    let err = AuthenticatedClient::connect(&server.uri(), &account_only(), settings())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), CoreError::Authentication(_)));
}

#[tokio::test]
async fn incomplete_service_account_makes_no_request() {
    let server = MockServer::start().await;
    let source = Stored {
        token: None,
        account: Some(ServiceAccount::new("ops", "cid", "")),
    };

    let err = AuthenticatedClient::connect(&server.uri(), &source, settings())
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("clientSecret"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
