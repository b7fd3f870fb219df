//! End-to-end tests: a real gateway on an ephemeral port in front of
//! recording mock backends.

mod common;

use common::{client, settings_for, start_gateway, start_recording_backend, TestConfigDir};
use country_gateway::config::settings::{RoutingMode, TenantSettings};
use serde_json::Value;

#[tokio::test]
async fn test_forwards_to_country_backend_and_streams_response() {
    let atomic = start_recording_backend(
        201,
        r#"{"accounts":[]}"#,
        &[("X-Upstream", "atomic"), ("Proxy-Authenticate", "Basic")],
    )
    .await;
    let upvest = start_recording_backend(200, "upvest", &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &upvest.url());
    let gateway = start_gateway(settings_for(&dir, "dev")).await;

    let res = client()
        .get(gateway.url("/accounts?limit=10"))
        .header("country", "US")
        .header("X-Custom", "kept")
        .header("Proxy-Authorization", "Basic c2VjcmV0")
        .header("Keep-Alive", "timeout=5")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["x-upstream"], "atomic");
    assert!(res.headers().get("proxy-authenticate").is_none());
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(res.text().await.unwrap(), r#"{"accounts":[]}"#);

    let seen = atomic.last_request();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.target, "/accounts?limit=10");
    assert_eq!(seen.header("x-custom"), Some("kept"));
    assert_eq!(seen.header("country"), Some("US"));
    assert!(seen.header("proxy-authorization").is_none());
    assert!(seen.header("keep-alive").is_none());
    assert_eq!(seen.header("host"), Some(atomic.addr.to_string().as_str()));

    assert!(upvest.requests().is_empty());
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let atomic = start_recording_backend(404, "no such account", &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &atomic.url());
    let gateway = start_gateway(settings_for(&dir, "dev")).await;

    let res = client()
        .get(gateway.url("/accounts/acc-1/transactions"))
        .header("country", "us")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "no such account");
    assert_eq!(atomic.last_request().target, "/accounts/acc-1/transactions");
}

#[tokio::test]
async fn test_post_body_reaches_backend() {
    let atomic = start_recording_backend(200, "atomic", &[]).await;
    let upvest = start_recording_backend(200, r#"{"order":"created"}"#, &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &upvest.url());
    let gateway = start_gateway(settings_for(&dir, "dev")).await;

    let res = client()
        .post(gateway.url("/orders"))
        .header("country", "DE")
        .header("content-type", "application/json")
        .body(r#"{"isin":"DE0001","qty":3}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let seen = upvest.last_request();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.target, "/orders");
    assert_eq!(seen.body, br#"{"isin":"DE0001","qty":3}"#.to_vec());
    assert_eq!(seen.header("content-type"), Some("application/json"));
    assert!(atomic.requests().is_empty());
}

#[tokio::test]
async fn test_unsupported_country_and_path() {
    let atomic = start_recording_backend(200, "atomic", &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &atomic.url());
    let gateway = start_gateway(settings_for(&dir, "dev")).await;
    let client = client();

    let res = client
        .get(gateway.url("/accounts"))
        .header("country", "FR")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "country not supported");

    let res = client.get(gateway.url("/accounts")).send().await.unwrap();
    assert_eq!(res.status(), 400);

    // POST /orders belongs to upvest, not to US
    let res = client
        .post(gateway.url("/orders"))
        .header("country", "US")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "path not supported");

    assert!(atomic.requests().is_empty());
}

#[tokio::test]
async fn test_country_disabled_for_environment() {
    let atomic = start_recording_backend(200, "atomic", &[]).await;
    let upvest = start_recording_backend(200, "upvest", &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &upvest.url());
    let gateway = start_gateway(settings_for(&dir, "stage")).await;

    let res = client()
        .get(gateway.url("/accounts"))
        .header("country", "DE")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert!(upvest.requests().is_empty());

    let res = client()
        .get(gateway.url("/accounts"))
        .header("country", "US")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_unreachable_upstream_is_internal_error() {
    // Bind then drop to get a port nothing listens on.
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let dir = TestConfigDir::new(&format!("http://{closed}"), &format!("http://{closed}"));
    let gateway = start_gateway(settings_for(&dir, "dev")).await;

    let res = client()
        .get(gateway.url("/accounts"))
        .header("country", "US")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "internal server error");
}

#[tokio::test]
async fn test_admin_reload_keeps_state_on_failure_and_applies_changes() {
    let atomic = start_recording_backend(200, "atomic", &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &atomic.url());
    let gateway = start_gateway(settings_for(&dir, "dev")).await;
    let client = client();

    dir.write(
        "countries.yaml",
        "countries:\n  US:\n    service: ghost\n",
    );
    let res = client
        .post(gateway.url("/admin/reload-config"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "failed to reload configuration");

    let res = client
        .get(gateway.url("/accounts"))
        .header("country", "US")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    dir.write(
        "countries.yaml",
        "countries:\n  US:\n    service: atomic\n  FR:\n    service: atomic\n",
    );
    let res = client
        .post(gateway.url("/admin/reload-config"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["environment"], "dev");

    let res = client
        .get(gateway.url("/accounts"))
        .header("country", "FR")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(gateway.context.store.list_countries(), vec!["FR", "US"]);
}

#[tokio::test]
async fn test_reload_serves_newly_configured_path() {
    let atomic = start_recording_backend(200, "atomic", &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &atomic.url());
    let gateway = start_gateway(settings_for(&dir, "dev")).await;
    let client = client();

    let res = client
        .get(gateway.url("/balances/b-7"))
        .header("country", "US")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    dir.write(
        "services/atomic.yaml",
        &format!(
            "service:\n  name: atomic\n  base_url: {}\n  endpoints:\n    GetAccount:\n      method: GET\n      uri: /accounts\n    GetBalance:\n      method: GET\n      uri: /balances/{{id}}\n",
            atomic.url()
        ),
    );
    gateway.context.store.reload().unwrap();

    let res = client
        .get(gateway.url("/balances/b-7"))
        .header("country", "US")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(atomic.last_request().target, "/balances/b-7");
}

#[tokio::test]
async fn test_operation_mode_remarshals_account_request() {
    let atomic = start_recording_backend(200, r#"{"id":"acc"}"#, &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &atomic.url());
    let mut settings = settings_for(&dir, "dev");
    settings.routing_mode = RoutingMode::Operation;
    let gateway = start_gateway(settings).await;

    let res = client()
        .get(gateway.url("/accounts"))
        .header("country", "US")
        .body(r#"{"mid":"M-42","extra":true}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), r#"{"id":"acc"}"#);

    let seen = atomic.last_request();
    assert_eq!(seen.target, "/accounts");
    assert_eq!(seen.body, br#"{"mid":"M-42"}"#.to_vec());
    assert_eq!(seen.header("content-type"), Some("application/json"));

    let res = client()
        .get(gateway.url("/accounts/acc-1/transactions"))
        .header("country", "US")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_token_claim_tenant() {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let atomic = start_recording_backend(200, "atomic", &[]).await;
    let dir = TestConfigDir::new(&atomic.url(), &atomic.url());
    let mut settings = settings_for(&dir, "dev");
    settings.tenant = TenantSettings::TokenClaim;
    let gateway = start_gateway(settings).await;

    let claims = serde_json::json!({
        "sub": "merchant-1",
        "ext": { "classic": { "merchant_country": "US" } }
    });
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"k")).unwrap();

    let res = client()
        .get(gateway.url("/accounts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(atomic.requests().len(), 1);

    let res = client().get(gateway.url("/accounts")).send().await.unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(atomic.requests().len(), 1);
}
