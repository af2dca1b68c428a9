#![allow(dead_code)]

use std::net::TcpListener;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use secrecy::SecretString;
use serde_json::{json, Value};
use transitbook::sync::AuthContext;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const BEARER: &str = "Bearer test-token";
pub const MONZO_ACCOUNT: &str = "acc_retail";

pub fn auth() -> AuthContext {
    AuthContext::bearer(SecretString::from(TOKEN.to_string()))
}

/// `created` timestamp `minutes` after 2023-02-01T00:00:00Z.
pub fn created_at(minutes: i64) -> String {
    let base: DateTime<Utc> = Utc
        .with_ymd_and_hms(2023, 2, 1, 0, 0, 0)
        .single()
        .expect("valid base date");
    (base + chrono::Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One Monzo transaction. Every fourth index is groceries, the rest are
/// TfL journeys.
pub fn monzo_transaction(index: usize) -> Value {
    let (category, description) = if index % 4 == 3 {
        ("groceries", "SAINSBURYS LONDON")
    } else {
        ("transport", "TFL.GOV.UK/CP")
    };
    json!({
        "id": format!("tx_{index:04}"),
        "account_id": MONZO_ACCOUNT,
        "amount": -150 - (index as i64 % 5) * 10,
        "created": created_at(index as i64),
        "category": category,
        "description": description,
        "merchant": null,
    })
}

/// `{"transactions": [...]}` for indexes `start..start + count`.
pub fn monzo_page(start: usize, count: usize) -> String {
    let transactions: Vec<Value> = (start..start + count).map(monzo_transaction).collect();
    json!({ "transactions": transactions }).to_string()
}

pub fn transit_count(start: usize, count: usize) -> usize {
    (start..start + count).filter(|i| i % 4 != 3).count()
}

pub async fn mount_monzo_accounts(server: &MockServer) {
    let body = json!({
        "accounts": [
            { "id": "acc_prepaid", "type": "uk_prepaid", "description": "prepaid" },
            { "id": MONZO_ACCOUNT, "type": "uk_retail", "description": "current" },
        ]
    });
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(header("authorization", BEARER))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json"))
        .mount(server)
        .await;
}

/// Base url of a local port with nothing listening on it.
pub fn closed_port_uri() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(format!("http://127.0.0.1:{port}"))
}

/// Number of requests the server has seen for `path_str`.
pub async fn request_count(server: &MockServer, path_str: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path() == path_str)
        .count()
}

/// Poll the mock server until a request for `method_name path_str` shows up.
/// Used for fire-and-forget calls.
pub async fn wait_for_request(server: &MockServer, method_name: &str, path_str: &str) -> bool {
    for _ in 0..100 {
        let seen = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|req| req.method.as_str() == method_name && req.url.path() == path_str);
        if seen {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
