mod support;

use anyhow::Result;
use secrecy::ExposeSecret;
use transitbook::credentials::{CredentialSource, HttpCredentialSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn empty_object_means_unauthorised() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let credentials = HttpCredentialSource::new(server.uri()).credentials().await?;
    assert!(credentials.access_token.is_none());
    assert_eq!(credentials.current_bank, None);
    Ok(())
}

#[tokio::test]
async fn token_and_bank_are_read() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"access_token":"tok_abc","current_bank":"starling","expires_in":21600}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let credentials = HttpCredentialSource::new(format!("{}/", server.uri()))
        .credentials()
        .await?;
    assert_eq!(
        credentials.access_token.as_ref().map(|t| t.expose_secret()),
        Some("tok_abc")
    );
    assert_eq!(credentials.current_bank.as_deref(), Some("starling"));
    Ok(())
}

#[tokio::test]
async fn server_error_is_surfaced() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = HttpCredentialSource::new(server.uri())
        .credentials()
        .await
        .expect_err("500 is an error");
    assert!(err.to_string().contains("500"), "{err}");
    Ok(())
}

#[tokio::test]
async fn logout_hits_server() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    HttpCredentialSource::new(server.uri()).logout();

    assert!(support::wait_for_request(&server, "GET", "/logout").await);
    Ok(())
}
