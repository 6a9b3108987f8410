//! Behaviour tests for the portal login handshake.

use dmd_core::{AuthenticationError, ArtifactSource, ExtractError, FetchErrorKind, HttpError};
use dmd_tests::*;

#[tokio::test]
async fn when_login_succeeds_system_posts_token_and_reuses_cookies_for_downloads() {
    // Given: A portal whose login form carries an anti-forgery token
    let http = Arc::new(portal());

    // When: The system logs in and downloads one artifact
    let session = login(Arc::clone(&http)).await;
    let body = session
        .fetch("download/posttrade/LSE/FCA/XLON-post-2024-03-05T08_00.csv")
        .await
        .expect("artifact served");

    // Then: The token went back with the credentials, and the download used the same transport
    let requests = http.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[1].method, HttpMethod::Post);
    assert_eq!(
        requests[1].body.as_deref(),
        Some("username=ops&password=secret&_csrf=8d1f6c52-token")
    );
    assert_eq!(
        requests[1].headers.get("content-type").map(String::as_str),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(
        requests[2].url,
        "https://portal.test/dmd/download/posttrade/LSE/FCA/XLON-post-2024-03-05T08_00.csv"
    );
    assert!(body.starts_with("distributionTime;"));
}

#[tokio::test]
async fn when_login_page_has_no_form_system_fails_authentication() {
    // Given: A maintenance page instead of the login form
    let http = Arc::new(FixtureHttpClient::new().route(
        HttpMethod::Get,
        "/login.html",
        Ok(HttpResponse::ok("<html><body>Down for maintenance</body></html>")),
    ));

    // When: The system tries to log in
    let result = Session::authenticate(http.clone(), BASE_URL, &Credentials::new("ops", "x")).await;

    // Then: Authentication fails and no credentials were posted
    assert_eq!(result.err(), Some(AuthenticationError::MissingForm));
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn when_login_page_is_unreachable_system_reports_transport_failure() {
    // Given: A portal that times out
    let http = Arc::new(FixtureHttpClient::new().route(
        HttpMethod::Get,
        "/login.html",
        Err(HttpError::new("request timed out")),
    ));

    // When: The system tries to log in
    let result = Session::authenticate(http, BASE_URL, &Credentials::new("ops", "x")).await;

    // Then: The failure is an authentication error naming the transport problem
    match result {
        Err(AuthenticationError::Transport(message)) => assert!(message.contains("timed out")),
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn when_credentials_are_rejected_run_aborts_before_any_download() {
    // Given: A portal that rejects the login post
    let http = Arc::new(
        FixtureHttpClient::new()
            .route(HttpMethod::Get, "/login.html", Ok(HttpResponse::ok(LOGIN_HTML)))
            .route(HttpMethod::Post, "/login.html", Ok(HttpResponse::new(403, "denied"))),
    );

    // When: The system connects an extractor
    let result = Extractor::connect(&config(), http.clone(), tuesday_at(12, 0, 0)).await;

    // Then: The run aborts with an authentication error and nothing was downloaded
    assert!(matches!(
        result,
        Err(ExtractError::Authentication(AuthenticationError::Rejected { status: 403 }))
    ));
    assert_eq!(http.request_count(), 2);
}

#[tokio::test]
async fn when_credentials_are_missing_system_never_contacts_the_portal() {
    // Given: A configuration without a password
    let http = Arc::new(portal());
    let mut config = config();
    config.password = String::new();

    // When: The system connects an extractor
    let result = Extractor::connect(&config, http.clone(), tuesday_at(12, 0, 0)).await;

    // Then: Configuration is rejected up front
    assert!(matches!(result, Err(ExtractError::Config(_))));
    assert_eq!(http.request_count(), 0);
}

#[tokio::test]
async fn when_an_artifact_is_missing_download_reports_status_and_path() {
    // Given: An authenticated session on a portal without the requested file
    let http = Arc::new(portal().route(
        HttpMethod::Get,
        "XLON-post-2024-03-05T09_00.csv",
        Ok(HttpResponse::new(404, "")),
    ));
    let session = login(http).await;

    // When: The system downloads it
    let error = session
        .fetch("download/posttrade/LSE/FCA/XLON-post-2024-03-05T09_00.csv")
        .await
        .expect_err("missing file");

    // Then: The error carries the status and the relative path, and is not retryable
    assert_eq!(error.kind(), FetchErrorKind::Status(404));
    assert_eq!(
        error.path(),
        "download/posttrade/LSE/FCA/XLON-post-2024-03-05T09_00.csv"
    );
    assert!(!error.retryable());
}
