//! Behaviour tests for the minute-by-minute session walk.

use dmd_core::{
    iterate, resolve_path, resolve_path_named, FetchErrorKind, SessionHours, SessionWalk,
    UnknownFeedError,
};
use dmd_tests::*;

async fn drain(walk: &mut SessionWalk<Session>) -> (usize, usize) {
    let (mut rows, mut errors) = (0, 0);
    while let Some(item) = walk.next().await {
        match item {
            Ok(_) => rows += 1,
            Err(_) => errors += 1,
        }
    }
    (rows, errors)
}

#[tokio::test]
async fn when_today_is_a_weekend_system_issues_no_requests() {
    // Given: An authenticated session on a Saturday afternoon
    let http = Arc::new(portal());
    let session = login(Arc::clone(&http)).await;
    let after_login = http.request_count();

    // When: The system walks any feed
    let mut walk = iterate(
        session,
        FeedId::TurquoiseEuropePostTrade,
        SessionHours::default(),
        saturday_at(14, 0, 0),
    );

    // Then: The walk is empty and the portal saw no artifact request
    assert!(walk.next().await.is_none());
    assert_eq!(walk.fetches(), 0);
    assert_eq!(http.request_count(), after_login);
}

#[tokio::test]
async fn when_session_is_over_system_fetches_every_minute_from_open_to_close() {
    // Given: A weekday evening, long after the 16:30 close
    let http = Arc::new(portal());
    let session = login(Arc::clone(&http)).await;

    // When: The system walks the LSE pre-trade feed
    let mut walk = SessionWalk::new(
        session,
        FeedId::LsePreTrade,
        SessionHours::default(),
        tuesday_at(23, 0, 0),
    );
    let (rows, errors) = drain(&mut walk).await;

    // Then: 511 artifacts were fetched, 08:00 through 16:30 inclusive
    assert_eq!((rows, errors), (0, 0));
    assert_eq!(walk.fetches(), 511);

    let downloads: Vec<String> = http
        .requests()
        .into_iter()
        .filter(|request| request.url.contains("/download/"))
        .map(|request| request.url)
        .collect();
    assert_eq!(downloads.len(), 511);
    assert!(downloads[0].ends_with("XLON-pre-2024-03-05T08_00.csv"));
    assert!(downloads[510].ends_with("XLON-pre-2024-03-05T16_30.csv"));
}

#[tokio::test]
async fn when_session_is_in_progress_system_stops_at_the_current_minute() {
    // Given: 08:05:30 on a weekday
    let http = Arc::new(portal());
    let session = login(Arc::clone(&http)).await;

    // When: The system walks a feed
    let mut walk = SessionWalk::new(
        session,
        FeedId::TradechoNlPostTrade,
        SessionHours::default(),
        tuesday_at(8, 5, 30),
    );
    drain(&mut walk).await;

    // Then: Only the cursors strictly before now were fetched
    assert_eq!(walk.fetches(), 6);
}

#[tokio::test]
async fn when_one_minute_fails_system_reports_it_and_keeps_walking() {
    // Given: The 08:01 file fails with a server error, its neighbours carry one trade each
    let http = Arc::new(
        portal()
            .route(
                HttpMethod::Get,
                "XLON-post-2024-03-05T08_00.csv",
                Ok(HttpResponse::ok(xlon_post_body(&[xlon_post_line(
                    1,
                    "2024-03-05T08:00:00Z",
                    "10",
                )]))),
            )
            .route(
                HttpMethod::Get,
                "XLON-post-2024-03-05T08_01.csv",
                Ok(HttpResponse::new(500, "")),
            )
            .route(
                HttpMethod::Get,
                "XLON-post-2024-03-05T08_02.csv",
                Ok(HttpResponse::ok(xlon_post_body(&[xlon_post_line(
                    3,
                    "2024-03-05T08:02:00Z",
                    "10",
                )]))),
            ),
    );
    let session = login(http).await;
    let mut walk = SessionWalk::new(
        session,
        FeedId::LsePostTrade,
        SessionHours::default(),
        tuesday_at(8, 2, 59),
    );

    // When: The system pulls every item
    let mut items = Vec::new();
    while let Some(item) = walk.next().await {
        items.push(item);
    }

    // Then: Row, failure, row, in cursor order
    assert_eq!(items.len(), 3);
    assert_eq!(
        items[0].as_ref().ok().and_then(|row| row.get("transactionIdentificationCode")),
        Some("1")
    );
    let failure = items[1].as_ref().expect_err("08:01 fails");
    assert_eq!(failure.kind(), FetchErrorKind::Status(500));
    assert!(failure.retryable());
    assert!(failure.path().ends_with("XLON-post-2024-03-05T08_01.csv"));
    assert_eq!(
        items[2].as_ref().ok().and_then(|row| row.get("transactionIdentificationCode")),
        Some("3")
    );
}

#[tokio::test]
async fn when_consumer_stops_pulling_no_further_files_are_fetched() {
    // Given: A full session's worth of files
    let http = Arc::new(portal().with_fallback(HttpResponse::ok(xlon_post_body(&[
        xlon_post_line(1, "2024-03-05T08:00:00Z", "1"),
        xlon_post_line(2, "2024-03-05T08:00:00Z", "1"),
    ]))));
    let session = login(Arc::clone(&http)).await;
    let after_login = http.request_count();
    let mut walk = SessionWalk::new(
        session,
        FeedId::LsePostTrade,
        SessionHours::default(),
        tuesday_at(23, 0, 0),
    );

    // When: The consumer takes three rows and walks away
    for _ in 0..3 {
        assert!(matches!(walk.next().await, Some(Ok(_))));
    }
    drop(walk);

    // Then: Exactly two files were downloaded
    assert_eq!(http.request_count() - after_login, 2);
}

#[test]
fn when_feed_name_is_unknown_system_refuses_to_guess_a_path() {
    // Given: A feed name outside the catalogue
    let cursor = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
        .and_then(|d| d.and_hms_opt(9, 15, 0))
        .expect("valid cursor");

    // When: The system resolves it
    let result = resolve_path_named("XPAR-Post-Trade", cursor);

    // Then: It fails instead of falling back to another feed's folder
    assert_eq!(result, Err(UnknownFeedError::new("XPAR-Post-Trade")));
    assert_eq!(
        resolve_path_named("Turqouise-europe-Pre-Trade", cursor),
        Ok(resolve_path(FeedId::TurquoiseEuropePreTrade, cursor))
    );
    assert_eq!(
        resolve_path(FeedId::TurquoiseEuropePreTrade, cursor),
        "download/pretrade/TQE/AFM/TQEX-pre-2024-03-05T09_15.csv"
    );
}
