//! Black-box session propagation scenarios
//!
//! Each scenario sends real HTTP requests through the filter-wrapped router
//! and asserts on the structured records the diagnostic layer captured.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use jalki_core::keys;
use jalki_e2e::{init_capture, records_for, test_app};
use tower::ServiceExt;

fn get_request(marker: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/log/{marker}"));
    if let Some(value) = session {
        builder = builder.header(keys::SESSION_ID, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn session_of(record: &jalki_web::layer::LogRecord) -> &str {
    record
        .fields
        .get(keys::SESSION_ID)
        .map(String::as_str)
        .unwrap_or("")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_header_leaves_all_records_untagged() {
    let sink = init_capture();

    let response = test_app()
        .oneshot(get_request("e2e-nohdr", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = records_for(&sink, "e2e-nohdr");
    assert_eq!(records.len(), 3, "one record per stage expected");
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.message, format!("e2e-nohdr message {}", i + 1));
        assert_eq!(
            session_of(record),
            "",
            "record {} must not carry a stale session",
            i + 1
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn header_value_tags_every_stage() {
    let sink = init_capture();

    let response = test_app()
        .oneshot(get_request("e2e-tagged", Some("my_session_id")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = records_for(&sink, "e2e-tagged");
    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.message, format!("e2e-tagged message {}", i + 1));
        assert_eq!(session_of(record), "my_session_id");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_mix_sessions() {
    let sink = init_capture();

    // Two requests in flight at once; their stages share worker threads
    let (first, second) = tokio::join!(
        test_app().oneshot(get_request("e2e-cc-a", Some("A"))),
        test_app().oneshot(get_request("e2e-cc-b", Some("B"))),
    );
    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);

    let a_records = records_for(&sink, "e2e-cc-a");
    let b_records = records_for(&sink, "e2e-cc-b");
    assert_eq!(a_records.len(), 3);
    assert_eq!(b_records.len(), 3);

    assert!(
        a_records.iter().all(|r| session_of(r) == "A"),
        "chain A saw a foreign session: {a_records:?}"
    );
    assert!(
        b_records.iter().all(|r| session_of(r) == "B"),
        "chain B saw a foreign session: {b_records:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequential_requests_do_not_leak_between_each_other() {
    let sink = init_capture();

    // Tagged request first, untagged second: thread reuse must not leak "V1"
    let app = test_app();
    let response = app
        .clone()
        .oneshot(get_request("e2e-seq-1", Some("V1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("e2e-seq-2", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let first_records = records_for(&sink, "e2e-seq-1");
    let second_records = records_for(&sink, "e2e-seq-2");
    assert_eq!(first_records.len(), 3);
    assert_eq!(second_records.len(), 3);
    assert!(first_records.iter().all(|r| session_of(r) == "V1"));
    assert!(second_records.iter().all(|r| session_of(r) == ""));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_install_changes_nothing() {
    let sink = init_capture();

    // Installing the bridge again must be invisible to propagation
    jalki_pipeline::bridge::install();
    jalki_pipeline::bridge::install();
    assert!(jalki_pipeline::bridge::is_installed());

    let response = test_app()
        .oneshot(get_request("e2e-reinstall", Some("still-works")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = records_for(&sink, "e2e-reinstall");
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| session_of(r) == "still-works"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn first_of_repeated_headers_is_used() {
    let sink = init_capture();

    let request = Request::builder()
        .uri("/log/e2e-repeat")
        .header(keys::SESSION_ID, "first")
        .header(keys::SESSION_ID, "second")
        .body(Body::empty())
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = records_for(&sink, "e2e-repeat");
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| session_of(r) == "first"));
}
