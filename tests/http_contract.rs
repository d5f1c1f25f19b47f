//! HTTP contract tests for the Gmail client.
//!
//! Each test starts a local fake server and points the real client at it.

mod common;

use std::time::Duration;

use mailmind::error::{ErrorKind, MailError};
use mailmind::mail::{GmailClient, MessageLister};
use mailmind::retry::RetryPolicy;

use common::{FakeServer, Route};

const LIST_PATH: &str = "/gmail/v1/users/me/messages";

fn metadata(id: &str, subject: &str, from: &str) -> String {
    serde_json::json!({
        "id": id,
        "payload": { "headers": [
            { "name": "Subject", "value": subject },
            { "name": "From", "value": from }
        ]}
    })
    .to_string()
}

fn gmail(server: &FakeServer) -> GmailClient {
    GmailClient::new(format!("{}/", server.base))
        .unwrap()
        .with_retry_policy(RetryPolicy::mail_endpoint().with_base_delay(Duration::ZERO))
}

#[tokio::test]
async fn gmail_lists_inbox_headers_and_skips_broken_messages() {
    let server = FakeServer::start(vec![
        Route::get(
            LIST_PATH,
            200,
            r#"{"messages": [{"id": "m1", "threadId": "t"}, {"id": "m2", "threadId": "t"}, {"id": "m3", "threadId": "t"}]}"#,
        ),
        Route::get(format!("{LIST_PATH}/m1"), 200, metadata("m1", "Server Down", "alerts@x.com")),
        Route::get(format!("{LIST_PATH}/m2"), 200, metadata("m2", "Newsletter", "News <news@y.com>")),
    ])
    .await;

    let records = gmail(&server).list_headers("ya29.token", 5).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].subject(), "Server Down");
    assert_eq!(records[1].sender(), "News <news@y.com>");

    let list = &server.requests_to(LIST_PATH)[0];
    assert!(list.target.contains("labelIds=INBOX"));
    assert!(list.target.contains("maxResults=5"));
    assert_eq!(list.header("authorization"), Some("Bearer ya29.token"));

    let detail = &server.requests_to(&format!("{LIST_PATH}/m1"))[0];
    assert!(detail.target.contains("format=metadata"));
    assert!(detail.target.contains("metadataHeaders=Subject"));
    assert!(detail.target.contains("metadataHeaders=From"));
}

#[tokio::test]
async fn gmail_empty_inbox_makes_no_metadata_calls() {
    let server = FakeServer::start(vec![Route::get(LIST_PATH, 200, r#"{"resultSizeEstimate": 0}"#)]).await;
    let records = gmail(&server).list_headers("t", 20).await.unwrap();
    assert!(records.is_empty());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn gmail_rejected_token_is_an_auth_failure() {
    let server = FakeServer::start(vec![Route::get(
        LIST_PATH,
        401,
        r#"{"error": {"code": 401, "message": "Invalid Credentials"}}"#,
    )])
    .await;
    let err = gmail(&server).list_headers("bad", 20).await.unwrap_err();
    assert!(matches!(err, MailError::AuthFailed { .. }));
    // Auth failures are not retried.
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn gmail_server_errors_are_retried_three_times() {
    let server = FakeServer::start(vec![Route::get(LIST_PATH, 503, "unavailable")]).await;
    let err = gmail(&server).list_headers("t", 20).await.unwrap_err();
    assert!(matches!(err, MailError::Network { .. }));
    assert_eq!(server.requests().len(), 4);
}

#[tokio::test]
async fn gmail_unknown_listing_path_is_a_rejected_request() {
    let server = FakeServer::start(vec![]).await;
    let err = gmail(&server).list_headers("t", 20).await.unwrap_err();
    assert!(matches!(err, MailError::RequestFailed { status: 404, .. }));
    assert_eq!(err.kind(), ErrorKind::Request);
    // Rejected requests are not retried.
    assert_eq!(server.requests().len(), 1);
}
