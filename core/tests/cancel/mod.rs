use std::time::Duration;

use attains_core::{
    BackoffRetryPolicy, CancellationToken, Error, ErrorKind, HttpSend, Request, Response,
};
use pretty_assertions::assert_eq;

use super::*;

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_sending() {
    let http = ScriptedHttpSend::new().respond(200, BALANCE_OK);
    let client = test_client(&http, BackoffRetryPolicy::default());

    let token = CancellationToken::new();
    token.cancel();

    let mut resp = Response::new(Balance::default());
    let err = client
        .send(Request::new().with_cancellation(token), &mut resp)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(http.seen().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_backoff() {
    let mut http = ScriptedHttpSend::new();
    for _ in 0..4 {
        http = http.fail(Error::network("connection reset"));
    }
    let policy =
        BackoffRetryPolicy::new(3, Duration::from_secs(20), Duration::from_millis(300));
    let client = test_client(&http, policy);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let mut resp = Response::new(Balance::default());
    let err = client
        .send(Request::new().with_cancellation(token), &mut resp)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    // Only the first attempt went out, the retry was abandoned.
    assert_eq!(http.seen().len(), 1);
}

/// HttpSend that never answers.
#[derive(Debug)]
struct PendingHttpSend;

#[async_trait::async_trait]
impl HttpSend for PendingHttpSend {
    async fn http_send(
        &self,
        _: http::Request<bytes::Bytes>,
    ) -> attains_core::Result<http::Response<bytes::Bytes>> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_while_sending() {
    init_logger();
    let config = attains_core::Config::new()
        .with_endpoint("sms.example.com")
        .with_access_key("AK1", "SK1")
        .unwrap();
    let client = attains_core::Client::new(config, PendingHttpSend);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let err = client
        .call::<Balance>(Request::new().with_cancellation(token))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_while_reading_body() {
    let http = ScriptedHttpSend::new().respond(200, BALANCE_OK);
    let client = test_client(&http, BackoffRetryPolicy::default());

    // The writer stays open, so reading the body never finishes.
    let (_writer, reader) = tokio::io::duplex(64);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let mut resp = Response::new(Balance::default());
    let err = client
        .send(
            Request::new()
                .with_method(http::Method::POST)
                .with_body_reader(reader, None)
                .with_cancellation(token),
            &mut resp,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(http.seen().is_empty());
}
