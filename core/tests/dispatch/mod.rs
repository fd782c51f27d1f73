use std::time::Duration;

use attains_core::{
    BackoffRetryPolicy, Envelope, Error, ErrorKind, NoRetryPolicy, Request, Response,
};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH};
use http::Method;
use pretty_assertions::assert_eq;

use super::*;

fn backoff() -> BackoffRetryPolicy {
    BackoffRetryPolicy::new(3, Duration::from_millis(20_000), Duration::from_millis(300))
}

#[tokio::test(start_paused = true)]
async fn test_call_decodes_payload() {
    let http = ScriptedHttpSend::new().respond(200, BALANCE_OK);
    let client = test_client(&http, backoff());

    let balance: Balance = client
        .call(Request::new().with_path("/balance"))
        .await
        .expect("call must succeed");
    assert_eq!(
        balance,
        Balance {
            balance: 1024,
            currency: "CNY".to_string()
        }
    );

    let seen = http.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].uri().to_string(), "https://sms.example.com/balance");
    let auth = seen[0].headers()[AUTHORIZATION].to_str().unwrap();
    assert!(auth.starts_with("attains-auth-v1/AK1/"), "{auth}");
    assert!(auth.contains("/1800/"), "{auth}");
    assert_eq!(http.closed(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_envelope_round_trip_through_client() {
    let data = Balance {
        balance: 42,
        currency: "USD".to_string(),
    };
    let body = serde_json::to_string(&Envelope {
        code: 200,
        message: "ok".to_string(),
        data: Some(data.clone()),
    })
    .unwrap();
    let http = ScriptedHttpSend::new().respond(200, &body);
    let client = test_client(&http, NoRetryPolicy);

    let mut resp = Response::new(Balance::default());
    client.send(Request::new(), &mut resp).await.unwrap();
    assert_eq!(resp.target(), &data);
    assert_eq!(resp.status(), Some(http::StatusCode::OK));
}

#[tokio::test(start_paused = true)]
async fn test_body_is_replayed_after_network_failure() {
    let http = ScriptedHttpSend::new()
        .fail(Error::network("connection reset by peer"))
        .respond(200, BALANCE_OK);
    let client = test_client(&http, backoff());

    let body: Vec<u8> = (0..100u8).collect();
    let mut resp = Response::new(Balance::default());
    client
        .send(
            Request::new()
                .with_method(Method::POST)
                .with_path("/sms/send")
                .with_body_reader(std::io::Cursor::new(body.clone()), Some(100)),
            &mut resp,
        )
        .await
        .expect("send must succeed after retry");

    let seen = http.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].body(), &Bytes::from(body.clone()));
    assert_eq!(seen[1].body(), &Bytes::from(body));
    assert_eq!(seen[0].headers(), seen[1].headers());
    assert_eq!(seen[1].headers()[CONTENT_LENGTH], "100");
    assert_eq!(http.closed(), 1);
    assert_eq!(resp.target().balance, 1024);
}

#[tokio::test(start_paused = true)]
async fn test_service_500_is_retried_up_to_max_attempts() {
    let mut http = ScriptedHttpSend::new();
    for _ in 0..4 {
        http = http.respond(500, r#"{"code":500,"message":"internal error"}"#);
    }
    let client = test_client(&http, backoff());

    let start = tokio::time::Instant::now();
    let mut resp = Response::new(Balance::default());
    let err = client.send(Request::new(), &mut resp).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(err.code(), Some(500));
    assert_eq!(http.seen().len(), 4);
    // 300ms + 600ms + 1200ms of backoff.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(2100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2200), "{elapsed:?}");
    assert_eq!(resp.target(), &Balance::default());
}

#[tokio::test(start_paused = true)]
async fn test_request_expired_is_retried() {
    let http = ScriptedHttpSend::new()
        .respond(200, r#"{"code":-2,"message":"request expired"}"#)
        .respond(200, BALANCE_OK);
    let client = test_client(&http, backoff());

    let balance: Balance = client.call(Request::new()).await.unwrap();
    assert_eq!(balance.balance, 1024);
    assert_eq!(http.seen().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_bad_signature_leaves_target_untouched() {
    let http = ScriptedHttpSend::new().respond(400, r#"{"code":400,"message":"bad signature"}"#);
    let client = test_client(&http, NoRetryPolicy);

    let before = Balance {
        balance: 7,
        currency: "CNY".to_string(),
    };
    let mut resp = Response::new(before.clone());
    let err = client
        .send(
            Request::new()
                .with_method(Method::POST)
                .with_body_bytes(r#"{"mobile":"13800000000"}"#),
            &mut resp,
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(err.code(), Some(400));
    assert_eq!(err.message(), "bad signature");
    assert_eq!(resp.target(), &before);
    assert_eq!(resp.status(), Some(http::StatusCode::BAD_REQUEST));
    // Failed upload drops pooled connections.
    assert_eq!(http.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_get_keeps_connections() {
    let http = ScriptedHttpSend::new().respond(404, r#"{"code":404,"message":"not found"}"#);
    let client = test_client(&http, backoff());

    let mut resp = Response::new(Balance::default());
    let err = client.send(Request::new(), &mut resp).await.unwrap_err();
    assert_eq!(err.code(), Some(404));
    assert_eq!(http.seen().len(), 1);
    assert_eq!(http.closed(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_decode_error_is_terminal() {
    let http = ScriptedHttpSend::new()
        .respond(502, "<html>bad gateway</html>")
        .respond(200, BALANCE_OK);
    let client = test_client(&http, backoff());

    let mut resp = Response::new(Balance::default());
    let err = client.send(Request::new(), &mut resp).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(http.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_retries_exhausted() {
    let mut http = ScriptedHttpSend::new();
    for _ in 0..4 {
        http = http.fail(Error::network("connection refused"));
    }
    let client = test_client(&http, backoff());

    let mut resp = Response::new(Balance::default());
    let err = client.send(Request::new(), &mut resp).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RetriesExhausted);
    assert!(err.message().contains("Retried 3 times"), "{}", err.message());
    assert!(err.message().contains("connection refused"));
    assert_eq!(http.seen().len(), 4);
    assert_eq!(http.closed(), 4);
    assert!(resp.raw().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_network_error_without_retry() {
    let http = ScriptedHttpSend::new().fail(Error::network("connection refused"));
    let client = test_client(&http, NoRetryPolicy);

    let err = client
        .call::<Balance>(Request::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RetriesExhausted);
    assert!(err.message().contains("Retried 0 times"));
    assert_eq!(http.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_is_terminal() {
    let http = ScriptedHttpSend::new().fail(Error::request_invalid("builder error"));
    let client = test_client(&http, backoff());

    let err = client.call::<Balance>(Request::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert_eq!(http.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_share_client() {
    let mut http = ScriptedHttpSend::new();
    for _ in 0..8 {
        http = http.respond(200, BALANCE_OK);
    }
    let client = test_client(&http, backoff());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client
                .call::<Balance>(Request::new().with_request_id(format!("req-{i}")))
                .await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().balance, 1024);
    }

    let mut ids: Vec<String> = http
        .seen()
        .iter()
        .map(|r| r.headers()["x-attains-request-id"].to_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
