use serde_json::{Value, json};
use std::time::Duration;
use unrelated_mockserver_client::model::{
    BodyMatcher, ClearScope, Expectation, JsonMatchType, RequestMatcher, ResponseBody,
    ResponseSpec, VerificationTimes,
};
use unrelated_mockserver_client::{ClientConfig, ErrorKind, MockServerClient, MockServerError};
use unrelated_test_support::{FakeMockServer, RawPeer, pick_unused_port};

fn client_for(server: &FakeMockServer) -> MockServerClient {
    MockServerClient::new(ClientConfig::new(server.host(), server.port())).expect("client")
}

fn get_test_matcher() -> RequestMatcher {
    RequestMatcher {
        method: Some("GET".to_string()),
        path: Some("/test".to_string()),
        ..RequestMatcher::default()
    }
}

/// Runs every operation that propagates all failures, returning the error kinds.
async fn propagating_operation_errors(
    client: &MockServerClient,
) -> Vec<(&'static str, MockServerError)> {
    let matcher = get_test_matcher();
    let expectation = Expectation {
        http_request: matcher.clone(),
        ..Expectation::default()
    };

    let mut out = Vec::new();
    if let Err(e) = client.create_expectation(&expectation).await {
        out.push(("create_expectation", e));
    }
    if let Err(e) = client.verify(&matcher, None).await {
        out.push(("verify", e));
    }
    if let Err(e) = client.clear(None).await {
        out.push(("clear", e));
    }
    if let Err(e) = client.reset().await {
        out.push(("reset", e));
    }
    if let Err(e) = client.retrieve_recorded_requests(None).await {
        out.push(("retrieve_recorded_requests", e));
    }
    out
}

#[tokio::test]
async fn create_expectation_puts_expectation_verbatim() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/expectation", 201, "");
    let client = client_for(&server);

    let raw = json!({
        "httpRequest": {
            "method": "GET",
            "path": "/test",
            "queryStringParameters": {"sort": ["name", "asc"]}
        },
        "httpResponse": {"statusCode": 200, "body": "OK"}
    });
    let expectation: Expectation = serde_json::from_value(raw.clone()).expect("expectation");
    assert_eq!(
        expectation.http_response.as_ref().and_then(|r| r.body.clone()),
        Some(ResponseBody::Text("OK".to_string()))
    );

    client
        .create_expectation(&expectation)
        .await
        .expect("create_expectation");

    let reqs = server.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].method, "PUT");
    assert_eq!(reqs[0].path, "/mockserver/expectation");
    assert_eq!(reqs[0].query, None);
    assert_eq!(reqs[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(reqs[0].json(), raw);
}

#[tokio::test]
async fn create_expectation_accepts_non_json_success_body() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/expectation", 201, "created");
    let client = client_for(&server);

    let expectation = Expectation {
        http_request: RequestMatcher {
            path: Some("/orders".to_string()),
            body: Some(BodyMatcher::Json {
                json: json!({"id": 1}),
                match_type: Some(JsonMatchType::Strict),
            }),
            ..RequestMatcher::default()
        },
        http_response: Some(ResponseSpec {
            status_code: Some(201),
            body: Some(ResponseBody::Json(json!({"ok": true}))),
            ..ResponseSpec::default()
        }),
        ..Expectation::default()
    };
    client
        .create_expectation(&expectation)
        .await
        .expect("create_expectation");

    let sent = server.requests_to("/mockserver/expectation")[0].json();
    assert_eq!(
        sent["httpRequest"]["body"],
        json!({"type": "JSON", "json": {"id": 1}, "matchType": "STRICT"})
    );
    assert_eq!(sent["httpResponse"]["body"], json!({"ok": true}));
}

#[tokio::test]
async fn create_expectation_surfaces_remote_error_with_status_and_body() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond(
        "/mockserver/expectation",
        400,
        "incorrect expectation json format",
    );
    let client = client_for(&server);

    let err = client
        .create_expectation(&Expectation::default())
        .await
        .expect_err("400 must fail");
    assert_eq!(
        err,
        MockServerError::Remote {
            status: 400,
            body: "incorrect expectation json format".to_string()
        }
    );
    assert_eq!(err.kind(), ErrorKind::RemoteError);
}

#[tokio::test]
async fn verify_without_times_reports_one_match() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/verify", 202, "");
    let client = client_for(&server);

    let result = client
        .verify(&get_test_matcher(), None)
        .await
        .expect("verify");
    assert!(result.success);
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.message, None);

    let sent = server.requests_to("/mockserver/verify")[0].json();
    assert_eq!(
        sent,
        json!({
            "httpRequest": {"method": "GET", "path": "/test"},
            "times": {"atLeast": 1}
        })
    );
}

#[tokio::test]
async fn verify_exactly_reports_requested_count() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/verify", 202, "");
    let client = client_for(&server);

    let result = client
        .verify(&get_test_matcher(), Some(VerificationTimes::exactly(3)))
        .await
        .expect("verify");
    // The count comes from the request: MockServer does not report one.
    assert!(result.success);
    assert_eq!(result.matched_count, 3);

    let sent = server.requests_to("/mockserver/verify")[0].json();
    assert_eq!(sent["times"], json!({"atLeast": 3, "atMost": 3}));
}

#[tokio::test]
async fn verify_406_is_a_negative_result() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/verify", 406, "Request not matched");
    let client = client_for(&server);

    let result = client
        .verify(&get_test_matcher(), Some(VerificationTimes::at_least(2)))
        .await
        .expect("406 must not raise");
    assert!(!result.success);
    // Known precision loss: MockServer does not say how many requests matched.
    assert_eq!(result.matched_count, 0);
    let message = result.message.expect("message");
    assert!(message.contains("Verification failed"));
    assert!(message.contains("Request not matched"));
}

#[tokio::test]
async fn verify_other_failure_status_propagates() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/verify", 400, "bad verification json");
    let client = client_for(&server);

    let err = client
        .verify(&get_test_matcher(), None)
        .await
        .expect_err("400 must fail");
    assert_eq!(err.kind(), ErrorKind::RemoteError);
}

#[tokio::test]
async fn non_verify_endpoints_treat_406_as_remote_error() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/clear", 406, "nope");
    let client = client_for(&server);

    let err = client.clear(None).await.expect_err("406 must fail");
    assert_eq!(err.kind(), ErrorKind::RemoteError);
}

#[tokio::test]
async fn clear_sends_matcher_or_empty_object() {
    let server = FakeMockServer::start().await.expect("fake server");
    let client = client_for(&server);

    client.clear(None).await.expect("clear all");
    let matcher = RequestMatcher {
        path: Some("/test".to_string()),
        ..RequestMatcher::default()
    };
    client.clear(Some(&matcher)).await.expect("clear matching");

    let reqs = server.requests_to("/mockserver/clear");
    assert_eq!(reqs.len(), 2);
    assert_eq!(reqs[0].json(), json!({}));
    assert_eq!(reqs[0].query, None);
    assert_eq!(reqs[1].json(), json!({"httpRequest": {"path": "/test"}}));
}

#[tokio::test]
async fn clear_scoped_sends_type_hint() {
    let server = FakeMockServer::start().await.expect("fake server");
    let client = client_for(&server);

    client
        .clear_scoped(None, ClearScope::Log)
        .await
        .expect("clear log");
    let reqs = server.requests_to("/mockserver/clear");
    assert_eq!(reqs[0].query.as_deref(), Some("type=LOG"));
    assert_eq!(reqs[0].json(), json!({}));
}

#[tokio::test]
async fn reset_twice_sends_two_identical_requests() {
    let server = FakeMockServer::start().await.expect("fake server");
    let client = client_for(&server);

    client.reset().await.expect("first reset");
    client.reset().await.expect("second reset");

    let reqs = server.requests_to("/mockserver/reset");
    assert_eq!(reqs.len(), 2);
    for r in &reqs {
        assert_eq!(r.method, "PUT");
        assert_eq!(r.json(), json!({}));
    }
}

#[tokio::test]
async fn retrieve_recorded_requests_empty_array_is_empty_list() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/retrieve", 200, "[]");
    let client = client_for(&server);

    let recorded = client
        .retrieve_recorded_requests(None)
        .await
        .expect("retrieve");
    assert!(recorded.is_empty());

    let reqs = server.requests_to("/mockserver/retrieve");
    assert_eq!(reqs[0].query.as_deref(), Some("type=REQUESTS"));
    assert_eq!(reqs[0].json(), json!({}));
}

#[tokio::test]
async fn retrieve_recorded_requests_empty_body_is_empty_list() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/retrieve", 200, "");
    let client = client_for(&server);

    let recorded = client
        .retrieve_recorded_requests(Some(&get_test_matcher()))
        .await
        .expect("retrieve");
    assert!(recorded.is_empty());
    assert_eq!(
        server.requests_to("/mockserver/retrieve")[0].json(),
        json!({"httpRequest": {"method": "GET", "path": "/test"}})
    );
}

#[tokio::test]
async fn retrieve_recorded_requests_returns_records_verbatim() {
    let server = FakeMockServer::start().await.expect("fake server");
    let records = json!([
        {
            "method": "GET",
            "path": "/test",
            "queryStringParameters": {"sort": ["name", "asc"]},
            "headers": {"Host": ["localhost:1080"]},
            "keepAlive": true
        },
        {
            "method": "POST",
            "path": "/orders",
            "body": {"type": "JSON", "json": {"id": 7}},
            "timestamp": "2024-01-01T00:00:00.000Z"
        }
    ]);
    server.respond("/mockserver/retrieve", 200, records.to_string());
    let client = client_for(&server);

    let recorded = client
        .retrieve_recorded_requests(None)
        .await
        .expect("retrieve");
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[1].path.as_deref(), Some("/orders"));
    assert_eq!(
        serde_json::to_value(&recorded).expect("serialize"),
        records
    );
}

#[tokio::test]
async fn retrieve_recorded_requests_rejects_non_list_body() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/retrieve", 200, "<html>not json</html>");
    let client = client_for(&server);

    let err = client
        .retrieve_recorded_requests(None)
        .await
        .expect_err("malformed body");
    assert_eq!(err.kind(), ErrorKind::UnknownError);
}

#[tokio::test]
async fn retrieve_active_expectations_sends_type_hint() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond(
        "/mockserver/retrieve",
        200,
        json!([{
            "id": "abc",
            "priority": 0,
            "httpRequest": {"path": "/test"},
            "httpResponse": {"statusCode": 200},
            "times": {"unlimited": true},
            "timeToLive": {"timeUnit": "SECONDS", "timeToLive": 60, "unlimited": false}
        }])
        .to_string(),
    );
    let client = client_for(&server);

    let active = client
        .retrieve_active_expectations(None)
        .await
        .expect("retrieve");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id.as_deref(), Some("abc"));
    assert_eq!(
        server.requests_to("/mockserver/retrieve")[0].query.as_deref(),
        Some("type=ACTIVE_EXPECTATIONS")
    );
}

#[tokio::test]
async fn status_reports_version_when_reachable() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond(
        "/mockserver/status",
        200,
        json!({"version": "5.15.0", "ports": [1080]}).to_string(),
    );
    let client = client_for(&server);

    let status = client.status().await.expect("status");
    assert!(status.reachable);
    assert_eq!(status.host, server.host());
    assert_eq!(status.port, server.port());
    assert_eq!(status.version.as_deref(), Some("5.15.0"));
    assert_eq!(status.ports, vec![1080]);
    assert_eq!(server.requests_to("/mockserver/status")[0].json(), json!({}));
}

#[tokio::test]
async fn status_is_not_reachable_when_connection_refused() {
    let port = pick_unused_port().expect("port");
    let client = MockServerClient::new(ClientConfig::new("127.0.0.1", port)).expect("client");

    let status = client.status().await.expect("status must not raise");
    assert!(!status.reachable);
    assert_eq!(status.host, "127.0.0.1");
    assert_eq!(status.port, port);
    assert_eq!(status.version, None);
}

#[tokio::test]
async fn status_is_not_reachable_on_timeout() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond_after("/mockserver/status", 200, "{}", Duration::from_secs(5));
    let client = MockServerClient::new(
        ClientConfig::new(server.host(), server.port()).with_timeout(Duration::from_millis(200)),
    )
    .expect("client");

    let status = client.status().await.expect("status must not raise");
    assert!(!status.reachable);
}

#[tokio::test]
async fn status_propagates_remote_errors() {
    let server = FakeMockServer::start().await.expect("fake server");
    server.respond("/mockserver/status", 500, "boom");
    let client = client_for(&server);

    let err = client.status().await.expect_err("500 must fail");
    assert_eq!(
        err,
        MockServerError::Remote {
            status: 500,
            body: "boom".to_string()
        }
    );
}

#[tokio::test]
async fn connection_refused_is_connection_failed_for_every_operation() {
    let port = pick_unused_port().expect("port");
    let client = MockServerClient::new(ClientConfig::new("127.0.0.1", port)).expect("client");
    let base_url = format!("http://127.0.0.1:{port}");

    let errors = propagating_operation_errors(&client).await;
    assert_eq!(errors.len(), 5, "every operation must fail: {errors:?}");
    for (op, err) in errors {
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed, "{op}: {err}");
        assert_eq!(
            err.details().get("baseUrl"),
            Some(&Value::String(base_url.clone())),
            "{op}"
        );
    }
}

#[tokio::test]
async fn expired_budget_is_connection_timeout_for_every_operation() {
    let server = FakeMockServer::start().await.expect("fake server");
    for path in [
        "/mockserver/expectation",
        "/mockserver/verify",
        "/mockserver/clear",
        "/mockserver/reset",
        "/mockserver/retrieve",
    ] {
        server.respond_after(path, 200, "", Duration::from_secs(5));
    }
    let client = MockServerClient::new(
        ClientConfig::new(server.host(), server.port()).with_timeout(Duration::from_millis(150)),
    )
    .expect("client");

    let errors = propagating_operation_errors(&client).await;
    assert_eq!(errors.len(), 5, "every operation must fail: {errors:?}");
    for (op, err) in errors {
        assert_eq!(err.kind(), ErrorKind::ConnectionTimeout, "{op}: {err}");
        assert_eq!(err.details().get("timeoutMs"), Some(&json!(150)), "{op}");
    }
}

#[tokio::test]
async fn non_http_reply_is_unknown_error_not_connection_failure() {
    let peer = RawPeer::start(&b"THIS IS NOT HTTP AT ALL\r\n\r\n"[..])
        .await
        .expect("raw peer");
    let client = MockServerClient::new(ClientConfig::new(peer.host(), peer.port())).expect("client");

    let err = client.reset().await.expect_err("garbage reply must fail");
    assert_eq!(err.kind(), ErrorKind::UnknownError, "{err}");

    let err = client
        .status()
        .await
        .expect_err("a peer that answered is not unreachable");
    assert_eq!(err.kind(), ErrorKind::UnknownError, "{err}");
}

#[tokio::test]
async fn unreadable_error_body_is_replaced_by_placeholder() {
    let peer = RawPeer::start(
        &b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 64\r\n\r\npartial"[..],
    )
    .await
    .expect("raw peer");
    let client = MockServerClient::new(ClientConfig::new(peer.host(), peer.port())).expect("client");

    let err = client.reset().await.expect_err("500 must fail");
    assert_eq!(
        err,
        MockServerError::Remote {
            status: 500,
            body: "<unreadable response body>".to_string()
        }
    );
}
