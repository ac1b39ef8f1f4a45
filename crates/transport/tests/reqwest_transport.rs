use std::time::Duration;

use precognition::{
    CancellationToken, Client, Headers, Method, Outcome, PrecognitionError, RequestConfig,
    Transport, TransportError, TransportRequest,
};
use serde_json::{json, Value};
use transport::ReqwestTransport;
use wiremock::matchers::{body_json, header, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(method: Method, url: &str) -> TransportRequest {
    TransportRequest {
        method,
        url: url.to_owned(),
        base_url: None,
        data: None,
        headers: Headers::new(),
        fingerprint: None,
        signal: None,
        cancel_token: None,
        on_start: None,
        on_finish: None,
    }
}

fn transport_for(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::builder()
        .base_url(server.uri())
        .build()
        .expect("client builds")
}

#[tokio::test]
async fn sends_headers_and_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("Precognition", "true"))
        .and(header("Precognition-Validate-Only", "name"))
        .and(body_json(json!({ "name": "Taylor" })))
        .respond_with(ResponseTemplate::new(204).insert_header("Precognition", "true"))
        .expect(1)
        .mount(&server)
        .await;

    let mut req = request(Method::Post, "/users");
    req.data = Some(json!({ "name": "Taylor" }));
    req.headers.insert("Precognition", "true");
    req.headers.insert("Precognition-Validate-Only", "name");

    let response = transport_for(&server).send(req).await.expect("2xx resolves");

    assert_eq!(response.status, 204);
    assert_eq!(response.data, Value::Null);
    assert!(response.is_precognitive());
}

#[tokio::test]
async fn non_success_status_rejects_with_decoded_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(422)
                .insert_header("Precognition", "true")
                .set_body_json(json!({ "errors": { "name": ["required"] } })),
        )
        .mount(&server)
        .await;

    let error = transport_for(&server)
        .send(request(Method::Post, "/users"))
        .await
        .unwrap_err();

    match error {
        TransportError::Status { response } => {
            assert_eq!(response.status, 422);
            assert!(response.is_precognitive());
            assert_eq!(response.data, json!({ "errors": { "name": ["required"] } }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn request_base_url_overrides_default() {
    let default_server = MockServer::start().await;
    let override_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("override"))
        .expect(1)
        .mount(&override_server)
        .await;

    let mut req = request(Method::Get, "/docs");
    req.base_url = Some(override_server.uri());

    let response = transport_for(&default_server).send(req).await.unwrap();

    assert_eq!(response.data, json!("override"));
}

#[tokio::test]
async fn fired_signal_cancels_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let signal = CancellationToken::new();
    let mut req = request(Method::Get, "/slow");
    req.signal = Some(signal.clone());

    let transport = transport_for(&server);
    let in_flight = tokio::spawn(async move { transport.send(req).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    signal.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), in_flight)
        .await
        .expect("cancellation is prompt")
        .expect("task completes");
    assert!(matches!(result, Err(TransportError::Cancelled)));
}

#[tokio::test]
async fn cancelled_cancel_token_short_circuits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let mut req = request(Method::Get, "/docs");
    req.cancel_token = Some(token);

    let result = transport_for(&server).send(req).await;

    assert!(matches!(result, Err(TransportError::Cancelled)));
}

#[tokio::test]
async fn unresolvable_url_is_a_network_error() {
    let transport = ReqwestTransport::builder().build().unwrap();

    let result = transport.send(request(Method::Get, "/no-base-url")).await;

    assert!(matches!(result, Err(TransportError::Network { .. })));
}

#[tokio::test]
async fn client_dispatches_validation_errors_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("Precognition", "true"))
        .and(headers("Precognition-Validate-Only", vec!["members", "members.0", "members.0.name"]))
        .respond_with(
            ResponseTemplate::new(422)
                .insert_header("precognition", "true")
                .set_body_json(json!({ "errors": { "members.0.name": ["required"] } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(transport_for(&server));
    client.auto_validate_parent_keys(true);

    let outcome = client
        .post(
            "/users",
            json!({ "members": [{ "name": "" }] }),
            RequestConfig::new()
                .validate(["members.0.name"])
                .on_validation_error(|response, error| async move {
                    assert!(error.is_some());
                    Ok(Outcome::Value(response.data["errors"].clone()))
                }),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Value(json!({ "members.0.name": ["required"] }))
    );
}

#[tokio::test]
async fn client_rejects_endpoints_without_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let client = Client::new(transport_for(&server));
    let error = client.get("/docs", RequestConfig::new()).await.unwrap_err();

    assert!(matches!(error, PrecognitionError::ProtocolViolation { .. }));
}

#[tokio::test]
async fn client_exposes_transport_base_url() {
    let server = MockServer::start().await;
    let client = Client::new(transport_for(&server));

    assert_eq!(client.transport().base_url(), Some(server.uri().as_str()));
}
