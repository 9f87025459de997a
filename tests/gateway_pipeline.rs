//! End-to-end tests for the gateway pipeline: routing, filters, body peek,
//! throttling, and error responses, all over real sockets.

use std::time::Duration;

use peekway::routing::{RouteTable, Routes};

mod common;

fn sample_table(backend: std::net::SocketAddr) -> RouteTable {
    let uri = format!("http://{backend}");
    Routes::builder()
        .route(|r| {
            r.host("**.abc.org")
                .path("/image/png")
                .add_response_header("X-TestHeader", "foobar")
                .uri(&uri)
        })
        .route(|r| {
            r.id("read_body_pred")
                .host("*.readbody.org")
                .read_body(|body| body.trim().eq_ignore_ascii_case("hello"))
                .add_request_header("X-TestHeader", "read_body_pred")
                .uri(&uri)
        })
        .route(|r| {
            r.path("/image/webp")
                .add_response_header("X-AnotherHeader", "baz")
                .uri(&uri)
        })
        .route(|r| {
            r.order(-1)
                .host("**.throttle.org")
                .path("/get")
                .throttle(1, 1, Duration::from_secs(10))
                .uri(&uri)
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn matched_route_adds_response_header_and_no_other_filters_run() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(sample_table(backend)).await;

    let response = common::send_request(
        gateway,
        "GET /image/png HTTP/1.1\r\nHost: www.abc.org\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("x-testheader: foobar"), "{response}");
    // The /image/webp route's filter must not have run.
    assert!(!response.contains("x-anotherheader"), "{response}");
}

#[tokio::test]
async fn unmatched_request_gets_not_found() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(sample_table(backend)).await;

    let response = common::send_request(
        gateway,
        "GET /unmapped HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 404"), "{response}");
    assert!(response.contains("No matching route found"), "{response}");
}

#[tokio::test]
async fn throttle_admits_then_denies() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(sample_table(backend)).await;
    let request = "GET /get HTTP/1.1\r\nHost: www.throttle.org\r\nConnection: close\r\n\r\n";

    let first = common::send_request(gateway, request).await;
    assert!(first.starts_with("HTTP/1.1 200"), "{first}");

    let second = common::send_request(gateway, request).await;
    assert!(second.starts_with("HTTP/1.1 429"), "{second}");
    assert!(second.contains("Rate limit exceeded"), "{second}");
}

#[tokio::test]
async fn body_peek_matches_and_replays_the_body_upstream() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(sample_table(backend)).await;

    let body = " hello \n";
    let request = format!(
        "POST /post HTTP/1.1\r\nHost: www.readbody.org\r\nContent-Type: text/plain\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let response = common::send_request(gateway, request).await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    // The request-phase filter ran and the echoed request shows it.
    assert!(response.contains("x-testheader: read_body_pred"), "{response}");
    // The peeked body reached the backend intact.
    assert!(response.ends_with(body), "{response}");
}

#[tokio::test]
async fn body_peek_non_match_falls_through_to_not_found() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(sample_table(backend)).await;

    let body = "goodbye";
    let request = format!(
        "POST /post HTTP/1.1\r\nHost: www.readbody.org\r\nContent-Type: text/plain\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let response = common::send_request(gateway, request).await;

    assert!(response.starts_with("HTTP/1.1 404"), "{response}");
}

#[tokio::test]
async fn undecodable_body_is_a_bad_request() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(sample_table(backend)).await;

    let mut request = Vec::from(
        "POST /post HTTP/1.1\r\nHost: www.readbody.org\r\nContent-Type: text/plain\r\n\
         Content-Length: 3\r\nConnection: close\r\n\r\n"
            .as_bytes(),
    );
    request.extend_from_slice(&[0xff, 0xfe, 0xfd]);
    let response = common::send_request(gateway, request).await;

    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
}

#[tokio::test]
async fn local_testfun_route_answers_without_proxying() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(sample_table(backend)).await;

    let response = common::send_request(
        gateway,
        "GET /testfun HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("hello"), "{response}");
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    // Point a route at a port nothing listens on.
    let dead = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let table = Routes::builder()
        .route(|r| r.host("**.abc.org").uri(format!("http://{dead}")))
        .build()
        .unwrap();
    let gateway = common::start_gateway(table).await;

    let response = common::send_request(
        gateway,
        "GET / HTTP/1.1\r\nHost: www.abc.org\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 502"), "{response}");
    assert!(response.contains("Upstream request failed"), "{response}");
}
