// tests/relay_tests.rs

use assert_matches::assert_matches;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{Method, Request};
use axum::response::IntoResponse;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dohrelay::config::{HttpClientConfig, UpstreamConfig};
use dohrelay::error::AppError;
use dohrelay::metrics::METRICS;
use dohrelay::relay::{build_router, RelayExchange, Route};
use dohrelay::UpstreamForwarder;
use hickory_proto::{
    op::{Message, MessageType, OpCode, Query, ResponseCode},
    rr::{rdata::A, Name, RData, Record, RecordType},
};
use reqwest::{Client, StatusCode};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::{
    matchers::{any, body_bytes, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

// 构建测试用 DNS 查询
fn build_test_query(domain: &str, record_type: RecordType) -> Vec<u8> {
    let mut query = Message::new();
    query.set_id(0xabcd);
    query.set_message_type(MessageType::Query);
    query.set_op_code(OpCode::Query);
    query.set_recursion_desired(true);

    let name = Name::from_str(&format!("{}.", domain)).unwrap();
    query.add_query(Query::query(name, record_type));

    query.to_vec().unwrap()
}

// 构建测试用 DNS 响应
fn build_test_response(id: u16) -> Vec<u8> {
    let mut response = Message::new();
    response.set_id(id);
    response.set_message_type(MessageType::Response);
    response.set_recursion_desired(true);
    response.set_recursion_available(true);
    response.set_response_code(ResponseCode::NoError);

    let name = Name::from_str("example.com.").unwrap();
    response.add_query(Query::query(name.clone(), RecordType::A));

    let mut record = Record::with(name, RecordType::A, 300);
    record.set_data(Some(RData::A(A(Ipv4Addr::new(93, 184, 216, 34)))));
    response.add_answer(record);

    response.to_vec().unwrap()
}

// 在随机端口上启动中继，返回监听地址
async fn start_relay(upstream_url: String, http_config: HttpClientConfig) -> SocketAddr {
    let forwarder = UpstreamForwarder::new(
        &UpstreamConfig {
            url: upstream_url,
            proxy: None,
        },
        &http_config,
    )
    .unwrap();
    let app = build_router(Arc::new(forwarder), 65535);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn start_relay_for(mock_server: &MockServer) -> SocketAddr {
    start_relay(
        format!("{}/dns-query", mock_server.uri()),
        HttpClientConfig::default(),
    )
    .await
}

// 启动只应答一次的原始 TCP 上游，读完请求头后写回给定字节并关闭连接
async fn start_raw_upstream(reply: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(reply).await.unwrap();
        let _ = stream.shutdown().await;
    });
    addr
}

// 以原始字节向中继发送请求，读取完整响应文本
async fn raw_exchange(relay: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(relay).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn test_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_post_forwarded_byte_identical() {
    let mock_server = MockServer::start().await;
    let query_bytes = build_test_query("example.com", RecordType::A);
    let response_bytes = build_test_response(0xabcd);

    Mock::given(method("POST"))
        .and(path("/dns-query"))
        .and(header("content-type", "application/dns-message"))
        .and(header("accept", "application/dns-message"))
        .and(body_bytes(query_bytes.clone()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/dns-message")
                .set_body_bytes(response_bytes.clone()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;

    let response = test_client()
        .post(format!("http://{}/any/path?ignored=1", relay))
        .header("content-type", "application/octet-stream")
        .header("accept", "*/*")
        .body(query_bytes.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/dns-message"
    );
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert!(response.headers().get("content-length").is_none());

    let body = response.bytes().await.unwrap();
    assert_eq!(body.as_ref(), response_bytes.as_slice());

    // 上游收到的请求不带中继自己的 Host
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let upstream_host = requests[0].headers.get("host").unwrap().to_str().unwrap();
    assert_ne!(upstream_host, relay.to_string());
    assert_eq!(upstream_host, mock_server.address().to_string());
    assert_eq!(requests[0].url.path(), "/dns-query");
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_post_arbitrary_binary_body() {
    let mock_server = MockServer::start().await;
    // 中继不校验 DNS 报文，任意字节都原样转发
    let payload: Vec<u8> = (0..=255u8).rev().collect();

    Mock::given(method("POST"))
        .and(path("/dns-query"))
        .and(body_bytes(payload.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 3]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;

    let response = test_client()
        .post(format!("http://{}/", relay))
        .body(payload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().as_ref(), &[0u8, 1, 2, 3]);
}

#[tokio::test]
async fn test_get_query_string_preserved() {
    let mock_server = MockServer::start().await;
    let dns_param = URL_SAFE_NO_PAD.encode(build_test_query("example.com", RecordType::AAAA));
    let response_bytes = build_test_response(0xabcd);

    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .and(query_param("dns", dns_param.as_str()))
        .and(header("accept", "application/dns-message"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/dns-message")
                .set_body_bytes(response_bytes.clone()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;
    let query = format!("ct=application/dns-message&dns={}&edns=1", dns_param);

    let response = test_client()
        .get(format!("http://{}/dns-query?{}", relay, query))
        .header("accept", "application/dns-json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/dns-message"
    );
    assert_eq!(
        response.bytes().await.unwrap().as_ref(),
        response_bytes.as_slice()
    );

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), Some(query.as_str()));
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_repeated_get_is_not_cached() {
    let mock_server = MockServer::start().await;
    let dns_param = URL_SAFE_NO_PAD.encode(build_test_query("example.org", RecordType::A));

    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(build_test_response(1)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;
    let client = test_client();
    let url = format!("http://{}/?dns={}", relay, dns_param);

    for _ in 0..2 {
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, requests[1].url);
}

#[tokio::test]
async fn test_liveness_never_contacts_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;
    let client = test_client();

    let requests = vec![
        client.get(format!("http://{}/", relay)),
        client.get(format!("http://{}/dns-query", relay)),
        client.get(format!("http://{}/?name=example.com&type=A", relay)),
        client.put(format!("http://{}/?dns=AAAB", relay)),
        client.delete(format!("http://{}/dns-query", relay)),
    ];

    for request in requests {
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.text().await.unwrap(), "DoH Service is Running.");
    }

    assert!(mock_server.received_requests().await.unwrap().is_empty());
    assert!(
        METRICS
            .requests_total()
            .with_label_values(&["liveness"])
            .get()
            >= 5
    );
}

#[tokio::test]
async fn test_upstream_headers_normalized() {
    let mock_server = MockServer::start().await;

    // 上游返回不规范的内容类型与自带的 CORS 头
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/dns-message; charset=binary")
                .insert_header("access-control-allow-origin", "https://example.com")
                .insert_header("cache-control", "max-age=120")
                .set_body_bytes(build_test_response(7)),
        )
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;

    let response = test_client()
        .post(format!("http://{}/dns-query", relay))
        .body(build_test_query("example.com", RecordType::A))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "application/dns-message");
    assert_eq!(headers.get_all("content-type").iter().count(), 1);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["cache-control"], "max-age=120");
    assert!(headers.get("content-length").is_none());
}

#[tokio::test]
async fn test_upstream_status_passthrough() {
    let mock_server = MockServer::start().await;

    // 上游的 HTTP 错误不是传输失败，原样返回
    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("content-type", "text/plain")
                .set_body_string("invalid dns parameter"),
        )
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;

    let response = test_client()
        .get(format!("http://{}/?dns=not-base64!", relay))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()["content-type"],
        "application/dns-message"
    );
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.text().await.unwrap(), "invalid dns parameter");
}

#[tokio::test]
async fn test_upstream_redirect_followed() {
    let mock_server = MockServer::start().await;
    let response_bytes = build_test_response(42);

    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/moved", mock_server.uri()).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(response_bytes.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;

    let response = test_client()
        .get(format!("http://{}/?dns=AAAB", relay))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.bytes().await.unwrap().as_ref(),
        response_bytes.as_slice()
    );
}

#[tokio::test]
async fn test_unreachable_upstream_returns_proxy_error() {
    // 绑定后立即释放端口，确保没有服务在监听
    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = unused.local_addr().unwrap().port();
    drop(unused);

    let relay = start_relay(
        format!("http://127.0.0.1:{}/dns-query", port),
        HttpClientConfig::default(),
    )
    .await;
    let client = test_client();

    let post = client
        .post(format!("http://{}/", relay))
        .body(build_test_query("example.com", RecordType::A))
        .send()
        .await
        .unwrap();
    assert_eq!(post.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(post.text().await.unwrap(), "Proxy Error");

    let get = client
        .get(format!("http://{}/?dns=AAAB", relay))
        .send()
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(get.text().await.unwrap(), "Proxy Error");
}

#[tokio::test]
async fn test_upstream_timeout_returns_proxy_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(build_test_response(1))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let http_config = HttpClientConfig {
        connect_timeout: 1,
        request_timeout: 1,
        ..HttpClientConfig::default()
    };
    let relay = start_relay(format!("{}/dns-query", mock_server.uri()), http_config).await;

    let response = test_client()
        .post(format!("http://{}/", relay))
        .body(build_test_query("slow.example.com", RecordType::A))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.text().await.unwrap(), "Proxy Error");
    assert!(
        METRICS
            .upstream_errors_total()
            .with_label_values(&["timeout"])
            .get()
            >= 1
    );
}

#[tokio::test]
async fn test_oversized_post_rejected_without_upstream_call() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;

    let response = test_client()
        .post(format!("http://{}/", relay))
        .body(vec![0u8; 70_000])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_upstream_reason_phrase_passthrough() {
    let upstream = start_raw_upstream(
        b"HTTP/1.1 200 Fine By Me\r\n\
Content-Type: application/octet-stream\r\n\
Content-Length: 4\r\n\
Connection: close\r\n\
\r\n\
abcd",
    )
    .await;
    let relay = start_relay(
        format!("http://{}/dns-query", upstream),
        HttpClientConfig::default(),
    )
    .await;

    let response = raw_exchange(
        relay,
        b"GET /dns-query?dns=AAAB HTTP/1.1\r\nHost: relay.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(
        response.starts_with("HTTP/1.1 200 Fine By Me\r\n"),
        "unexpected status line: {:?}",
        response.lines().next()
    );
    let lowered = response.to_ascii_lowercase();
    assert!(lowered.contains("content-type: application/dns-message\r\n"));
    assert!(lowered.contains("access-control-allow-origin: *\r\n"));
    assert!(!lowered.contains("content-length: 4\r\n"));
    assert!(response.contains("abcd"));
}

#[tokio::test]
async fn test_truncated_upstream_body_returns_proxy_error() {
    let errors_before = METRICS
        .upstream_errors_total()
        .with_label_values(&["body"])
        .get()
        + METRICS
            .upstream_errors_total()
            .with_label_values(&["request"])
            .get();

    // 声明 100 字节，只发送 4 字节后关闭
    let upstream = start_raw_upstream(
        b"HTTP/1.1 200 OK\r\n\
Content-Type: application/dns-message\r\n\
Content-Length: 100\r\n\
\r\n\
\x12\x34\x81\x80",
    )
    .await;
    let relay = start_relay(
        format!("http://{}/dns-query", upstream),
        HttpClientConfig::default(),
    )
    .await;

    let response = test_client()
        .get(format!("http://{}/dns-query?dns=AAAB", relay))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.text().await.unwrap(), "Proxy Error");

    let errors_after = METRICS
        .upstream_errors_total()
        .with_label_values(&["body"])
        .get()
        + METRICS
            .upstream_errors_total()
            .with_label_values(&["request"])
            .get();
    assert!(errors_after > errors_before);
}

#[tokio::test]
async fn test_client_abort_mid_body_never_reaches_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let relay = start_relay_for(&mock_server).await;

    let mut stream = TcpStream::connect(relay).await.unwrap();
    stream
        .write_all(
            b"POST /dns-query HTTP/1.1\r\n\
Host: relay.test\r\n\
Content-Type: application/dns-message\r\n\
Content-Length: 10\r\n\
\r\n\
\x00\x01",
        )
        .await
        .unwrap();
    // 只关闭写端，请求体缺少 8 字节
    stream.shutdown().await.unwrap();

    let mut response = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response)).await;
    if let Ok(Ok(_)) = read {
        if !response.is_empty() {
            let text = String::from_utf8_lossy(&response);
            assert!(text.starts_with("HTTP/1.1 400"), "unexpected response: {}", text);
        }
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_aborted_post_body_is_bad_request() {
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"\x00\x01")),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "client went away",
        )),
    ];
    let request = Request::builder()
        .method(Method::POST)
        .uri("/dns-query")
        .body(Body::from_stream(futures_util::stream::iter(chunks)))
        .unwrap();

    let result = RelayExchange::from_request(Route::Post, request).await;
    let err = result.unwrap_err();
    assert_matches!(err, AppError::BadRequest(_));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), b"Bad Request");
}

#[tokio::test]
async fn test_failed_relay_counts_toward_request_duration() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let http_config = HttpClientConfig {
        connect_timeout: 1,
        request_timeout: 1,
        ..HttpClientConfig::default()
    };
    let relay = start_relay(format!("{}/dns-query", mock_server.uri()), http_config).await;

    let histogram = METRICS
        .request_duration_seconds()
        .with_label_values(&["get"]);
    let sum_before = histogram.get_sample_sum();

    let response = test_client()
        .get(format!("http://{}/dns-query?dns=AAAB", relay))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    // 超时请求至少耗时接近 1 秒
    assert!(histogram.get_sample_sum() - sum_before >= 0.9);
}
