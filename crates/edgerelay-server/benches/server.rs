//! Benchmarks for edgerelay-server hot paths.

use std::hint::black_box;
use std::io;

use criterion::{Criterion, criterion_group, criterion_main};
use edgerelay_config::{RetryConfig, WebSocketConfig};
use edgerelay_server::RetryPolicy;
use edgerelay_server::ws::inspect_request;

fn sample_ws_config() -> WebSocketConfig {
    WebSocketConfig {
        path: "/tunnel".to_string(),
        host: Some("relay.example.com".to_string()),
        ..WebSocketConfig::default()
    }
}

fn sample_upgrade_request() -> Vec<u8> {
    b"GET /tunnel?ed=2048 HTTP/1.1\r\n\
Host: relay.example.com\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\
Sec-WebSocket-Protocol: 550e8400-e29b-41d4-a716-446655440000\r\n\
\r\n"
        .to_vec()
}

fn sample_http_request() -> Vec<u8> {
    b"GET / HTTP/1.1\r\n\
Host: relay.example.com\r\n\
User-Agent: Mozilla/5.0\r\n\
Accept: text/html\r\n\
\r\n"
        .to_vec()
}

fn bench_inspect(c: &mut Criterion) {
    let cfg = sample_ws_config();
    let upgrade = sample_upgrade_request();
    let plain = sample_http_request();
    let partial = &upgrade[..upgrade.len() / 2];

    let mut group = c.benchmark_group("inspect_request");
    group.bench_function("upgrade", |b| {
        b.iter(|| black_box(inspect_request(black_box(&upgrade), black_box(&cfg))))
    });
    group.bench_function("plain_http", |b| {
        b.iter(|| black_box(inspect_request(black_box(&plain), black_box(&cfg))))
    });
    group.bench_function("need_more", |b| {
        b.iter(|| black_box(inspect_request(black_box(partial), black_box(&cfg))))
    });
    group.finish();
}

fn bench_retry_policy(c: &mut Criterion) {
    let policy = RetryPolicy::from_config(&RetryConfig::default());
    let by_kind = io::Error::from(io::ErrorKind::ConnectionRefused);
    let by_message = io::Error::other("proxy request failed, cannot connect to the specified address");
    let terminal = io::Error::other("tls handshake failure: bad certificate");

    let mut group = c.benchmark_group("retry_policy");
    group.bench_function("kind_match", |b| {
        b.iter(|| black_box(policy.is_retryable(black_box(&by_kind))))
    });
    group.bench_function("message_match", |b| {
        b.iter(|| black_box(policy.is_retryable(black_box(&by_message))))
    });
    group.bench_function("no_match", |b| {
        b.iter(|| black_box(policy.is_retryable(black_box(&terminal))))
    });
    group.finish();
}

criterion_group!(benches, bench_inspect, bench_retry_policy);
criterion_main!(benches);
