//! Benchmarks for session header and control frame parsing.

use bytes::BytesMut;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use edgerelay_proto::{
    AddressRef, CMD_CONNECT, ControlFrame, HostRef, IDENTITY_LEN, parse_request, parse_target,
    write_request_header,
};

const IDENTITY: [u8; IDENTITY_LEN] = [0x42; IDENTITY_LEN];

fn header_with(host: HostRef<'_>) -> BytesMut {
    let addr = AddressRef { host, port: 443 };
    let mut buf = BytesMut::new();
    write_request_header(&mut buf, 0, &IDENTITY, b"", CMD_CONNECT, &addr).unwrap();
    buf.extend_from_slice(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");
    buf
}

fn bench_parse_request(c: &mut Criterion) {
    let ipv4 = header_with(HostRef::Ipv4([1, 2, 3, 4])).freeze();
    let ipv6 = header_with(HostRef::Ipv6([9; 16])).freeze();
    let domain = header_with(HostRef::Domain(b"example.com")).freeze();

    c.bench_function("parse_request_ipv4", |b| {
        b.iter(|| parse_request(black_box(&ipv4)))
    });
    c.bench_function("parse_request_ipv6", |b| {
        b.iter(|| parse_request(black_box(&ipv6)))
    });
    c.bench_function("parse_request_domain", |b| {
        b.iter(|| parse_request(black_box(&domain)))
    });
}

fn bench_identity_string(c: &mut Criterion) {
    let frame = header_with(HostRef::Ipv4([1, 2, 3, 4])).freeze();
    c.bench_function("identity_string", |b| {
        b.iter(|| match parse_request(black_box(&frame)) {
            edgerelay_proto::ParseResult::Complete(req) => req.identity_string(),
            _ => unreachable!(),
        })
    });
}

fn bench_control(c: &mut Criterion) {
    c.bench_function("control_connect", |b| {
        b.iter(|| match ControlFrame::parse(black_box("CONNECT:[2001:db8::1]:443|hello")) {
            ControlFrame::Connect { target, .. } => parse_target(target).ok(),
            _ => None,
        })
    });
    c.bench_function("control_data", |b| {
        b.iter(|| ControlFrame::parse(black_box("DATA:payload bytes here")))
    });
}

criterion_group!(
    benches,
    bench_parse_request,
    bench_identity_string,
    bench_control
);
criterion_main!(benches);
