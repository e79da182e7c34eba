//! Tunnel session wire formats.
//!
//! Two protocols share one channel:
//! - the binary request header carried in the first binary frame
//!   (see [`parse_request`]), answered with a 2-byte acknowledgment;
//! - the line-oriented text grammar in [`control`].
//!
//! Parsers borrow from the input frame and never allocate.

pub mod control;

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::BytesMut;
use uuid::Uuid;

pub use control::{
    CLOSE, CONNECTED, ControlFrame, ERROR_PREFIX, TargetError, error_message, parse_target,
};

pub const IDENTITY_LEN: usize = 16;

pub const CMD_CONNECT: u8 = 0x01;

pub const ATYP_IPV4: u8 = 0x01;
pub const ATYP_DOMAIN: u8 = 0x02;
pub const ATYP_IPV6: u8 = 0x03;

/// Maximum domain name length.
pub const MAX_DOMAIN_LEN: usize = 255;
/// Maximum addon length (single length byte).
pub const MAX_ADDON_LEN: usize = 255;

/// Status byte of the acknowledgment frame. Identical on accept and reject.
pub const ACK_STATUS: u8 = 0x00;

/// Offset of the fixed-size prefix: version + identity + addon length.
const PREFIX_LEN: usize = 1 + IDENTITY_LEN + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported command {0:#04x}")]
    InvalidCommand(u8),
    #[error("unsupported address type {0:#04x}")]
    InvalidAtyp(u8),
    #[error("empty domain name")]
    InvalidDomainLen,
    #[error("domain name is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors that can occur when writing protocol data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    #[error("domain name exceeds 255 bytes")]
    DomainTooLong,
    #[error("addon exceeds 255 bytes")]
    AddonTooLong,
}

/// Parse result for incremental parsing.
///
/// - `Complete(T)` - parsing succeeded, contains the parsed value.
/// - `Incomplete(n)` - buffer too small; `n` is the **minimum total bytes** needed.
///   Frames are delivered whole, so callers treat this as truncation.
/// - `Invalid(e)` - protocol violation, the session must be aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult<T> {
    Complete(T),
    Incomplete(usize),
    Invalid(ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRef<'a> {
    Ipv4([u8; 4]),
    Ipv6([u8; 16]),
    /// Validated UTF-8.
    Domain(&'a [u8]),
}

impl<'a> HostRef<'a> {
    /// Classifies a host literal: IP literals become raw addresses, anything
    /// else is treated as a domain name.
    pub fn from_literal(host: &'a str) -> Self {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return HostRef::Ipv4(ip.octets());
        }
        if let Ok(ip) = host.parse::<Ipv6Addr>() {
            return HostRef::Ipv6(ip.octets());
        }
        HostRef::Domain(host.as_bytes())
    }

    /// Text form used for dialing and logging.
    ///
    /// IPv6 renders as 8 colon-separated lowercase hex groups, without
    /// zero compression or padding.
    pub fn render(&self) -> String {
        match self {
            HostRef::Ipv4(ip) => Ipv4Addr::from(*ip).to_string(),
            HostRef::Ipv6(ip) => ip
                .chunks_exact(2)
                .map(|g| format!("{:x}", u16::from_be_bytes([g[0], g[1]])))
                .collect::<Vec<_>>()
                .join(":"),
            HostRef::Domain(d) => String::from_utf8_lossy(d).into_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRef<'a> {
    pub host: HostRef<'a>,
    pub port: u16,
}

impl AddressRef<'_> {
    pub fn to_destination(&self) -> Destination {
        Destination {
            host: self.host.render(),
            port: self.port,
        }
    }
}

/// Owned destination decoded from either protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub host: String,
    pub port: u16,
}

impl Destination {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader<'a> {
    pub version: u8,
    pub identity: [u8; IDENTITY_LEN],
    pub command: u8,
    pub address: AddressRef<'a>,
    pub header_len: usize,
    /// Inline first payload: every byte after the header.
    pub payload: &'a [u8],
}

impl RequestHeader<'_> {
    pub fn identity_string(&self) -> String {
        identity_string(&self.identity)
    }
}

/// Canonical hyphenated lowercase form of a 16-byte identity.
pub fn identity_string(identity: &[u8; IDENTITY_LEN]) -> String {
    Uuid::from_bytes(*identity).hyphenated().to_string()
}

/// Acknowledgment frame sent after authorization, on both outcomes.
#[inline]
pub fn ack_frame(version: u8) -> [u8; 2] {
    [version, ACK_STATUS]
}

/// Parses the binary request header.
///
/// Layout: `version | identity:16 | addon_len | addon | command | port:be16 |
/// atyp | address | payload`. Fields are consumed strictly left to right and
/// the first failure wins.
#[inline]
pub fn parse_request(buf: &[u8]) -> ParseResult<RequestHeader<'_>> {
    if buf.len() < PREFIX_LEN {
        return ParseResult::Incomplete(PREFIX_LEN);
    }
    let version = buf[0];
    let mut identity = [0u8; IDENTITY_LEN];
    identity.copy_from_slice(&buf[1..1 + IDENTITY_LEN]);
    let addon_len = buf[PREFIX_LEN - 1] as usize;
    let mut offset = PREFIX_LEN + addon_len;

    // command + port + atyp
    if buf.len() < offset + 4 {
        return ParseResult::Incomplete(offset + 4);
    }
    let command = buf[offset];
    if command != CMD_CONNECT {
        return ParseResult::Invalid(ParseError::InvalidCommand(command));
    }
    let port = read_u16(&buf[offset + 1..offset + 3]);
    let atyp = buf[offset + 3];
    offset += 4;

    let (host, host_len) = match parse_host(atyp, &buf[offset..]) {
        ParseResult::Complete(v) => v,
        ParseResult::Incomplete(n) => return ParseResult::Incomplete(offset + n),
        ParseResult::Invalid(e) => return ParseResult::Invalid(e),
    };
    offset += host_len;

    ParseResult::Complete(RequestHeader {
        version,
        identity,
        command,
        address: AddressRef { host, port },
        header_len: offset,
        payload: &buf[offset..],
    })
}

/// Writes a binary request header (without payload) to the buffer.
///
/// # Errors
/// - `AddonTooLong` if `addon` is longer than 255 bytes.
/// - `DomainTooLong` if the address is a domain longer than 255 bytes.
#[allow(clippy::cast_possible_truncation)]
pub fn write_request_header(
    buf: &mut BytesMut,
    version: u8,
    identity: &[u8; IDENTITY_LEN],
    addon: &[u8],
    command: u8,
    address: &AddressRef<'_>,
) -> Result<(), WriteError> {
    if addon.len() > MAX_ADDON_LEN {
        return Err(WriteError::AddonTooLong);
    }
    if let HostRef::Domain(d) = &address.host
        && d.len() > MAX_DOMAIN_LEN
    {
        return Err(WriteError::DomainTooLong);
    }
    buf.extend_from_slice(&[version]);
    buf.extend_from_slice(identity);
    buf.extend_from_slice(&[addon.len() as u8]);
    buf.extend_from_slice(addon);
    buf.extend_from_slice(&[command]);
    buf.extend_from_slice(&address.port.to_be_bytes());
    match address.host {
        HostRef::Ipv4(ip) => {
            buf.extend_from_slice(&[ATYP_IPV4]);
            buf.extend_from_slice(&ip);
        }
        HostRef::Ipv6(ip) => {
            buf.extend_from_slice(&[ATYP_IPV6]);
            buf.extend_from_slice(&ip);
        }
        HostRef::Domain(d) => {
            buf.extend_from_slice(&[ATYP_DOMAIN, d.len() as u8]);
            buf.extend_from_slice(d);
        }
    }
    Ok(())
}

#[inline]
fn parse_host(atyp: u8, buf: &[u8]) -> ParseResult<(HostRef<'_>, usize)> {
    match atyp {
        ATYP_IPV4 => {
            if buf.len() < 4 {
                return ParseResult::Incomplete(4);
            }
            ParseResult::Complete((HostRef::Ipv4([buf[0], buf[1], buf[2], buf[3]]), 4))
        }
        ATYP_DOMAIN => {
            if buf.is_empty() {
                return ParseResult::Incomplete(1);
            }
            let len = buf[0] as usize;
            if len == 0 {
                return ParseResult::Invalid(ParseError::InvalidDomainLen);
            }
            if buf.len() < 1 + len {
                return ParseResult::Incomplete(1 + len);
            }
            let domain = &buf[1..1 + len];
            if std::str::from_utf8(domain).is_err() {
                return ParseResult::Invalid(ParseError::InvalidUtf8);
            }
            ParseResult::Complete((HostRef::Domain(domain), 1 + len))
        }
        ATYP_IPV6 => {
            if buf.len() < 16 {
                return ParseResult::Incomplete(16);
            }
            let mut ip = [0u8; 16];
            ip.copy_from_slice(&buf[..16]);
            ParseResult::Complete((HostRef::Ipv6(ip), 16))
        }
        other => ParseResult::Invalid(ParseError::InvalidAtyp(other)),
    }
}

#[inline]
fn read_u16(buf: &[u8]) -> u16 {
    debug_assert!(buf.len() >= 2, "read_u16 requires at least 2 bytes");
    u16::from_be_bytes([buf[0], buf[1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: [u8; IDENTITY_LEN] = [
        0x55, 0x0e, 0x84, 0x00, 0xe2, 0x9b, 0x41, 0xd4, 0xa7, 0x16, 0x44, 0x66, 0x55, 0x44, 0x00,
        0x00,
    ];

    fn encode(address: &AddressRef<'_>, addon: &[u8], payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        write_request_header(&mut buf, 1, &ID, addon, CMD_CONNECT, address).unwrap();
        buf.extend_from_slice(payload);
        buf
    }

    fn complete(buf: &[u8]) -> RequestHeader<'_> {
        match parse_request(buf) {
            ParseResult::Complete(req) => req,
            other => panic!("unexpected parse result: {other:?}"),
        }
    }

    #[test]
    fn decodes_domain_example() {
        let mut frame = vec![0x01];
        frame.extend_from_slice(&ID);
        frame.extend_from_slice(&[0x00, 0x01, 0x00, 0x50, 0x02, 0x07]);
        frame.extend_from_slice(b"example");
        frame.extend_from_slice(b"GET / ");

        let req = complete(&frame);
        assert_eq!(req.version, 1);
        assert_eq!(req.command, CMD_CONNECT);
        assert_eq!(req.address.port, 80);
        assert_eq!(req.address.host.render(), "example");
        assert_eq!(req.payload, b"GET / ");
        assert_eq!(req.identity_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn address_literals_survive_decode_and_reencode() {
        for literal in ["10.0.0.1", "example.com", "2001:db8:0:0:0:0:0:1", "fe80:0:0:0:1:2:3:abcd"] {
            let address = AddressRef {
                host: HostRef::from_literal(literal),
                port: 443,
            };
            let frame = encode(&address, b"", b"");
            let req = complete(&frame);
            assert_eq!(req.address, address);
            let rendered = req.address.host.render();
            assert_eq!(rendered, literal);
            assert_eq!(HostRef::from_literal(&rendered), address.host);
        }
    }

    #[test]
    fn ipv6_renders_uncompressed_lowercase() {
        let host = HostRef::Ipv6([
            0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xAB, 0xCD,
        ]);
        assert_eq!(host.render(), "2001:db8:0:0:0:0:0:abcd");
    }

    #[test]
    fn addon_bytes_are_skipped() {
        let address = AddressRef {
            host: HostRef::Ipv4([1, 2, 3, 4]),
            port: 8443,
        };
        let frame = encode(&address, &[0xde, 0xad, 0xbe, 0xef], b"hi");
        let req = complete(&frame);
        assert_eq!(req.address, address);
        assert_eq!(req.payload, b"hi");
        assert_eq!(req.header_len, frame.len() - 2);
    }

    #[test]
    fn rejects_non_connect_command() {
        let address = AddressRef {
            host: HostRef::Ipv4([1, 2, 3, 4]),
            port: 53,
        };
        let mut buf = BytesMut::new();
        write_request_header(&mut buf, 1, &ID, b"", 0x02, &address).unwrap();
        assert_eq!(
            parse_request(&buf),
            ParseResult::Invalid(ParseError::InvalidCommand(0x02))
        );
    }

    #[test]
    fn rejects_unknown_address_type() {
        let mut frame = vec![0x01];
        frame.extend_from_slice(&ID);
        frame.extend_from_slice(&[0x00, CMD_CONNECT, 0x00, 0x50, 0x04, 1, 2, 3, 4]);
        assert_eq!(
            parse_request(&frame),
            ParseResult::Invalid(ParseError::InvalidAtyp(0x04))
        );
    }

    #[test]
    fn rejects_invalid_utf8_domain() {
        let mut frame = vec![0x01];
        frame.extend_from_slice(&ID);
        frame.extend_from_slice(&[0x00, CMD_CONNECT, 0x00, 0x50, ATYP_DOMAIN, 2, 0xff, 0xfe]);
        assert_eq!(
            parse_request(&frame),
            ParseResult::Invalid(ParseError::InvalidUtf8)
        );
    }

    #[test]
    fn truncation_is_reported_before_command() {
        assert_eq!(parse_request(&[0x01; 10]), ParseResult::Incomplete(PREFIX_LEN));

        // addon length points past the end of the frame
        let mut frame = vec![0x01];
        frame.extend_from_slice(&ID);
        frame.push(10);
        frame.extend_from_slice(&[0u8; 4]);
        assert_eq!(parse_request(&frame), ParseResult::Incomplete(PREFIX_LEN + 14));
    }

    #[test]
    fn truncated_address_is_incomplete() {
        let address = AddressRef {
            host: HostRef::Ipv6([7; 16]),
            port: 443,
        };
        let frame = encode(&address, b"", b"");
        let cut = &frame[..frame.len() - 3];
        assert_eq!(parse_request(cut), ParseResult::Incomplete(frame.len()));
    }

    #[test]
    fn ack_frame_echoes_version() {
        assert_eq!(ack_frame(0), [0, 0]);
        assert_eq!(ack_frame(7), [7, ACK_STATUS]);
    }

    #[test]
    fn write_rejects_long_domain() {
        let long = vec![b'a'; 256];
        let address = AddressRef {
            host: HostRef::Domain(&long),
            port: 443,
        };
        let mut buf = BytesMut::new();
        assert_eq!(
            write_request_header(&mut buf, 1, &ID, b"", CMD_CONNECT, &address),
            Err(WriteError::DomainTooLong)
        );
    }

    #[test]
    fn destination_display_brackets_ipv6() {
        assert_eq!(Destination::new("10.0.0.1", 22).to_string(), "10.0.0.1:22");
        assert_eq!(Destination::new("0:0:0:0:0:0:0:1", 80).to_string(), "[0:0:0:0:0:0:0:1]:80");
    }
}
