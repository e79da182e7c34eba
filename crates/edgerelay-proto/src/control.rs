//! Text control grammar.
//!
//! Client to server: `CONNECT:<addr>|<data>`, `DATA:<payload>`, `CLOSE`.
//! Server to client: `CONNECTED`, `CLOSE`, `ERROR:<message>`.

use crate::Destination;

pub const CONNECT_PREFIX: &str = "CONNECT:";
pub const DATA_PREFIX: &str = "DATA:";
pub const ERROR_PREFIX: &str = "ERROR:";
pub const CLOSE: &str = "CLOSE";
pub const CONNECTED: &str = "CONNECTED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFrame<'a> {
    /// `target` is unparsed; see [`parse_target`]. Without a `|` the whole
    /// remainder is the target and `data` is empty.
    Connect { target: &'a str, data: &'a str },
    Data(&'a str),
    Close,
    /// Anything else. Ignored by the session.
    Unknown,
}

impl<'a> ControlFrame<'a> {
    pub fn parse(text: &'a str) -> Self {
        if let Some(rest) = text.strip_prefix(CONNECT_PREFIX) {
            let (target, data) = rest.split_once('|').unwrap_or((rest, ""));
            ControlFrame::Connect { target, data }
        } else if let Some(payload) = text.strip_prefix(DATA_PREFIX) {
            ControlFrame::Data(payload)
        } else if text == CLOSE {
            ControlFrame::Close
        } else {
            ControlFrame::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("missing port in address '{0}'")]
    MissingPort(String),
    #[error("unterminated IPv6 literal in '{0}'")]
    UnterminatedBracket(String),
    #[error("empty host in address '{0}'")]
    EmptyHost(String),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// Parses `host:port` or `[ipv6]:port`.
///
/// The port separator is the last colon outside brackets.
pub fn parse_target(spec: &str) -> Result<Destination, TargetError> {
    let (host, port) = if let Some(rest) = spec.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| TargetError::UnterminatedBracket(spec.to_string()))?;
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| TargetError::MissingPort(spec.to_string()))?;
        (host, port)
    } else {
        spec.rsplit_once(':')
            .ok_or_else(|| TargetError::MissingPort(spec.to_string()))?
    };

    if host.is_empty() {
        return Err(TargetError::EmptyHost(spec.to_string()));
    }
    let port = match port.parse::<u16>() {
        Ok(p) if p != 0 => p,
        _ => return Err(TargetError::InvalidPort(port.to_string())),
    };
    Ok(Destination::new(host, port))
}

/// `ERROR:<message>` notification.
pub fn error_message(message: impl std::fmt::Display) -> String {
    format!("{ERROR_PREFIX}{message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_with_data() {
        assert_eq!(
            ControlFrame::parse("CONNECT:10.0.0.1:22|SSH-2.0"),
            ControlFrame::Connect {
                target: "10.0.0.1:22",
                data: "SSH-2.0"
            }
        );
    }

    #[test]
    fn connect_data_keeps_later_pipes() {
        assert_eq!(
            ControlFrame::parse("CONNECT:host:1|a|b"),
            ControlFrame::Connect {
                target: "host:1",
                data: "a|b"
            }
        );
    }

    #[test]
    fn connect_without_pipe_has_empty_data() {
        assert_eq!(
            ControlFrame::parse("CONNECT:example.com:443"),
            ControlFrame::Connect {
                target: "example.com:443",
                data: ""
            }
        );
    }

    #[test]
    fn parses_data_close_and_unknown() {
        assert_eq!(ControlFrame::parse("DATA:hello"), ControlFrame::Data("hello"));
        assert_eq!(ControlFrame::parse("DATA:"), ControlFrame::Data(""));
        assert_eq!(ControlFrame::parse("CLOSE"), ControlFrame::Close);
        assert_eq!(ControlFrame::parse("CLOSE "), ControlFrame::Unknown);
        assert_eq!(ControlFrame::parse("PING"), ControlFrame::Unknown);
    }

    #[test]
    fn target_splits_on_last_colon() {
        assert_eq!(parse_target("10.0.0.1:22").unwrap(), Destination::new("10.0.0.1", 22));
        assert_eq!(parse_target("a:b:8080").unwrap(), Destination::new("a:b", 8080));
    }

    #[test]
    fn target_accepts_bracketed_ipv6() {
        assert_eq!(parse_target("[::1]:443").unwrap(), Destination::new("::1", 443));
        assert_eq!(
            parse_target("[2001:db8::1]:80").unwrap(),
            Destination::new("2001:db8::1", 80)
        );
    }

    #[test]
    fn target_errors() {
        assert!(matches!(parse_target("example.com"), Err(TargetError::MissingPort(_))));
        assert!(matches!(parse_target("[::1"), Err(TargetError::UnterminatedBracket(_))));
        assert!(matches!(parse_target("[::1]443"), Err(TargetError::MissingPort(_))));
        assert!(matches!(parse_target(":80"), Err(TargetError::EmptyHost(_))));
        assert!(matches!(parse_target("host:http"), Err(TargetError::InvalidPort(_))));
        assert!(matches!(parse_target("host:70000"), Err(TargetError::InvalidPort(_))));
        assert!(matches!(parse_target("host:0"), Err(TargetError::InvalidPort(_))));
    }

    #[test]
    fn error_message_is_prefixed() {
        assert_eq!(error_message("boom"), "ERROR:boom");
    }
}
