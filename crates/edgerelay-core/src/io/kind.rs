//! Stable snake_case names for `std::io::ErrorKind`.
//!
//! Used by configuration (retry classification) and as metrics labels.

use std::io::ErrorKind;

const KINDS: &[(&str, ErrorKind)] = &[
    ("connection_refused", ErrorKind::ConnectionRefused),
    ("connection_reset", ErrorKind::ConnectionReset),
    ("connection_aborted", ErrorKind::ConnectionAborted),
    ("not_connected", ErrorKind::NotConnected),
    ("addr_in_use", ErrorKind::AddrInUse),
    ("addr_not_available", ErrorKind::AddrNotAvailable),
    ("broken_pipe", ErrorKind::BrokenPipe),
    ("timed_out", ErrorKind::TimedOut),
    ("host_unreachable", ErrorKind::HostUnreachable),
    ("network_unreachable", ErrorKind::NetworkUnreachable),
    ("network_down", ErrorKind::NetworkDown),
    ("unexpected_eof", ErrorKind::UnexpectedEof),
    ("permission_denied", ErrorKind::PermissionDenied),
    ("not_found", ErrorKind::NotFound),
    ("interrupted", ErrorKind::Interrupted),
    ("other", ErrorKind::Other),
];

pub fn error_kind_from_name(name: &str) -> Option<ErrorKind> {
    KINDS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, k)| *k)
}

/// Name of `kind`, or `"other"` for kinds without a stable name here.
pub fn error_kind_name(kind: ErrorKind) -> &'static str {
    KINDS
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(n, _)| *n)
        .unwrap_or("other")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DEFAULT_RETRY_ERROR_KINDS;

    #[test]
    fn default_retry_kinds_are_known() {
        for name in DEFAULT_RETRY_ERROR_KINDS {
            assert!(error_kind_from_name(name).is_some(), "{name}");
        }
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(error_kind_from_name("Timed_Out"), Some(ErrorKind::TimedOut));
        assert_eq!(error_kind_name(ErrorKind::ConnectionRefused), "connection_refused");
        assert_eq!(error_kind_name(ErrorKind::InvalidData), "other");
        assert_eq!(error_kind_from_name("bogus"), None);
    }
}
