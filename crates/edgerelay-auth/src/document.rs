//! Token document model.
//!
//! Three JSON shapes are accepted:
//!
//! ```json
//! { "global": { "SERVER_START_TIME": "2024-01-01T00:00:00Z" },
//!   "tokens": [ { "token": "a1b2", "expire": "2026-12-31T23:59:59Z", "remark": "alice" } ] }
//! ```
//!
//! a bare list of the same rows, and the legacy flat map
//! `{ "a1b2": "2026-12-31T23:59:59Z", "c3d4": null }`.
//!
//! All shapes normalise to [`TokenDocument`], which serialises back in the
//! nested form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::AuthError;
use crate::result::{Resolution, TokenStatus};

/// One credential entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRow {
    pub token: String,
    /// RFC 3339 timestamp or `YYYY-MM-DD`. Absent or empty = never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl TokenRow {
    pub fn permanent(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expire: None,
            remark: None,
        }
    }

    pub fn expiring(token: impl Into<String>, expire: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expire: Some(expire.into()),
            remark: None,
        }
    }

    /// Status of this row as of `now`.
    ///
    /// `now` equal to the expiry instant counts as expired. An expiry string
    /// that cannot be parsed also counts as expired.
    pub fn status_at(&self, now: OffsetDateTime) -> (TokenStatus, Option<OffsetDateTime>) {
        match self.expire.as_deref().map(str::trim) {
            None | Some("") => (TokenStatus::Valid, None),
            Some(raw) => match parse_expiry(raw) {
                Some(at) if now < at => (TokenStatus::Valid, Some(at)),
                Some(at) => (TokenStatus::Expired, Some(at)),
                None => (TokenStatus::Expired, None),
            },
        }
    }
}

/// Parses an expiry string: RFC 3339, or a bare date meaning midnight UTC.
pub fn parse_expiry(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

/// Normalised token document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument")]
pub struct TokenDocument {
    /// Free-form global metadata, carried through untouched.
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub global: serde_json::Map<String, serde_json::Value>,
    pub tokens: Vec<TokenRow>,
}

impl TokenDocument {
    pub fn from_rows(rows: impl IntoIterator<Item = TokenRow>) -> Self {
        Self {
            global: serde_json::Map::new(),
            tokens: rows.into_iter().collect(),
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(bytes).map_err(AuthError::document)
    }

    /// Appends rows from `other`, keeping existing rows first.
    pub fn merge(&mut self, other: TokenDocument) {
        for (k, v) in other.global {
            self.global.entry(k).or_insert(v);
        }
        self.tokens.extend(other.tokens);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Pure lookup. The first row with an exactly matching token wins.
    pub fn resolve(&self, token: &str, now: OffsetDateTime) -> Resolution {
        let Some(row) = self.tokens.iter().find(|r| r.token == token) else {
            return Resolution::not_found();
        };
        let (status, expires_at) = row.status_at(now);
        Resolution {
            status,
            expires_at,
            remark: row.remark.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Nested {
        #[serde(default)]
        global: serde_json::Map<String, serde_json::Value>,
        tokens: Vec<TokenRow>,
    },
    List(Vec<TokenRow>),
    Flat(BTreeMap<String, Option<String>>),
}

impl From<RawDocument> for TokenDocument {
    fn from(raw: RawDocument) -> Self {
        match raw {
            RawDocument::Nested { global, tokens } => Self { global, tokens },
            RawDocument::List(tokens) => Self::from_rows(tokens),
            RawDocument::Flat(map) => Self::from_rows(map.into_iter().map(|(token, expire)| {
                TokenRow {
                    token,
                    expire,
                    remark: None,
                }
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NESTED: &str = r#"{
        "global": {"SERVER_START_TIME": "2024-01-01T00:00:00Z"},
        "tokens": [
            {"token": "alice", "expire": "2026-12-31T23:59:59Z", "remark": "team a"},
            {"token": "bob"},
            {"token": "carol", "expire": "not a date"},
            {"token": "dave", "expire": ""}
        ]
    }"#;

    #[test]
    fn nested_shape() {
        let doc = TokenDocument::from_json(NESTED.as_bytes()).unwrap();
        assert_eq!(doc.tokens.len(), 4);
        assert!(doc.global.contains_key("SERVER_START_TIME"));

        let now = datetime!(2025-06-01 00:00 UTC);
        let alice = doc.resolve("alice", now);
        assert_eq!(alice.status, TokenStatus::Valid);
        assert_eq!(alice.expires_at, Some(datetime!(2026-12-31 23:59:59 UTC)));
        assert_eq!(alice.remark.as_deref(), Some("team a"));

        assert!(doc.resolve("bob", now).is_valid());
        assert!(doc.resolve("dave", now).is_valid());
        assert_eq!(doc.resolve("carol", now).status, TokenStatus::Expired);
        assert_eq!(doc.resolve("mallory", now).status, TokenStatus::NotFound);
    }

    #[test]
    fn list_shape() {
        let doc = TokenDocument::from_json(br#"[{"token": "x"}, {"token": "y", "expire": "2020-01-01"}]"#)
            .unwrap();
        let now = datetime!(2025-01-01 00:00 UTC);
        assert!(doc.resolve("x", now).is_valid());
        assert_eq!(doc.resolve("y", now).status, TokenStatus::Expired);
    }

    #[test]
    fn flat_legacy_shape() {
        let doc = TokenDocument::from_json(
            br#"{"aaa": "2030-01-01T00:00:00Z", "bbb": null, "ccc": "2000-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let now = datetime!(2025-01-01 00:00 UTC);
        assert!(doc.resolve("aaa", now).is_valid());
        assert!(doc.resolve("bbb", now).is_valid());
        assert_eq!(doc.resolve("ccc", now).status, TokenStatus::Expired);
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let doc = TokenDocument::from_rows([TokenRow::expiring("t", "2025-03-01T12:00:00Z")]);
        let expire = datetime!(2025-03-01 12:00 UTC);

        assert!(doc.resolve("t", expire - time::Duration::nanoseconds(1)).is_valid());
        assert_eq!(doc.resolve("t", expire).status, TokenStatus::Expired);
        assert_eq!(
            doc.resolve("t", expire + time::Duration::seconds(1)).status,
            TokenStatus::Expired
        );
    }

    #[test]
    fn token_match_is_exact() {
        let doc = TokenDocument::from_rows([TokenRow::permanent("Token")]);
        let now = OffsetDateTime::now_utc();
        assert!(doc.resolve("Token", now).is_valid());
        assert_eq!(doc.resolve("token", now).status, TokenStatus::NotFound);
        assert_eq!(doc.resolve("Token ", now).status, TokenStatus::NotFound);
    }

    #[test]
    fn offsets_are_honoured() {
        // 12:00 at +08:00 is 04:00 UTC
        let row = TokenRow::expiring("t", "2025-03-01T12:00:00+08:00");
        let (status, at) = row.status_at(datetime!(2025-03-01 03:59 UTC));
        assert_eq!(status, TokenStatus::Valid);
        assert_eq!(at, Some(datetime!(2025-03-01 04:00 UTC)));
        let (status, _) = row.status_at(datetime!(2025-03-01 04:00 UTC));
        assert_eq!(status, TokenStatus::Expired);
    }

    #[test]
    fn merge_keeps_existing_rows_first() {
        let mut doc = TokenDocument::from_rows([TokenRow::permanent("a")]);
        doc.merge(TokenDocument::from_rows([
            TokenRow::expiring("a", "2000-01-01"),
            TokenRow::permanent("b"),
        ]));
        let now = OffsetDateTime::now_utc();
        assert!(doc.resolve("a", now).is_valid());
        assert!(doc.resolve("b", now).is_valid());
    }

    #[test]
    fn serialises_in_nested_form() {
        let doc = TokenDocument::from_json(br#"{"k": null}"#).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({"tokens": [{"token": "k"}]}));
    }

    #[test]
    fn rejects_garbage() {
        assert!(TokenDocument::from_json(b"42").is_err());
        assert!(TokenDocument::from_json(b"not json").is_err());
    }
}
