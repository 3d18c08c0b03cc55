//! Turning completed control-plane responses into structured errors
//!
//! Every lifecycle operation declares which status it accepts. [`classify`]
//! passes accepted responses through untouched and decodes anything else into
//! an [`ApiError`] carrying the observed status, the expected status and the
//! control plane's error envelope.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::transport::RawResponse;

/// Longest body excerpt kept when the error envelope cannot be decoded
const BODY_EXCERPT_LIMIT: usize = 512;

/// One application-level error reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    /// Numeric API error code
    #[serde(default, alias = "ID", alias = "Id")]
    pub id: i64,
    /// Human-readable description
    #[serde(default, alias = "Message", alias = "description")]
    pub message: String,
}

impl fmt::Display for ApiErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}: {})", self.id, self.message)
    }
}

/// The body the control plane returns on non-success responses.
///
/// `errors` is required: a JSON object without it is some other service's
/// body and must not pass as an envelope reporting zero errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(alias = "Errors")]
    pub errors: Vec<ApiErrorEntry>,
}

/// The status codes an operation considers successful
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedStatus {
    /// Exactly this code
    Exactly(u16),
    /// Any 2xx code
    AnySuccess,
}

impl ExpectedStatus {
    pub const OK: ExpectedStatus = ExpectedStatus::Exactly(200);
    pub const CREATED: ExpectedStatus = ExpectedStatus::Exactly(201);
    pub const ACCEPTED: ExpectedStatus = ExpectedStatus::Exactly(202);

    #[must_use]
    pub fn accepts(self, status: u16) -> bool {
        match self {
            ExpectedStatus::Exactly(code) => code == status,
            ExpectedStatus::AnySuccess => (200..300).contains(&status),
        }
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedStatus::Exactly(code) => write!(f, "{}", code),
            ExpectedStatus::AnySuccess => f.write_str("2xx"),
        }
    }
}

/// What could be learned from the body of a rejected response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    /// The envelope decoded; may hold zero entries
    Reported(Vec<ApiErrorEntry>),
    /// The body was not an error envelope at all
    Undecodable { body: String, reason: String },
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Reported(entries) if entries.is_empty() => {
                f.write_str("the API reported no error details")
            }
            ErrorDetail::Reported(entries) => {
                let joined = entries
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                f.write_str(&joined)
            }
            ErrorDetail::Undecodable { body, reason } => {
                write!(
                    f,
                    "unable to decode error response ({}); body was '{}'",
                    reason, body
                )
            }
        }
    }
}

/// A response whose status the operation does not accept
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("API error: status {status} (expected {expected}): {detail}")]
pub struct ApiError {
    pub status: u16,
    pub expected: ExpectedStatus,
    pub detail: ErrorDetail,
}

impl ApiError {
    /// Decoded entries, empty when the body was undecodable
    pub fn entries(&self) -> &[ApiErrorEntry] {
        match &self.detail {
            ErrorDetail::Reported(entries) => entries,
            ErrorDetail::Undecodable { .. } => &[],
        }
    }

    /// Returns true if the body could not be decoded as an error envelope
    #[must_use]
    pub fn is_undecodable(&self) -> bool {
        matches!(self.detail, ErrorDetail::Undecodable { .. })
    }
}

/// Check a completed response against the accepted status.
///
/// Accepted responses are never inspected further, even when the body is empty
/// or happens to look like an error envelope.
pub fn classify(response: &RawResponse, expected: ExpectedStatus) -> Result<(), ApiError> {
    if expected.accepts(response.status) {
        return Ok(());
    }

    let detail = decode_detail(&response.body);
    tracing::debug!(
        status = response.status,
        expected = %expected,
        detail = %detail,
        "Control plane rejected request"
    );

    Err(ApiError {
        status: response.status,
        expected,
        detail,
    })
}

fn decode_detail(body: &[u8]) -> ErrorDetail {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => ErrorDetail::Reported(envelope.errors),
        Err(e) => {
            let text = String::from_utf8_lossy(body);
            let body = if text.len() > BODY_EXCERPT_LIMIT {
                let mut cut = BODY_EXCERPT_LIMIT;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                format!("{}...", &text[..cut])
            } else {
                text.into_owned()
            };
            ErrorDetail::Undecodable {
                body,
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            location: None,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_accepted_status_is_never_an_error() {
        assert!(classify(&response(200, ""), ExpectedStatus::OK).is_ok());
        assert!(
            classify(
                &response(201, r#"{"errors":[{"ID":1,"message":"x"}]}"#),
                ExpectedStatus::CREATED
            )
            .is_ok()
        );
        assert!(classify(&response(204, "not json"), ExpectedStatus::AnySuccess).is_ok());
    }

    #[test]
    fn test_decodes_envelope() {
        let body = r#"{"errors":[{"ID":2000367,"message":"Database is not in a valid state to park"}]}"#;
        let err = classify(&response(409, body), ExpectedStatus::ACCEPTED).unwrap_err();
        assert_eq!(err.status, 409);
        assert_eq!(err.expected, ExpectedStatus::ACCEPTED);
        assert_eq!(
            err.entries(),
            &[ApiErrorEntry {
                id: 2000367,
                message: "Database is not in a valid state to park".to_string()
            }]
        );
        assert_eq!(
            err.to_string(),
            "API error: status 409 (expected 202): (2000367: Database is not in a valid state to park)"
        );
    }

    #[test]
    fn test_lowercase_id_field_is_accepted() {
        let body = r#"{"errors":[{"id":7,"message":"bad"}]}"#;
        let err = classify(&response(400, body), ExpectedStatus::OK).unwrap_err();
        assert_eq!(err.entries()[0].id, 7);
    }

    #[test]
    fn test_empty_envelope_is_distinct_from_undecodable() {
        let empty = classify(&response(500, r#"{"errors":[]}"#), ExpectedStatus::OK).unwrap_err();
        assert_eq!(empty.detail, ErrorDetail::Reported(vec![]));
        assert!(!empty.is_undecodable());
        assert!(empty.to_string().contains("no error details"));

        let garbage = classify(&response(502, "<html>Bad Gateway</html>"), ExpectedStatus::OK)
            .unwrap_err();
        assert!(garbage.is_undecodable());
        assert!(garbage.entries().is_empty());
        assert!(garbage.to_string().contains("<html>Bad Gateway</html>"));
    }

    #[test]
    fn test_json_without_errors_key_is_undecodable() {
        let err = classify(
            &response(502, r#"{"message":"upstream connect error"}"#),
            ExpectedStatus::OK,
        )
        .unwrap_err();

        assert!(err.is_undecodable());
        assert!(err.entries().is_empty());
        assert!(!err.to_string().contains("no error details"));
        assert!(err.to_string().contains("upstream connect error"));
    }

    #[test]
    fn test_empty_body_is_undecodable() {
        let err = classify(&response(404, ""), ExpectedStatus::OK).unwrap_err();
        assert!(err.is_undecodable());
    }

    #[test]
    fn test_any_success_range() {
        assert!(ExpectedStatus::AnySuccess.accepts(200));
        assert!(ExpectedStatus::AnySuccess.accepts(299));
        assert!(!ExpectedStatus::AnySuccess.accepts(300));
        assert!(!ExpectedStatus::AnySuccess.accepts(199));
        assert_eq!(ExpectedStatus::AnySuccess.to_string(), "2xx");
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = classify(&response(500, &body), ExpectedStatus::OK).unwrap_err();
        match err.detail {
            ErrorDetail::Undecodable { body, .. } => {
                assert_eq!(body.len(), BODY_EXCERPT_LIMIT + 3);
                assert!(body.ends_with("..."));
            }
            other => panic!("expected undecodable, got {:?}", other),
        }
    }
}
