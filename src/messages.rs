//! Wire payloads for the upload sinks.
//!
//! JSON bodies are encoded with `serde-json-core` so the same code runs on
//! the kiosk and on the desktop. Form bodies use a small
//! `application/x-www-form-urlencoded` writer.
//!
//! # Example
//!
//! ```
//! use ecoscale::messages::{to_json, TelemetryPayload};
//!
//! let payload = TelemetryPayload {
//!     weight: 1.5,
//!     fakultas: "FSM",
//!     jenis: "Botol",
//!     timestamp: "2024-01-01T00:00:00Z",
//! };
//! let json = to_json(&payload).unwrap();
//! assert!(json.contains("\"jenis\":\"Botol\""));
//! ```

use alloc::string::String;
use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::dispatch::DepositRecord;
use crate::error::SinkError;

/// Largest JSON body the encoder will produce.
pub const MAX_JSON_LEN: usize = 512;

// ============================================================================
// JSON Payloads
// ============================================================================

/// MQTT telemetry message published for every commit.
///
/// ```json
/// {"weight":2.5,"fakultas":"FSM","jenis":"Organik","timestamp":"2024-01-01T00:00:00Z"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryPayload<'a> {
    /// Weight in kilograms, rounded to two decimals. Serialized as a number.
    pub weight: f64,
    /// Site tag.
    pub fakultas: &'a str,
    /// Classified label.
    pub jenis: &'a str,
    /// UTC timestamp.
    pub timestamp: &'a str,
}

impl<'a> From<&'a DepositRecord> for TelemetryPayload<'a> {
    fn from(record: &'a DepositRecord) -> Self {
        Self {
            weight: record.weight_kg(),
            fakultas: record.site.as_str(),
            jenis: record.label,
            timestamp: record.timestamp.as_str(),
        }
    }
}

/// Firestore `doubleValue` field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoubleValue {
    /// The value.
    #[serde(rename = "doubleValue")]
    pub double_value: f64,
}

/// Firestore `stringValue` field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StringValue<'a> {
    /// The value.
    #[serde(rename = "stringValue")]
    pub string_value: &'a str,
}

/// Firestore `timestampValue` field (RFC 3339).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimestampValue<'a> {
    /// The value.
    #[serde(rename = "timestampValue")]
    pub timestamp_value: &'a str,
}

/// Typed fields of one deposit document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepositFields<'a> {
    /// Weight in kilograms.
    pub berat: DoubleValue,
    /// Classified label.
    pub jenis: StringValue<'a>,
    /// Site tag.
    pub fakultas: StringValue<'a>,
    /// UTC timestamp.
    pub timestamp: TimestampValue<'a>,
}

/// Body of a Firestore `createDocument` request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FirestoreDocument<'a> {
    /// Document fields.
    pub fields: DepositFields<'a>,
}

impl<'a> From<&'a DepositRecord> for FirestoreDocument<'a> {
    fn from(record: &'a DepositRecord) -> Self {
        Self {
            fields: DepositFields {
                berat: DoubleValue {
                    double_value: record.weight_kg(),
                },
                jenis: StringValue {
                    string_value: record.label,
                },
                fakultas: StringValue {
                    string_value: record.site.as_str(),
                },
                timestamp: TimestampValue {
                    timestamp_value: record.timestamp.as_str(),
                },
            },
        }
    }
}

/// Anonymous sign-up request for the identity toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignUpRequest {
    /// Always true; asks for an id token in the response.
    #[serde(rename = "returnSecureToken")]
    pub return_secure_token: bool,
}

impl Default for SignUpRequest {
    fn default() -> Self {
        Self {
            return_secure_token: true,
        }
    }
}

/// The part of the sign-up response the kiosk needs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SignUpResponse<'a> {
    /// Bearer token for subsequent requests.
    #[serde(rename = "idToken")]
    pub id_token: &'a str,
    /// Token lifetime in seconds, as a decimal string.
    #[serde(rename = "expiresIn", default)]
    pub expires_in: Option<&'a str>,
}

impl SignUpResponse<'_> {
    /// Token lifetime in seconds, if present and numeric.
    pub fn expires_in_secs(&self) -> Option<u32> {
        self.expires_in.and_then(|s| s.parse().ok())
    }
}

/// Serializes a payload into a JSON string.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, SinkError> {
    serde_json_core::to_string::<_, MAX_JSON_LEN>(value)
        .map(|s| String::from(s.as_str()))
        .map_err(|_| SinkError::Encode)
}

/// Parses a sign-up response body.
pub fn parse_sign_up(body: &[u8]) -> Option<SignUpResponse<'_>> {
    serde_json_core::from_slice(body).ok().map(|(resp, _)| resp)
}

// ============================================================================
// Form Encoding
// ============================================================================

/// Builds an `application/x-www-form-urlencoded` body.
///
/// # Example
///
/// ```
/// use ecoscale::messages::FormBody;
///
/// let body = FormBody::new()
///     .field("jenis", "Botol")
///     .field("note", "a&b c")
///     .finish();
/// assert_eq!(body, "jenis=Botol&note=a%26b+c");
/// ```
#[derive(Debug, Default, Clone)]
pub struct FormBody {
    buf: String,
}

impl FormBody {
    /// Creates an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `name=value` pair.
    pub fn field(mut self, name: &str, value: &str) -> Self {
        if !self.buf.is_empty() {
            self.buf.push('&');
        }
        encode_component(&mut self.buf, name);
        self.buf.push('=');
        encode_component(&mut self.buf, value);
        self
    }

    /// Returns the encoded body.
    pub fn finish(self) -> String {
        self.buf
    }
}

fn encode_component(out: &mut String, s: &str) {
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'*' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::short_string;

    fn record() -> DepositRecord {
        DepositRecord {
            centi_kg: 250,
            label: "Organik",
            site: short_string("FSM"),
            timestamp: "2024-01-01T00:00:00Z".into(),
        }
    }

    // =========================================================================
    // JSON payloads
    // =========================================================================

    #[test]
    fn telemetry_payload_fields() {
        let r = record();
        let json = to_json(&TelemetryPayload::from(&r)).unwrap();
        assert!(json.starts_with("{\"weight\":2.5"));
        assert!(json.contains("\"fakultas\":\"FSM\""));
        assert!(json.contains("\"jenis\":\"Organik\""));
        assert!(json.contains("\"timestamp\":\"2024-01-01T00:00:00Z\""));
    }

    #[test]
    fn firestore_document_uses_typed_values() {
        let r = record();
        let json = to_json(&FirestoreDocument::from(&r)).unwrap();
        assert!(json.starts_with("{\"fields\":{"));
        assert!(json.contains("\"berat\":{\"doubleValue\":2.5}"));
        assert!(json.contains("\"jenis\":{\"stringValue\":\"Organik\"}"));
        assert!(json.contains("\"timestamp\":{\"timestampValue\":\"2024-01-01T00:00:00Z\"}"));
    }

    #[test]
    fn sign_up_request_shape() {
        let json = to_json(&SignUpRequest::default()).unwrap();
        assert_eq!(json, "{\"returnSecureToken\":true}");
    }

    #[test]
    fn sign_up_response_ignores_unknown_fields() {
        let body = br#"{"kind":"identitytoolkit#SignupNewUserResponse","idToken":"abc.def","refreshToken":"r","expiresIn":"3600","localId":"u1"}"#;
        let resp = parse_sign_up(body).unwrap();
        assert_eq!(resp.id_token, "abc.def");
        assert_eq!(resp.expires_in_secs(), Some(3600));
    }

    #[test]
    fn sign_up_response_without_token_fails() {
        assert!(parse_sign_up(br#"{"error":{"code":400}}"#).is_none());
    }

    // =========================================================================
    // Form encoding
    // =========================================================================

    #[test]
    fn form_body_joins_and_escapes() {
        let body = FormBody::new()
            .field("api_key", "k=1")
            .field("berat", "2.50")
            .field("jenis", "Organik")
            .finish();
        assert_eq!(body, "api_key=k%3D1&berat=2.50&jenis=Organik");
    }

    #[test]
    fn form_body_encodes_utf8_bytes() {
        let body = FormBody::new().field("x", "é").finish();
        assert_eq!(body, "x=%C3%A9");
    }
}
