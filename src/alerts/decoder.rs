//! Turns an opaque relay response body into feed XML.
//!
//! Relays wrap the feed inconsistently: raw XML, a JSON envelope carrying the
//! document in one of a few fields, a `data:` URI, or bare base64. Decoding is
//! a fixed-order cascade:
//!
//! 1. read the body as text
//! 2. unwrap a JSON envelope (`contents`, `data`, `body`, `response`)
//! 3. accept text that already starts with `<`
//! 4. decode a `data:...;base64,` URI
//! 5. reject relay error pages (`error`, `<html`, `<!doctype`)
//! 6. decode bare base64
//!
//! Each step is classified up front by [`detect_form`], so every branch can be
//! exercised on its own.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use std::borrow::Cow;
use thiserror::Error;

/// JSON fields relays use to carry the upstream body, checked in order.
const ENVELOPE_FIELDS: [&str; 4] = ["contents", "data", "body", "response"];

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = "base64,";

/// Markers that identify a relay or provider error page rather than feed data.
const ERROR_PAGE_MARKERS: [&str; 3] = ["error", "<html", "<!doctype"];

/// Accepts both padded and unpadded input; relays are not consistent about it.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors that stop a relay body from becoming feed XML.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body (or the envelope field inside it) was empty or whitespace
    #[error("response body is empty")]
    Empty,
    /// The relay returned an error or HTML page instead of feed data
    #[error("response is an error page, not feed data")]
    ErrorPage,
    /// A `data:` URI without a `base64,` marker
    #[error("data URI is missing its base64 marker")]
    MissingBase64Marker,
    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("decoded bytes are not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Decoding succeeded but the result does not look like XML
    #[error("decoded content does not start with '<'")]
    NotXml,
}

impl DecodeError {
    /// True when there was nothing to decode, as opposed to something malformed.
    pub fn is_empty(&self) -> bool {
        matches!(self, DecodeError::Empty)
    }
}

/// Text that begins with an XML root marker once leading whitespace is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument(String);

impl DecodedDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// The recognised shapes of a (possibly unwrapped) relay body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentForm {
    Empty,
    PlainXml,
    DataUri,
    ErrorPage,
    Base64,
    Unrecognized,
}

/// Classifies working text in cascade priority order.
pub fn detect_form(text: &str) -> ContentForm {
    let trimmed = trim_leading_bom(text).trim();
    if trimmed.is_empty() {
        return ContentForm::Empty;
    }
    if trimmed.starts_with('<') {
        return ContentForm::PlainXml;
    }
    if trimmed.starts_with(DATA_URI_PREFIX) {
        return ContentForm::DataUri;
    }
    let lowered = trimmed.to_lowercase();
    if ERROR_PAGE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ContentForm::ErrorPage;
    }
    if looks_like_base64(trimmed) {
        return ContentForm::Base64;
    }
    ContentForm::Unrecognized
}

fn looks_like_base64(text: &str) -> bool {
    text.bytes().all(|b| {
        b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=') || b.is_ascii_whitespace()
    })
}

fn trim_leading_bom(text: &str) -> &str {
    text.trim_start_matches('\u{feff}')
}

/// Replaces a JSON envelope with the content field it carries.
///
/// Text that is not JSON, or JSON without a known string field, is returned
/// unchanged. That is not an error: most relays return the body verbatim.
pub fn unwrap_envelope(text: &str) -> Cow<'_, str> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(text)
    else {
        return Cow::Borrowed(text);
    };

    for field in ENVELOPE_FIELDS {
        if let Some(serde_json::Value::String(inner)) = map.get(field) {
            tracing::debug!(field = field, "Unwrapped JSON relay envelope");
            return Cow::Owned(inner.clone());
        }
    }

    Cow::Borrowed(text)
}

/// Decodes a raw relay body into a feed document.
///
/// # Errors
///
/// - [`DecodeError::Empty`] when there is no content at all
/// - [`DecodeError::ErrorPage`] when the body is a relay error page
/// - [`DecodeError::MissingBase64Marker`], [`DecodeError::InvalidBase64`] or
///   [`DecodeError::InvalidUtf8`] when an encoded form fails to decode
/// - [`DecodeError::NotXml`] when nothing in the cascade yields text starting with `<`
pub fn decode(raw: &[u8]) -> Result<DecodedDocument, DecodeError> {
    let text = String::from_utf8_lossy(raw);
    decode_text(&text)
}

/// Runs the cascade from step 2 onwards on already-extracted text.
pub fn decode_text(text: &str) -> Result<DecodedDocument, DecodeError> {
    if trim_leading_bom(text).trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let working = unwrap_envelope(text);
    let form = detect_form(&working);
    tracing::debug!(form = ?form, len = working.len(), "Detected relay content form");

    match form {
        // Only a blank body is confirmed empty. A blank envelope field means the
        // relay failed to fetch the feed.
        ContentForm::Empty => Err(DecodeError::NotXml),
        ContentForm::PlainXml => Ok(DecodedDocument(working.into_owned())),
        ContentForm::DataUri => {
            let trimmed = trim_leading_bom(&working).trim();
            let start = trimmed
                .find(BASE64_MARKER)
                .ok_or(DecodeError::MissingBase64Marker)?;
            decode_base64_xml(&trimmed[start + BASE64_MARKER.len()..])
        }
        ContentForm::ErrorPage => Err(DecodeError::ErrorPage),
        ContentForm::Base64 => decode_base64_xml(trim_leading_bom(&working).trim()),
        ContentForm::Unrecognized => Err(DecodeError::NotXml),
    }
}

/// Base64 to bytes to strict UTF-8; the result must start with `<`.
fn decode_base64_xml(encoded: &str) -> Result<DecodedDocument, DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = LENIENT_BASE64.decode(compact.as_bytes())?;
    let text = String::from_utf8(bytes)?;

    if trim_leading_bom(&text).trim_start().starts_with('<') {
        Ok(DecodedDocument(text))
    } else {
        Err(DecodeError::NotXml)
    }
}
