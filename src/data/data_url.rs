use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{DecodeError, FormatError};

const DEFAULT_MIME: &str = "text/plain";

// Padding may be present or absent, and non-zero trailing bits in the last
// symbol are ignored. Over-padding is still an error.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static HEADER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:([^;]*)(;base64)?$").unwrap());

/// A parsed `data:` URL. The payload is kept exactly as it appeared after the
/// first comma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataUrl {
    pub mime: String,
    pub is_base64: bool,
    pub payload: String,
}

impl DataUrl {
    /// Returns the payload as text, decoding it first when it is base64.
    /// Percent-escapes in plain payloads are left alone.
    pub fn text(&self) -> Result<String, DecodeError> {
        if self.is_base64 {
            decode_base64_to_text(&self.payload)
        } else {
            Ok(self.payload.clone())
        }
    }
}

pub fn parse_data_url(url: &str) -> Result<DataUrl, FormatError> {
    if !url.starts_with("data:") {
        return Err(FormatError::NotDataUrl);
    }

    let (header, payload) = url.split_once(',').ok_or(FormatError::MissingSeparator)?;

    let captures = HEADER_PATTERN
        .captures(header)
        .ok_or(FormatError::UnrecognizedHeader)?;

    let mime = match captures.get(1).map(|m| m.as_str()) {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => DEFAULT_MIME.to_string(),
    };
    let is_base64 = captures.get(2).is_some();

    debug!(
        "Parsed data URL: mime={mime}, base64={is_base64}, payload={} bytes",
        payload.len()
    );

    Ok(DataUrl {
        mime,
        is_base64,
        payload: payload.to_string(),
    })
}

/// Decode a standard-alphabet base64 string into UTF-8 text. Trailing `=`
/// padding is optional. Invalid UTF-8 is an error, never replaced.
pub fn decode_base64_to_text(payload: &str) -> Result<String, DecodeError> {
    let bytes = PAYLOAD_ENGINE.decode(payload)?;
    Ok(String::from_utf8(bytes)?)
}
