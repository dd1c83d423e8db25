use std::string::FromUtf8Error;

use thiserror::Error;

/// A `data:` URL that could not be split into header and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("not a data URL")]
    NotDataUrl,
    #[error("missing payload separator")]
    MissingSeparator,
    #[error("unrecognized header")]
    UnrecognizedHeader,
}

/// A base64 payload that does not decode to UTF-8 text.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
