use std::fmt;

use crate::transfer::error::{Result, TransferError};

/// Prefix of a success status
pub const SUCCESS_PREFIX: &str = "SUCCESS:";
/// Prefix of an error status
pub const ERROR_PREFIX: &str = "ERROR:";
/// Message sent when a request does not name a regular file
pub const NOT_FOUND_MESSAGE: &str = "File Not Found.";

/// Status text sent before any body
///
/// Exactly one header is produced per request. On the reliable transport it
/// opens the stream; on the unreliable transport only the error form is used,
/// as a datagram of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseHeader {
    /// `SUCCESS:<size>`
    Success { size: u64 },
    /// `ERROR: <message>`
    Error { message: String },
}

impl ResponseHeader {
    /// The `ERROR: File Not Found.` header
    pub fn not_found() -> Self {
        Self::Error {
            message: NOT_FOUND_MESSAGE.to_string(),
        }
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Parse header text received by a client
    ///
    /// The error message is the text after the first `:`, trimmed. A success
    /// size that is not a decimal integer is [`TransferError::InvalidSize`];
    /// any other text is [`TransferError::UnexpectedResponse`].
    pub fn parse(text: &str) -> Result<Self> {
        if let Some(rest) = text.strip_prefix(ERROR_PREFIX) {
            return Ok(Self::Error {
                message: rest.trim().to_string(),
            });
        }
        if let Some(rest) = text.strip_prefix(SUCCESS_PREFIX) {
            let size = rest
                .trim()
                .parse::<u64>()
                .map_err(|_| TransferError::InvalidSize(rest.to_string()))?;
            return Ok(Self::Success { size });
        }
        Err(TransferError::UnexpectedResponse(text.to_string()))
    }
}

impl fmt::Display for ResponseHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { size } => write!(f, "{}{}", SUCCESS_PREFIX, size),
            Self::Error { message } => write!(f, "{} {}", ERROR_PREFIX, message),
        }
    }
}
