use thiserror::Error;

/// Errors raised while encoding, decoding or running a transfer
#[derive(Debug, Error)]
pub enum TransferError {
    /// The requested name is absent or not a regular file
    #[error("File Not Found.")]
    FileNotFound,

    /// A datagram without the `:` separating sequence and payload
    #[error("malformed packet: no sequence delimiter")]
    MalformedPacket,

    /// The text before the delimiter is not a sequence number
    #[error("invalid sequence number '{0}'")]
    InvalidSequenceNumber(String),

    /// The size after `SUCCESS:` is not a non-negative integer
    #[error("invalid size in SUCCESS header '{0}'")]
    InvalidSize(String),

    /// A header that is neither `SUCCESS:` nor `ERROR:`
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransferError>;

/// Pause before a server loop retries after a persistent socket error
pub(crate) const ERROR_BACKOFF: std::time::Duration = std::time::Duration::from_millis(100);

/// Socket errors caused by one peer or one interrupted call
///
/// A server loop retries these at once. Anything else may repeat on every
/// call, so the loop backs off before trying again.
pub(crate) fn is_transient(e: &std::io::Error) -> bool {
    use std::io::ErrorKind::*;
    matches!(
        e.kind(),
        ConnectionReset | ConnectionRefused | ConnectionAborted | Interrupted | WouldBlock
    )
}
