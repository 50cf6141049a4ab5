//! Datagram serialization for the unreliable transport
//!
//! ```text
//! ERROR: File Not Found.            sole datagram on failure, no sequence
//! 0001:<payload bytes>              one per chunk, 1-based sequence
//! 0004:FILE_TRANSFER_COMPLETE       completion marker, last data seq + 1
//! ```

use crate::transfer::error::{Result, TransferError};

use super::header::ERROR_PREFIX;

/// Separator between sequence number and payload
pub const DELIMITER: u8 = b':';
/// Minimum number of decimal digits in a sequence number
pub const SEQ_WIDTH: usize = 4;
/// Bytes a data datagram adds in front of its payload
pub const DATA_HEADER_LEN: usize = SEQ_WIDTH + 1;
/// Payload of the completion marker
pub const COMPLETION_SENTINEL: &str = "FILE_TRANSFER_COMPLETE";

/// One datagram of an unreliable transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    /// A slice of file content
    Data { seq: u32, payload: Vec<u8> },
    /// End of stream; `seq` is the last data sequence plus one
    Complete { seq: u32 },
    /// Request failed, carries the text after `ERROR:`
    Error { message: String },
}

impl Datagram {
    /// Serialize to wire bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Datagram::Data { seq, payload } => {
                let mut buf = format!("{:0width$}:", seq, width = SEQ_WIDTH).into_bytes();
                buf.extend_from_slice(payload);
                buf
            }
            Datagram::Complete { seq } => {
                format!("{:0width$}:{}", seq, COMPLETION_SENTINEL, width = SEQ_WIDTH).into_bytes()
            }
            Datagram::Error { message } => format!("{} {}", ERROR_PREFIX, message).into_bytes(),
        }
    }

    /// Parse wire bytes
    ///
    /// A missing delimiter is [`TransferError::MalformedPacket`]; sequence
    /// text that is not a positive integer is
    /// [`TransferError::InvalidSequenceNumber`].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if let Some(rest) = buf.strip_prefix(ERROR_PREFIX.as_bytes()) {
            return Ok(Datagram::Error {
                message: String::from_utf8_lossy(rest).trim().to_string(),
            });
        }

        let pos = buf
            .iter()
            .position(|&b| b == DELIMITER)
            .ok_or(TransferError::MalformedPacket)?;
        let (seq_text, payload) = (&buf[..pos], &buf[pos + 1..]);

        let seq_text = String::from_utf8_lossy(seq_text);
        let seq = match seq_text.trim().parse::<u32>() {
            Ok(seq) if seq > 0 => seq,
            _ => return Err(TransferError::InvalidSequenceNumber(seq_text.into_owned())),
        };

        if payload.trim_ascii() == COMPLETION_SENTINEL.as_bytes() {
            return Ok(Datagram::Complete { seq });
        }

        Ok(Datagram::Data {
            seq,
            payload: payload.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_is_zero_padded() {
        let d = Datagram::Data {
            seq: 1,
            payload: b"Hello World".to_vec(),
        };
        assert_eq!(d.encode(), b"0001:Hello World");
        assert_eq!(Datagram::Complete { seq: 2 }.encode(), b"0002:FILE_TRANSFER_COMPLETE");
    }

    #[test]
    fn wide_sequence_numbers_still_parse() {
        let d = Datagram::Data {
            seq: 12345,
            payload: vec![0xff, b':', 0x00],
        };
        let wire = d.encode();
        assert!(wire.starts_with(b"12345:"));
        assert_eq!(Datagram::decode(&wire).unwrap(), d);
    }

    #[test]
    fn payload_may_contain_delimiter_and_binary() {
        let got = Datagram::decode(b"0003:a:b\x00\xfe").unwrap();
        assert_eq!(
            got,
            Datagram::Data {
                seq: 3,
                payload: b"a:b\x00\xfe".to_vec()
            }
        );
    }

    #[test]
    fn error_datagram_has_no_sequence() {
        assert_eq!(
            Datagram::decode(b"ERROR: File Not Found.").unwrap(),
            Datagram::Error {
                message: "File Not Found.".to_string()
            }
        );
    }

    #[test]
    fn completion_marker_tolerates_trailing_whitespace() {
        assert_eq!(
            Datagram::decode(b"0006:FILE_TRANSFER_COMPLETE\n").unwrap(),
            Datagram::Complete { seq: 6 }
        );
    }

    #[test]
    fn rejects_bad_framing() {
        assert!(matches!(
            Datagram::decode(b"garbage"),
            Err(TransferError::MalformedPacket)
        ));
        assert!(matches!(
            Datagram::decode(b"00x1:data"),
            Err(TransferError::InvalidSequenceNumber(ref s)) if s == "00x1"
        ));
        assert!(matches!(
            Datagram::decode(b"0000:data"),
            Err(TransferError::InvalidSequenceNumber(_))
        ));
    }
}
