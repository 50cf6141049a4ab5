//! Wire vocabulary shared by both transports
//!
//! - `request`: filename request codec
//! - `header`: `SUCCESS:` / `ERROR:` status header
//! - `datagram`: sequenced datagram codec of the unreliable transport
//! - `storage`: file storage seen by the servers

mod datagram;
mod header;
mod request;
pub mod storage;

pub use datagram::{COMPLETION_SENTINEL, DATA_HEADER_LEN, DELIMITER, Datagram, SEQ_WIDTH};
pub use header::{ERROR_PREFIX, NOT_FOUND_MESSAGE, ResponseHeader, SUCCESS_PREFIX};
pub use request::{decode_request, encode_request};
pub use storage::{
    ChunkReader, FileStore, LocalStore, MemoryStore, read_chunk, spawn_blocking_iter,
};
