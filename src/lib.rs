//! xfer: file transfer over TCP and UDP, plus small link-layer lab tools
//!
//! - [`transfer`]: request a named file over a reliable stream or best-effort datagrams
//! - [`crc`]: CRC-16/CCITT frame check
//! - [`bucket`]: leaky bucket traffic shaping simulation
//! - [`config`]: runtime and file configuration

pub mod bucket;
pub mod config;
pub mod crc;
pub mod transfer;
