//! Line-oriented transport to the job server and the protocol client built on it.
//!
//! Every exchange is one line written followed by one line read. Reads carry
//! no timeout: a server that stops answering stalls the caller until the
//! caller drops the future (for example on cancellation).

use async_trait::async_trait;

use crate::errors::MinerResult;

pub mod client;
pub mod connection;

pub use client::ProtocolClient;
pub use connection::Connection;

/// Line I/O to one server endpoint.
#[async_trait]
pub trait Transport: Send {
    /// Read one line with trailing NUL and newline characters removed.
    ///
    /// End of stream is reported as [`MinerError::StreamEnd`](crate::errors::MinerError::StreamEnd).
    async fn read_line(&mut self) -> MinerResult<String>;

    /// Write `line` followed by a newline.
    async fn write_line(&mut self, line: &str) -> MinerResult<()>;

    /// Close the connection. Further reads and writes fail.
    async fn close(&mut self) -> MinerResult<()>;
}

/// Strip the padding a server may leave after the payload.
pub fn clean_line(raw: &str) -> &str {
    raw.trim_end_matches('\0').trim_end_matches(['\r', '\n'])
}
