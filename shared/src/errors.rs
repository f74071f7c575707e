use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    /// Dial or greeting failure.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The server closed the stream or the socket was reset.
    #[error("connection closed by server")]
    StreamEnd,
    #[error("malformed response: {0}")]
    Protocol(String),
    #[error("invalid difficulty `{0}`")]
    Parse(String),
    #[error("unsupported algorithm `{0}`")]
    UnsupportedAlgorithm(String),
    #[error("digest failed: {0}")]
    DigestIo(#[source] io::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MinerError {
    /// Errors after which the connection is unusable and must be redialed.
    pub fn is_stream_end(&self) -> bool {
        matches!(self, MinerError::StreamEnd | MinerError::Connection(_))
    }

    /// Map socket errors that mean the peer is gone onto `StreamEnd`.
    pub fn from_socket(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => MinerError::StreamEnd,
            _ => MinerError::Io(err),
        }
    }
}

pub type MinerResult<T> = Result<T, MinerError>;
