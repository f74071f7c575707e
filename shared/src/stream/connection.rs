use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufWriter},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};
use tracing::*;

use super::{clean_line, Transport};
use crate::errors::{MinerError, MinerResult};

/// Upper bound of a single server reply.
pub const BUF_SIZE: usize = 256;

/// TCP connection to the job server.
///
/// A reply is whatever a single read returns, up to [`BUF_SIZE`] bytes. The
/// server answers in lockstep with the client and does not always terminate
/// its greeting with a newline, so replies are not reassembled across reads.
pub struct Connection {
    reader: OwnedReadHalf,
    writer: BufWriter<OwnedWriteHalf>,
    buf: Box<[u8; BUF_SIZE]>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self { reader: read_half, writer: BufWriter::new(write_half), buf: Box::new([0; BUF_SIZE]) }
    }

    pub async fn connect(addr: &str) -> MinerResult<Self> {
        debug!("dialing {addr}");
        let stream =
            TcpStream::connect(addr).await.map_err(|err| MinerError::Connection(format!("{addr}: {err}")))?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl Transport for Connection {
    async fn read_line(&mut self) -> MinerResult<String> {
        let n = self.reader.read(&mut self.buf[..]).await.map_err(MinerError::from_socket)?;
        if n == 0 {
            return Err(MinerError::StreamEnd);
        }

        let text = String::from_utf8_lossy(&self.buf[..n]);
        let line = clean_line(&text).to_string();
        debug!("read {n} bytes: {line}");
        Ok(line)
    }

    async fn write_line(&mut self, line: &str) -> MinerResult<()> {
        self.writer.write_all(line.as_bytes()).await.map_err(MinerError::from_socket)?;
        self.writer.write_all(b"\n").await.map_err(MinerError::from_socket)?;
        self.writer.flush().await.map_err(MinerError::from_socket)?;
        debug!("sent {} bytes: {line}", line.len() + 1);
        Ok(())
    }

    async fn close(&mut self) -> MinerResult<()> {
        self.writer.shutdown().await.map_err(MinerError::from_socket)
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncBufReadExt, BufReader},
        net::TcpListener,
    };

    use super::*;

    #[tokio::test]
    async fn exchanges_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            let mut lines = BufReader::new(read_half).lines();

            // greeting without newline, as some servers send it
            write_half.write_all(b"2.7").await.unwrap();
            let request = lines.next_line().await.unwrap().unwrap();
            assert_eq!(request, "JOB,alice,LOW");
            write_half.write_all(b"abc,def,7\n\0\0").await.unwrap();
        });

        let mut conn = Connection::connect(&addr.to_string()).await.unwrap();
        assert_eq!(conn.read_line().await.unwrap(), "2.7");
        conn.write_line("JOB,alice,LOW").await.unwrap();
        assert_eq!(conn.read_line().await.unwrap(), "abc,def,7");
    }

    #[tokio::test]
    async fn closed_socket_is_stream_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut conn = Connection::connect(&addr.to_string()).await.unwrap();
        let err = conn.read_line().await.unwrap_err();
        assert!(matches!(err, MinerError::StreamEnd), "{err:?}");
    }

    #[tokio::test]
    async fn refused_dial_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Connection::connect(&addr.to_string()).await.err().unwrap();
        assert!(matches!(err, MinerError::Connection(_)));
        assert!(err.is_stream_end());
    }
}
