use tracing::*;

use super::{Connection, Transport};
use crate::{
    errors::{MinerError, MinerResult},
    interaction::{job_request_line, submit_line, Job},
    types::{Algorithm, DifficultyTier, MinerName, RigId},
};

/// Request/response client over one [`Transport`].
///
/// Each call performs exactly one write and one read. Retrying is left to
/// the caller.
pub struct ProtocolClient<T> {
    transport: T,
    version: String,
}

impl ProtocolClient<Connection> {
    /// Dial `addr` and consume the server's greeting.
    ///
    /// Returns the client together with the server version.
    pub async fn connect(addr: &str, version: impl Into<String>) -> MinerResult<(Self, String)> {
        let conn = Connection::connect(addr).await?;
        let mut client = ProtocolClient::new(conn, version);
        let server_version = client.handshake().await?;
        Ok((client, server_version))
    }
}

impl<T: Transport> ProtocolClient<T> {
    /// `version` is reported with every submitted result.
    pub fn new(transport: T, version: impl Into<String>) -> Self {
        Self { transport, version: version.into() }
    }

    /// Read the unsolicited version line the server sends after accept.
    pub async fn handshake(&mut self) -> MinerResult<String> {
        self.transport.read_line().await.map_err(|err| {
            match err {
                MinerError::StreamEnd => MinerError::Connection("closed before greeting".to_string()),
                err => MinerError::Connection(format!("greeting: {err}")),
            }
        })
    }

    pub async fn request_job(
        &mut self,
        algorithm: Algorithm,
        miner: &MinerName,
        tier: &DifficultyTier,
    ) -> MinerResult<Job> {
        self.transport.write_line(&job_request_line(algorithm, miner, tier)).await?;
        let response = self.transport.read_line().await?;
        debug!("job response: {response}");
        Job::from_response(algorithm, &response)
    }

    /// Report `job.nonce` and return the server's acknowledgement line.
    pub async fn submit_result(
        &mut self,
        job: &Job,
        miner: &MinerName,
        rig: &RigId,
        thread: usize,
    ) -> MinerResult<String> {
        let line = submit_line(job, miner, &self.version, thread, rig);
        self.transport.write_line(&line).await?;
        self.transport.read_line().await
    }

    pub async fn close(mut self) -> MinerResult<()> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::mock::MockTransport;

    fn identity() -> (MinerName, RigId, DifficultyTier) {
        (MinerName("alice".into()), RigId("rig1".into()), DifficultyTier("MEDIUM".into()))
    }

    #[tokio::test]
    async fn requests_and_parses_job() {
        let (transport, mut server) = MockTransport::pair();
        let mut client = ProtocolClient::new(transport, "0.2");
        let (miner, _, tier) = identity();

        server.send("abc123,def456,7500\n");
        let job = client.request_job(Algorithm::Ducos1a, &miner, &tier).await.unwrap();
        assert_eq!(server.recv().await, "JOB,alice,MEDIUM");
        assert_eq!(job.challenge_block, "abc123");
        assert_eq!(job.target_digest, "def456");
        assert_eq!(job.difficulty_bound, 750001);

        server.send("a,b,1");
        let job = client.request_job(Algorithm::XxHash, &miner, &tier).await.unwrap();
        assert_eq!(server.recv().await, "JOBXX,alice,MEDIUM");
        assert_eq!(job.algorithm, Algorithm::XxHash);
    }

    #[tokio::test]
    async fn malformed_job_keeps_connection() {
        let (transport, mut server) = MockTransport::pair();
        let mut client = ProtocolClient::new(transport, "0.2");
        let (miner, _, tier) = identity();

        server.send("NO,JOB");
        let err = client.request_job(Algorithm::Ducos1a, &miner, &tier).await.unwrap_err();
        assert!(matches!(err, MinerError::Protocol(_)));

        server.send("a,b,lots");
        let err = client.request_job(Algorithm::Ducos1a, &miner, &tier).await.unwrap_err();
        assert!(matches!(err, MinerError::Parse(text) if text == "lots"));

        // still usable
        server.send("a,b,2");
        assert!(client.request_job(Algorithm::Ducos1a, &miner, &tier).await.is_ok());
        for _ in 0..3 {
            assert_eq!(server.recv().await, "JOB,alice,MEDIUM");
        }
    }

    #[tokio::test]
    async fn submits_result() {
        let (transport, mut server) = MockTransport::pair();
        let mut client = ProtocolClient::new(transport, "0.2");
        let (miner, rig, _) = identity();

        let mut job = Job::new(Algorithm::Ducos1a, "a", "b", 750001);
        job.nonce = 175514;

        server.send("GOOD\n");
        let ack = client.submit_result(&job, &miner, &rig, 2).await.unwrap();
        assert_eq!(ack, "GOOD");
        assert_eq!(server.recv().await, "175514,0,alice,0.2 2xrig1");
    }

    #[tokio::test]
    async fn stream_end_is_reported() {
        let (transport, server) = MockTransport::pair();
        let mut client = ProtocolClient::new(transport, "0.2");
        let (miner, _, tier) = identity();
        drop(server);

        let err = client.request_job(Algorithm::Ducos1a, &miner, &tier).await.unwrap_err();
        assert!(err.is_stream_end());
    }

    #[tokio::test]
    async fn greeting_failure_is_connection_error() {
        let (transport, server) = MockTransport::pair();
        let mut client = ProtocolClient::new(transport, "0.2");
        drop(server);

        let err = client.handshake().await.unwrap_err();
        assert!(matches!(err, MinerError::Connection(_)));
    }

    #[tokio::test]
    async fn reads_greeting() {
        let (transport, server) = MockTransport::pair();
        let mut client = ProtocolClient::new(transport, "0.2");

        server.send("2.7\n");
        assert_eq!(client.handshake().await.unwrap(), "2.7");
    }
}
