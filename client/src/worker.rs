use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use shared::{
    digest::{DigestFunction, Digester},
    errors::{MinerError, MinerResult},
    interaction::{Job, SubmitAck},
    search::{SearchEngine, SearchOutcome},
    stream::{Connection, ProtocolClient},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::config::MinerConfig;

type Client = ProtocolClient<Connection>;

/// What the worker does after one get-job / search / report cycle.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Next,
    Shutdown,
}

/// One self-contained mining loop with its own server connection.
///
/// Connects, then repeats get job → search → report until shut down. A
/// closed stream sends it back to connecting; any other failure retries the
/// cycle on the same connection.
pub struct Worker {
    id: usize,
    config: Arc<MinerConfig>,
    digest: Arc<dyn DigestFunction>,
    shutdown: CancellationToken,
}

impl Worker {
    pub fn new(id: usize, config: Arc<MinerConfig>, shutdown: CancellationToken) -> Self {
        let digest = Arc::new(Digester::from(config.algorithm));
        Self { id, config, digest, shutdown }
    }

    #[cfg(test)]
    fn with_digest(mut self, digest: Arc<dyn DigestFunction>) -> Self {
        self.digest = digest;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let span = info_span!("worker", id = self.id);
        tokio::spawn(self.run().instrument(span))
    }

    pub async fn run(self) {
        let engine = SearchEngine::new(self.config.skip).with_cancellation(self.shutdown.clone());

        'connect: loop {
            let Some(mut client) = self.connect().await else {
                break 'connect;
            };

            loop {
                match self.cycle(&mut client, &engine).await {
                    Ok(Step::Next) => {}
                    Ok(Step::Shutdown) => {
                        close(client).await;
                        break 'connect;
                    }
                    Err(err) if err.is_stream_end() => {
                        warn!("{err}, reconnecting");
                        close(client).await;
                        continue 'connect;
                    }
                    Err(err) => {
                        warn!("{err}, retrying");
                    }
                }
            }
        }

        debug!("worker stopped");
    }

    /// Dial until connected. `None` once shutdown is requested.
    async fn connect(&self) -> Option<Client> {
        loop {
            info!("connecting to server: {}", self.config.server);

            let attempt = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                res = ProtocolClient::connect(&self.config.server, self.config.version.as_str()) => res,
            };

            match attempt {
                Ok((client, version)) => {
                    info!("connected to server version: {version}");
                    return Some(client);
                }
                Err(err) => {
                    let delay = self.config.reconnect_delay;
                    error!("fail to connect to server: {err}, retries in {delay:?}");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn cycle(&self, client: &mut Client, engine: &SearchEngine) -> MinerResult<Step> {
        let config = &self.config;

        let job = tokio::select! {
            _ = self.shutdown.cancelled() => return Ok(Step::Shutdown),
            job = client.request_job(config.algorithm, &config.name, &config.difficulty) => job?,
        };
        debug!("job: {} -> {} difficulty {}", job.challenge_block, job.target_digest, job.difficulty());

        let (job, outcome) = match search(job, engine.clone(), self.digest.clone()).await {
            Ok(res) => res,
            Err(err) => {
                warn!("search failed: {err}, fetching a new job");
                return Ok(Step::Next);
            }
        };

        match outcome {
            SearchOutcome::Found { nonce, hashes } => {
                debug!("found nonce {nonce} after {hashes} hashes");
            }
            SearchOutcome::Exhausted { hashes } => {
                info!("no nonce found in {hashes} hashes, fetching a new job");
                return Ok(Step::Next);
            }
            SearchOutcome::Cancelled { .. } => return Ok(Step::Shutdown),
        }

        let ack = tokio::select! {
            _ = self.shutdown.cancelled() => return Ok(Step::Shutdown),
            ack = client.submit_result(&job, &config.name, &config.rig_id, self.id) => ack?,
        };
        info!("submit nonce {}: {}", job.nonce, SubmitAck::classify(&ack));

        Ok(Step::Next)
    }
}

/// Run the CPU-bound search on the blocking pool.
async fn search(
    mut job: Job,
    engine: SearchEngine,
    digest: Arc<dyn DigestFunction>,
) -> MinerResult<(Job, SearchOutcome)> {
    let start = Instant::now();

    let (job, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = engine.search(&mut job, digest.as_ref());
        (job, outcome)
    })
    .await
    .map_err(|err| MinerError::DigestIo(io::Error::new(io::ErrorKind::Other, err)))?;
    let outcome = outcome?;

    let elapsed = start.elapsed().max(Duration::from_micros(1)).as_secs_f64();
    debug!("mining power: {:.2} H/s", outcome.hashes() as f64 / elapsed);

    Ok((job, outcome))
}

async fn close(client: Client) {
    if let Err(err) = client.close().await {
        debug!("close connection: {err}");
    }
}
