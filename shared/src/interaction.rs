//! Line formats exchanged with the job server.
//!
//! ```text
//! server -> client  <version>                                  greeting
//! client -> server  JOB,<name>,<tier> | JOBXX,<name>,<tier>    job request
//! server -> client  <challenge>,<target>,<difficulty>[,...]    job
//! client -> server  <nonce>,<hashrate>,<name>,<version> <thread>x<rig>
//! server -> client  GOOD | BAD... | ...                        acknowledgement
//! ```

use std::fmt::{Display, Formatter};

use crate::{
    errors::{MinerError, MinerResult},
    types::{Algorithm, DifficultyTier, MinerName, RigId},
};

pub const SEPARATOR: char = ',';

/// Scale between the advertised difficulty and the nonce range.
pub const DIFFICULTY_SCALE: u64 = 100;

/// One mining assignment, owned by a single worker for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub algorithm: Algorithm,
    pub challenge_block: String,
    pub target_digest: String,
    /// Exclusive upper bound of the nonce range, `difficulty * 100 + 1`.
    pub difficulty_bound: u64,
    pub nonce: u64,
    pub result_digest: String,
}

impl Job {
    pub fn new(
        algorithm: Algorithm,
        challenge_block: impl Into<String>,
        target_digest: impl Into<String>,
        difficulty_bound: u64,
    ) -> Self {
        Self {
            algorithm,
            challenge_block: challenge_block.into(),
            target_digest: target_digest.into(),
            difficulty_bound,
            nonce: 0,
            result_digest: String::new(),
        }
    }

    /// Parse a job response line.
    pub fn from_response(algorithm: Algorithm, line: &str) -> MinerResult<Self> {
        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        if fields.len() < 3 {
            return Err(MinerError::Protocol(format!(
                "expected 3 fields in job response, got {}: `{line}`",
                fields.len()
            )));
        }

        let text = fields[2];
        let bound = parse_difficulty(text)
            .and_then(difficulty_bound)
            .ok_or_else(|| MinerError::Parse(text.to_string()))?;

        Ok(Job::new(algorithm, fields[0], fields[1], bound))
    }

    /// Difficulty as advertised by the server, before scaling.
    pub fn difficulty(&self) -> u64 {
        self.difficulty_bound.saturating_sub(1) / DIFFICULTY_SCALE
    }

    pub fn is_solved(&self) -> bool {
        !self.result_digest.is_empty() && self.result_digest == self.target_digest
    }
}

/// Plain base-10 digits only. No sign, no whitespace.
fn parse_difficulty(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `difficulty * 100 + 1`, or `None` when that does not fit in a `u64`.
pub fn difficulty_bound(difficulty: u64) -> Option<u64> {
    difficulty.checked_mul(DIFFICULTY_SCALE)?.checked_add(1)
}

pub fn job_request_line(algorithm: Algorithm, miner: &MinerName, tier: &DifficultyTier) -> String {
    format!("{},{},{}", algorithm.job_command(), miner, tier)
}

/// Result submission line. Hash rate is always reported as zero.
pub fn submit_line(job: &Job, miner: &MinerName, version: &str, thread: usize, rig: &RigId) -> String {
    format!("{},{},{},{} {}x{}", job.nonce, 0, miner, version, thread, rig)
}

/// How the server answered a submission. Only used for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAck {
    Accepted,
    Rejected(String),
    Other(String),
}

impl SubmitAck {
    pub fn classify(line: &str) -> Self {
        let line = line.trim();
        if line == "GOOD" {
            SubmitAck::Accepted
        } else if line.starts_with("BAD") {
            SubmitAck::Rejected(line.to_string())
        } else {
            SubmitAck::Other(line.to_string())
        }
    }
}

impl Display for SubmitAck {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitAck::Accepted => write!(f, "accepted"),
            SubmitAck::Rejected(reason) => write!(f, "rejected ({reason})"),
            SubmitAck::Other(line) => write!(f, "unknown reply `{line}`"),
        }
    }
}
