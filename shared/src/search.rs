//! Nonce search.
//!
//! [`scan`] is the only part that decides correctness: it walks one nonce
//! range and stops on the first digest equal to the target. [`SearchEngine`]
//! only chooses the order of the ranges it hands to `scan`.

use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::{digest::DigestFunction, errors::MinerResult, interaction::Job};

/// Nonces between two cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// `job.nonce` holds the answer.
    Found { nonce: u64, hashes: u64 },
    /// No nonce in the range reproduces the target; a new job is needed.
    Exhausted { hashes: u64 },
    Cancelled { hashes: u64 },
}

impl SearchOutcome {
    pub fn hashes(&self) -> u64 {
        match *self {
            SearchOutcome::Found { hashes, .. }
            | SearchOutcome::Exhausted { hashes }
            | SearchOutcome::Cancelled { hashes } => hashes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Found,
    Exhausted,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    skip_lower_range: bool,
    cancel: CancellationToken,
}

impl SearchEngine {
    pub fn new(skip_lower_range: bool) -> Self {
        Self { skip_lower_range, cancel: CancellationToken::new() }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Search `job` for the nonce whose digest equals its target.
    ///
    /// Without skipping, the scan runs from the job's current nonce up to the
    /// bound. With skipping, `[difficulty, bound)` is scanned first and
    /// `[0, difficulty)` only if that pass finds nothing.
    pub fn search<D>(&self, job: &mut Job, digest: &D) -> MinerResult<SearchOutcome>
    where
        D: DigestFunction + ?Sized, {
        let mut hashes = 0;

        if !self.skip_lower_range {
            let pass = scan(job, digest, job.difficulty_bound, &self.cancel, &mut hashes)?;
            return Ok(outcome(pass, job, hashes));
        }

        let difficulty = job.difficulty();
        job.nonce = difficulty;
        let pass = scan(job, digest, job.difficulty_bound, &self.cancel, &mut hashes)?;
        if pass != Pass::Exhausted {
            return Ok(outcome(pass, job, hashes));
        }

        debug!("upper range exhausted, searching skipped range 0..{difficulty}");
        job.nonce = 0;
        let pass = scan(job, digest, difficulty, &self.cancel, &mut hashes)?;
        Ok(outcome(pass, job, hashes))
    }
}

fn outcome(pass: Pass, job: &Job, hashes: u64) -> SearchOutcome {
    match pass {
        Pass::Found => SearchOutcome::Found { nonce: job.nonce, hashes },
        Pass::Exhausted => SearchOutcome::Exhausted { hashes },
        Pass::Cancelled => SearchOutcome::Cancelled { hashes },
    }
}

/// Linear scan of `[job.nonce, end)`.
fn scan<D>(
    job: &mut Job,
    digest: &D,
    end: u64,
    cancel: &CancellationToken,
    hashes: &mut u64,
) -> MinerResult<Pass>
where
    D: DigestFunction + ?Sized, {
    while job.nonce < end {
        if job.nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Ok(Pass::Cancelled);
        }

        job.result_digest = digest.digest(&job.challenge_block, job.nonce)?;
        *hashes += 1;

        if job.is_solved() {
            return Ok(Pass::Found);
        }
        job.nonce += 1;
    }
    Ok(Pass::Exhausted)
}
