//! Digest adapters used by the nonce search.
//!
//! Both variants hash the UTF-8 text `challenge + decimal(nonce)` and render
//! the result as lowercase hex. The set is closed: the server only ever
//! advertises these two algorithms.

use std::io;

use sha1::{Digest, Sha1};
use xxhash_rust::xxh64::Xxh64;

use crate::{
    errors::{MinerError, MinerResult},
    types::Algorithm,
};

/// Seed of the xxHash variant.
pub const XXHASH_SEED: u64 = 2811;

/// Pure mapping from `(challenge, nonce)` to a digest string.
pub trait DigestFunction: Send + Sync {
    fn digest(&self, challenge: &str, nonce: u64) -> MinerResult<String>;
}

/// Hex SHA-1 of `challenge + nonce`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ducos1a;

impl DigestFunction for Ducos1a {
    fn digest(&self, challenge: &str, nonce: u64) -> MinerResult<String> {
        let mut hasher = Sha1::new();
        hasher.update(challenge.as_bytes());
        hasher.update(nonce.to_string().as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Hex xxHash64 of `challenge + nonce`, fed through an `io::Write` sink.
#[derive(Debug, Clone, Copy)]
pub struct Ducos1xx {
    seed: u64,
}

impl Default for Ducos1xx {
    fn default() -> Self {
        Self { seed: XXHASH_SEED }
    }
}

impl DigestFunction for Ducos1xx {
    fn digest(&self, challenge: &str, nonce: u64) -> MinerResult<String> {
        let input = format!("{challenge}{nonce}");
        let mut sink = XxhWriter(Xxh64::new(self.seed));
        io::copy(&mut input.as_bytes(), &mut sink).map_err(MinerError::DigestIo)?;
        // not zero padded
        Ok(format!("{:x}", sink.0.digest()))
    }
}

struct XxhWriter(Xxh64);

impl io::Write for XxhWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Digest adapter selected by a job's [`Algorithm`].
#[derive(Debug, Clone, Copy)]
pub enum Digester {
    Ducos1a(Ducos1a),
    XxHash(Ducos1xx),
}

impl Digester {
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Ducos1a => Digester::Ducos1a(Ducos1a),
            Algorithm::XxHash => Digester::XxHash(Ducos1xx::default()),
        }
    }
}

impl From<Algorithm> for Digester {
    fn from(algorithm: Algorithm) -> Self {
        Digester::for_algorithm(algorithm)
    }
}

impl DigestFunction for Digester {
    fn digest(&self, challenge: &str, nonce: u64) -> MinerResult<String> {
        match self {
            Digester::Ducos1a(inner) => inner.digest(challenge, nonce),
            Digester::XxHash(inner) => inner.digest(challenge, nonce),
        }
    }
}
