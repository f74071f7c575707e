use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::errors::MinerError;

/// Digest algorithm a job is mined with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// SHA-1 over `challenge + nonce`.
    #[default]
    Ducos1a,
    /// Seeded 64-bit xxHash over `challenge + nonce`.
    XxHash,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Ducos1a => "ducos1a",
            Algorithm::XxHash => "xxhash",
        }
    }

    /// Command word of the job request line.
    pub fn job_command(&self) -> &'static str {
        match self {
            Algorithm::Ducos1a => "JOB",
            Algorithm::XxHash => "JOBXX",
        }
    }
}

impl FromStr for Algorithm {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ducos1a" => Ok(Algorithm::Ducos1a),
            "xxhash" => Ok(Algorithm::XxHash),
            _ => Err(MinerError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerName(pub String);

impl MinerName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MinerName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigId(pub String);

impl RigId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RigId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Difficulty tier label sent with every job request (`LOW`, `MEDIUM`, `NET`).
///
/// The server owns the set of tiers, so the label is passed through verbatim.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyTier(pub String);

impl DifficultyTier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DifficultyTier {
    fn default() -> Self {
        DifficultyTier("MEDIUM".to_string())
    }
}

impl Display for DifficultyTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
