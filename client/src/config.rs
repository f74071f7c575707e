use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use shared::types::{Algorithm, DifficultyTier, MinerName, RigId};

pub const DEFAULT_SERVER: &str = "149.91.88.18:6000";
pub const DEFAULT_RIG_ID: &str = "SETID";
pub const DEFAULT_RECONNECT_DELAY: u64 = 5;

#[derive(Parser, Debug, Default)]
#[command(about, version)]
pub struct Args {
    #[arg(long, env = "DUCOSERVER", value_name = "HOST:PORT", help = "Job server address and port")]
    pub server: Option<String>,

    #[arg(long, env = "MINERNAME", help = "Miner name (required)")]
    pub name: Option<String>,

    #[arg(long, env = "HOSTNAME", value_name = "RIG_ID", help = "Rig identifier")]
    pub id: Option<String>,

    #[arg(long, env = "DIFF", value_name = "TIER", help = "Difficulty tier LOW/MEDIUM/NET")]
    pub diff: Option<String>,

    #[arg(long, env = "ALGO", value_name = "ALGORITHM", help = "Algorithm ducos1a/xxhash")]
    pub algo: Option<String>,

    #[arg(
        long,
        value_name = "COUNT",
        allow_negative_numbers = true,
        help = "Number of workers, each with its own connection"
    )]
    pub threads: Option<i64>,

    #[arg(long, help = "Search above the advertised difficulty before the range below it")]
    pub skip: bool,

    #[arg(long, help = "Turn off console logging")]
    pub quiet: bool,

    #[arg(long, help = "Log every line sent to and received from the server")]
    pub debug: bool,

    #[arg(long, value_name = "SECONDS", help = "Delay between failed connection attempts")]
    pub reconnect_delay: Option<u64>,

    #[arg(long, env = "DS_MINER_CONFIG", value_name = "FILE", help = "JSON config file")]
    pub config: Option<PathBuf>,
}

/// Optional JSON config file. Command line and environment take precedence.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct FileConfig {
    pub server: Option<String>,
    pub name: Option<String>,
    pub rig_id: Option<String>,
    pub difficulty: Option<String>,
    pub algorithm: Option<String>,
    pub threads: Option<i64>,
    pub skip: Option<bool>,
    pub quiet: Option<bool>,
    pub debug: Option<bool>,
    pub reconnect_delay_secs: Option<u64>,
}

pub fn load_config_file<P>(config_file: P) -> anyhow::Result<FileConfig>
where
    P: AsRef<Path>, {
    let path = config_file.as_ref();
    let file = File::open(path).with_context(|| format!("{} config file not found", path.display()))?;
    let config =
        serde_json::from_reader(file).with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

/// Settings every worker reads. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub server: String,
    pub name: MinerName,
    pub rig_id: RigId,
    pub difficulty: DifficultyTier,
    pub algorithm: Algorithm,
    pub threads: usize,
    pub skip: bool,
    pub quiet: bool,
    pub debug: bool,
    pub reconnect_delay: Duration,
    /// Client version reported with each result.
    pub version: String,
}

impl MinerConfig {
    pub fn resolve(args: Args, version: &str) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => load_config_file(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file, version)
    }

    fn merge(args: Args, file: FileConfig, version: &str) -> anyhow::Result<Self> {
        let name = pick(args.name, file.name)
            .context("miner name is required, set --name or MINERNAME")?;

        let algorithm = pick(args.algo, file.algorithm)
            .map(|algo| algo.parse::<Algorithm>())
            .transpose()?
            .unwrap_or_default();

        let threads = args.threads.or(file.threads).unwrap_or(1);

        Ok(Self {
            server: pick(args.server, file.server).unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            name: MinerName(name),
            rig_id: RigId(pick(args.id, file.rig_id).unwrap_or_else(|| DEFAULT_RIG_ID.to_string())),
            difficulty: pick(args.diff, file.difficulty).map(DifficultyTier).unwrap_or_default(),
            algorithm,
            threads: usize::try_from(threads).ok().filter(|n| *n > 0).unwrap_or(1),
            skip: args.skip || file.skip.unwrap_or(false),
            quiet: args.quiet || file.quiet.unwrap_or(false),
            debug: args.debug || file.debug.unwrap_or(false),
            reconnect_delay: Duration::from_secs(
                args.reconnect_delay.or(file.reconnect_delay_secs).unwrap_or(DEFAULT_RECONNECT_DELAY),
            ),
            version: version.to_string(),
        })
    }
}

/// First non-blank value, command line before file.
fn pick(arg: Option<String>, file: Option<String>) -> Option<String> {
    arg.into_iter().chain(file).map(|v| v.trim().to_string()).find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn args(name: &str) -> Args {
        Args { name: Some(name.to_string()), ..Default::default() }
    }

    #[test]
    fn defaults() {
        let config = MinerConfig::merge(args("alice"), FileConfig::default(), "0.2").unwrap();
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.name.as_str(), "alice");
        assert_eq!(config.rig_id.as_str(), "SETID");
        assert_eq!(config.difficulty.as_str(), "MEDIUM");
        assert_eq!(config.algorithm, Algorithm::Ducos1a);
        assert_eq!(config.threads, 1);
        assert!(!config.skip && !config.quiet && !config.debug);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.version, "0.2");
    }

    #[test]
    fn name_is_required() {
        let err = MinerConfig::merge(Args::default(), FileConfig::default(), "0.2").unwrap_err();
        assert!(err.to_string().contains("miner name is required"));

        let blank = args("  ");
        assert!(MinerConfig::merge(blank, FileConfig::default(), "0.2").is_err());
    }

    #[test]
    fn unsupported_algorithm_is_rejected() {
        let args = Args { algo: Some("scrypt".into()), ..args("alice") };
        let err = MinerConfig::merge(args, FileConfig::default(), "0.2").unwrap_err();
        assert!(err.to_string().contains("unsupported algorithm"));
    }

    #[test]
    fn non_positive_threads_fall_back_to_one() {
        for threads in [0, -4] {
            let args = Args { threads: Some(threads), ..args("alice") };
            assert_eq!(MinerConfig::merge(args, FileConfig::default(), "0.2").unwrap().threads, 1);
        }
        let args = Args { threads: Some(6), ..args("alice") };
        assert_eq!(MinerConfig::merge(args, FileConfig::default(), "0.2").unwrap().threads, 6);
    }

    #[test]
    fn command_line_overrides_file() {
        let file = FileConfig {
            server: Some("10.0.0.1:6000".into()),
            name: Some("bob".into()),
            rig_id: Some("".into()),
            algorithm: Some("xxhash".into()),
            threads: Some(4),
            skip: Some(true),
            ..Default::default()
        };
        let args = Args { server: Some("127.0.0.1:7000".into()), ..args("alice") };

        let config = MinerConfig::merge(args, file, "0.2").unwrap();
        assert_eq!(config.server, "127.0.0.1:7000");
        assert_eq!(config.name.as_str(), "alice");
        assert_eq!(config.rig_id.as_str(), "SETID");
        assert_eq!(config.algorithm, Algorithm::XxHash);
        assert_eq!(config.threads, 4);
        assert!(config.skip);
    }

    #[test]
    fn reads_json_file() {
        let path = std::env::temp_dir().join(format!("ds-miner-config-{}.json", std::process::id()));
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{"name": "carol", "difficulty": "NET", "reconnect_delay_secs": 1}}"#).unwrap();

        let args = Args { config: Some(path.clone()), ..Default::default() };
        let config = MinerConfig::resolve(args, "0.2").unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.name.as_str(), "carol");
        assert_eq!(config.difficulty.as_str(), "NET");
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
    }

    #[test]
    fn missing_file_is_an_error() {
        let args = Args { config: Some(PathBuf::from("/nonexistent/ds-miner.json")), ..args("alice") };
        assert!(MinerConfig::resolve(args, "0.2").is_err());
    }
}
