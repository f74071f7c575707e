use std::{process::exit, sync::Arc};

use cfg_if::cfg_if;
use clap::{CommandFactory, Parser};
use futures_util::future;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::{
    config::{Args, MinerConfig},
    worker::Worker,
};

mod config;
mod worker;

cfg_if! {
    if #[cfg(feature = "build-version")] {
        include!(concat!(env!("OUT_DIR"), "/version.rs"));
    } else {
        pub const VERSION: &str = "unknown";
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match MinerConfig::resolve(args, VERSION) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            eprintln!("error: {err:#}\n");
            let _ = Args::command().print_help();
            exit(1);
        }
    };

    shared::log::init_log(config.quiet, config.debug);

    info!(
        "Starting ds-miner version {VERSION}. server: {}, name: {}, rig: {}, algorithm: {}, difficulty: {}, threads: {}, skip: {}",
        config.server,
        config.name,
        config.rig_id,
        config.algorithm,
        config.difficulty,
        config.threads,
        config.skip
    );

    let shutdown = CancellationToken::new();

    let handles: Vec<_> = (0..config.threads)
        .map(|id| Worker::new(id, config.clone(), shutdown.child_token()).spawn())
        .collect();

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C: {err}");
                return;
            }
            info!("ctrl+c received. stopping workers");
            shutdown.cancel();
        }
    });

    // workers only return on shutdown
    for res in future::join_all(handles).await {
        if let Err(err) = res {
            error!("worker task failed: {err:?}");
        }
    }

    info!("all workers stopped");
}
