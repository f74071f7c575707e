use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{format, time::ChronoLocal},
    EnvFilter,
};

/// Install the global subscriber.
///
/// `quiet` silences console output entirely, `debug` lowers the default level
/// so every line sent to and received from the server is logged. `RUST_LOG`
/// directives still apply on top of the default.
pub fn init_log(quiet: bool, debug: bool) {
    let format = format::format()
        .with_level(true)
        .with_target(false)
        .with_timer(ChronoLocal::new("[%m-%d %H:%M:%S%.3f]".to_string()))
        .compact();

    let level = default_level(quiet, debug);
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(env_filter).event_format(format).init();
}

fn default_level(quiet: bool, debug: bool) -> LevelFilter {
    match (quiet, debug) {
        (true, _) => LevelFilter::OFF,
        (false, true) => LevelFilter::DEBUG,
        (false, false) => LevelFilter::INFO,
    }
}
