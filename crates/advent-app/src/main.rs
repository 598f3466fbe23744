use std::path::PathBuf;

use advent_core::AdventConfig;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() {
    // Init logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_env_filter(filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    info!("Advent starting");
    let config_path = std::env::var_os("ADVENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("advent.toml"));
    let config = match AdventConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            eprintln!("Advent config error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = advent_ui::run(config) {
        eprintln!("Advent error: {e}");
    }
}
