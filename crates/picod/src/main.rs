use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;

use picod::clock::TokioClock;
use picod::config::Config;
use picod::controller::Controller;
use picod::hass::HassApi;
use picod::hass::RestClient;

#[derive(Parser, Debug)]
#[command(about = "Pico remote dispatcher for Home Assistant lights", version)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "picod.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_file(&args.config)?;

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(config.logging.level))
        .init();

    info!("picod starting");
    info!("loaded config from {}", args.config.display());

    let api: Arc<dyn HassApi> = Arc::new(RestClient::new(&config.hass)?);
    let clock = Arc::new(TokioClock);
    let poll_interval = config.hass.poll_interval;

    let mut handles = Vec::new();
    for (name, remote) in config.remotes {
        info!(
            "starting remote {} (sensor: {}, entity: {})",
            name, remote.sensor, remote.entity
        );

        let controller = Controller::new(name, remote, poll_interval, api.clone(), clock.clone());
        handles.push(tokio::spawn(async move { controller.run().await }));
    }

    if handles.is_empty() {
        warn!("no remotes configured, nothing to dispatch");
    }

    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal");

    for handle in &handles {
        handle.abort();
    }

    info!("picod shutdown complete");

    Ok(())
}
