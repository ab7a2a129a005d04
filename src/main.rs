use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use log::{error, info};
use tokio::sync::mpsc;

mod accessory;
mod commands;
mod config;
mod controller;
mod error;
mod messages;
mod mqtt;
mod platform;
mod probe;
mod remote;
#[cfg(test)]
mod testing;

/// Exposes Sky Q boxes as television accessories over MQTT.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Remote control port (49160 for Sky Q, 5900 for older boxes)
    #[arg(long, default_value_t = remote::SKY_Q_PORT)]
    remote_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    let args = Args::parse();
    let config_contents = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let config: config::AppConfig =
        toml::de::from_str(&config_contents).context("parsing configuration")?;

    let (mqtt_client, mut eventloop) = mqtt::MqttClient::new(&config.mqtt);
    mqtt_client.subscribe().await?;

    let (tx, rx) = mpsc::channel(10);
    let mqtt_loop = mqtt_client.clone();
    tokio::spawn(async move {
        mqtt_loop.event_loop(&mut eventloop, tx).await;
    });

    let platform = platform::Platform::start(
        config.raw_devices(),
        Arc::new(remote::SkyRemote::new(args.remote_port)),
        Arc::new(probe::SkyQProbe::new()?),
        Arc::new(mqtt_client.clone()),
    )
    .await;
    let platform = Arc::new(platform);

    let reconciling = platform.clone();
    tokio::spawn(async move {
        reconciling.reconciled().await;
        info!("All devices reconciled");
    });

    tokio::select! {
        _ = platform.clone().run(rx) => {
            info!("Request loop finished");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!("Error waiting for Ctrl+C: {:?}", err);
            }
            info!("Shutting down");
        }
    }

    mqtt_client.disconnect().await?;

    Ok(())
}
