//! # deviotd: deviot gateway daemon
//!
//! Composition root that wires the adapters together and runs a gateway.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the tracing subscriber
//! - Build the MQTT connector and the catalog client
//! - Register the virtual devices and publish their telemetry periodically
//! - Stop the gateway on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It only wires crates together; gateway behaviour lives in `deviot-app`.

mod config;

use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use deviot_adapter_catalog_http::HttpCatalog;
use deviot_adapter_mqtt::MqttConnector;
use deviot_adapter_virtual::VirtualFleet;
use deviot_app::gateway::Gateway;

use config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let catalog = HttpCatalog::new(&config.catalog)?;
    let mqtt = config.broker.mqtt();
    let gateway = Gateway::create(
        config.gateway_settings(),
        |binding| MqttConnector::new(binding, mqtt),
        |_| catalog,
    );
    tracing::info!(
        gateway = %gateway.identity().name,
        broker = %format!("{}:{}", config.broker.host, config.broker.port),
        catalog = %gateway.catalog_address(),
        "gateway created"
    );

    let fleet = config.integrations.virtual_enabled.then(VirtualFleet::default);
    if let Some(fleet) = &fleet {
        for instance in fleet.instances() {
            gateway.register_thing(instance);
        }
    }

    gateway.start().await?;

    let mut telemetry = tokio::time::interval(config.integrations.telemetry_interval());
    telemetry.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(err) = result {
                    tracing::error!(error = %err, "failed to listen for shutdown signal");
                }
                break;
            }
            _ = telemetry.tick() => {
                let Some(fleet) = &fleet else { continue };
                for payload in fleet.telemetry() {
                    if let Err(err) = gateway.send_data(&payload).await {
                        tracing::warn!(error = %err, "failed to publish telemetry");
                    }
                }
            }
        }
    }

    tracing::info!("shutting down");
    gateway.stop().await?;
    Ok(())
}
