//! Audit consumer: logs every catalog change event published on Redis.

use std::env;

use catalog_server::config::loader::{CONFIG_PATH_ENV, load_config, resolve_config_path};
use catalog_server::events::RedisEventSubscriber;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    catalog_server::observability::init_tracing();

    let (config_path, _) =
        resolve_config_path(env::args().skip(1), env::var(CONFIG_PATH_ENV).ok());
    let cfg = load_config(Some(&config_path)).map_err(anyhow::Error::msg)?;
    catalog_server::observability::apply_logging_level(&cfg.logging.level);

    if !cfg.redis.enabled {
        anyhow::bail!("the audit consumer requires redis.enabled = true");
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        signal.cancel();
    });

    let reconnect_delay = cfg.events.reconnect_delay();
    RedisEventSubscriber::new(cfg.redis.url, cfg.events.channel)
        .with_reconnect_delay(reconnect_delay)
        .run(shutdown, |event| {
            tracing::info!(
                product_id = %event.product_id,
                review_id = ?event.review_id.map(|id| id.get()),
                action = %event.action,
                "catalog change"
            );
        })
        .await;

    Ok(())
}
