//! Nickname Hunter
//!
//! Single-binary Rust agent that:
//! 1. Loads the roster (entertainer credentials + tracked accounts)
//! 2. Signs in its own primary account when credentials are supplied
//! 3. Polls tracked accounts for nickname movement, forever
//! 4. Spends entertainer credentials to occupy vacated nicknames

mod banner;
mod config;
mod reconciler;

use std::sync::Arc;

use anyhow::{Context, Result};
use claim_pool::EntertainerPool;
use gateway::{Gateway, HttpGateway};
use roster::Roster;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::reconciler::{Pacing, Reconciler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    banner::print();
    info!(version = banner::VERSION, "starting nickname-hunter");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.service.base_url,
        data_file = %config.service.data_file.display(),
        priority_nickname = config.claim.priority_nickname.as_deref().unwrap_or("<none>"),
        "configuration loaded"
    );

    let roster = Roster::load(&config.service.data_file)
        .await
        .with_context(|| {
            format!(
                "failed to load roster from {}",
                config.service.data_file.display()
            )
        })?;

    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(
        config.service.base_url.clone(),
        reqwest::Client::new(),
    ));

    // The bot's own session, separate from the entertainer pool. Failure
    // here is fatal; entertainer sign-ins happen lazily per claim.
    match &config.primary {
        Some(primary) => {
            let session = gateway
                .authenticate(&primary.email, primary.password.expose())
                .await
                .context("primary sign-in failed")?;
            info!(account_id = %session.account_id, "primary account signed in");
        }
        None => {
            info!("no primary credential supplied, watching without a session");
        }
    }

    let pool = EntertainerPool::new(
        roster.entertainers,
        config.claim.priority_nickname.clone(),
        gateway.clone(),
    );
    let pacing = Pacing {
        target_delay: config.pacing.target_delay(),
        lookup_cooldown: config.pacing.lookup_cooldown(),
    };
    let cycle_delay = config.pacing.cycle_delay();
    let mut rec = Reconciler::new(gateway, pool, roster.targets, pacing);

    info!(
        targets = rec.targets().len(),
        entertainers = rec.pool().len(),
        cycle_delay_ms = cycle_delay.as_millis() as u64,
        "entering watch loop"
    );

    // The loop runs until interrupted; its only error exit is a
    // claim-path gateway failure, which is fatal.
    let watch: tokio::task::JoinHandle<claim_pool::Result<()>> =
        tokio::spawn(async move {
            loop {
                rec.run_cycle().await?;
                tokio::time::sleep(cycle_delay).await;
            }
        });

    tokio::select! {
        _ = shutdown_signal() => {
            // In-flight claim attempts are not awaited on interrupt
            info!("shutdown complete");
            Ok(())
        }
        result = watch => match result {
            Ok(Ok(())) => anyhow::bail!("watch loop exited without an error"),
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("watch loop failed")),
            Err(e) => Err(anyhow::Error::new(e).context("watch task panicked")),
        },
    }
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
