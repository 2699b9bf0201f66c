use std::sync::Arc;

use clap::Parser;
use ntp_sentinel::{
    config::{Config, read_config_file},
    engine::EngineHandle,
    probe::{LoggingClock, SimTimeSource},
    registry::Registry,
    storage::MemoryStore,
};
use tokio::sync::RwLock;
use tracing::{debug, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,

    /// API bind address
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("ntp_sentinel", LevelFilter::TRACE),
        ("sentineld", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides();
    config.validate()?;

    let registry = Arc::new(RwLock::new(Registry::from_config(&config)?));
    let store = Arc::new(MemoryStore::new());

    // simulated time source and dry-run clock; deployments swap in
    // protocol-speaking implementations here
    let engine = EngineHandle::spawn(
        &config,
        registry.clone(),
        Arc::new(SimTimeSource::default()),
        Arc::new(LoggingClock),
        store.clone(),
    );

    #[cfg(feature = "api")]
    {
        let api_config = ntp_sentinel::api::ApiConfig {
            bind_addr: args.listen.parse()?,
            ..ntp_sentinel::api::ApiConfig::default()
        };
        let state = ntp_sentinel::api::ApiState::new(engine.clone(), registry, store);
        ntp_sentinel::api::spawn_api_server(api_config, state).await?;
    }

    debug!(
        "monitoring {} servers every {}s",
        config.servers.len(),
        config.monitor.sync_interval_secs
    );

    tokio::signal::ctrl_c().await?;
    debug!("shutting down");
    engine.shutdown().await?;

    Ok(())
}
