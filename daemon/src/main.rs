use anyhow::{Context, Result};
use autocloser_daemon::{
    collector::DefaultCollector,
    config::Config,
    detector::Thresholds,
    error::InstanceError,
    install::locate_install,
    instance::InstanceLock,
    monitor::ActivityMonitor,
    notifier::{Notifier, APP_NAME},
    sampler::Sampler,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const INSTANCE_NAME: &str = "autocloser-single-instance";

const WELCOME: &str = "This program runs in the background monitoring the download manager.\n\
It will automatically close it when downloads finish.";

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = Config::config_path();
    let loaded = Config::load_optional(&config_path);
    let config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => Config::default(),
    };

    init_tracing(&config.general.log_level);
    info!("{} starting...", APP_NAME);
    match loaded {
        Ok(Some(_)) => info!("Loaded config from {:?}", config_path),
        Ok(None) => info!("No config file found, using defaults"),
        Err(e) => warn!("Failed to load config: {}, using defaults", e),
    }

    let notifier = Notifier::new();
    let _lock = match InstanceLock::acquire(INSTANCE_NAME) {
        Ok(lock) => lock,
        Err(InstanceError::AlreadyHeld(_)) => {
            warn!("Another instance is already running, exiting");
            notifier.warning(APP_NAME, "Program is already running.");
            return Ok(());
        }
        Err(e) => return Err(e).context("failed to acquire single-instance lock"),
    };

    if config.notifications.welcome {
        notifier.info(APP_NAME, WELCOME);
    }

    match locate_install(&config.general) {
        Ok(path) => info!("Install path found: {}", path.display()),
        Err(e) => {
            warn!("Could not find install path: {}", e);
            info!(
                "Will attempt to find process by name '{}' anyway.",
                config.general.process_name
            );
        }
    }

    let sampler = Sampler::new(DefaultCollector::new(), config.target());
    let mut monitor = ActivityMonitor::new(sampler, Thresholds::DEFAULT);
    if config.notifications.on_close {
        monitor = monitor.with_notifier(notifier);
    }

    monitor.run(shutdown_signal()).await;
    info!("{} stopped", APP_NAME);
    Ok(())
}
