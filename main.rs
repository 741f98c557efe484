use std::future::Future;
use std::pin::Pin;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, Timelike};
use log::{error, info};
use tokio::time::MissedTickBehavior;

mod config;
mod cpu;
mod display;
mod error;
mod sampler;
mod scheduler;
mod sense_hat;
mod smoothing;
mod structs;
mod upload;

use config::Config;
use cpu::CpuBiasEstimator;
use display::{Framebuffer, LedMatrix};
use sampler::TemperatureSampler;
use scheduler::{SampleScheduler, ScheduleState};
use sense_hat::SenseHat;
use upload::WundergroundReporter;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const BANNER_HOLD: Duration = Duration::from_secs(1);

type Station = SampleScheduler<SenseHat, CpuBiasEstimator, Framebuffer, WundergroundReporter>;

fn initialize() -> anyhow::Result<Station> {
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        "Station {}: uploading every {} minutes{}",
        config.station_id,
        config.interval.minutes(),
        if config.upload_enabled { "" } else { " (upload disabled)" }
    );

    info!("Initializing the Sense HAT client");
    let sensor = SenseHat::new(config.i2c_bus).context("Unable to initialize the Sense HAT sensors")?;
    let mut display = Framebuffer::open().context("Unable to open the Sense HAT LED matrix")?;
    display
        .show_banner(BANNER_HOLD)
        .context("Unable to write to the Sense HAT LED matrix")?;

    let sampler = TemperatureSampler::new(sensor, CpuBiasEstimator::new(config.cpu_temp));
    let reporter = if config.upload_enabled {
        Some(WundergroundReporter::new(
            config.upload_url,
            config.station_id,
            config.station_key,
            config.upload_timeout,
        ))
    } else {
        None
    };
    let state = ScheduleState::new(config.interval, Local::now().minute());

    info!("Initialization complete!");
    Ok(SampleScheduler::new(sampler, display, reporter, state))
}

// Resolves on Ctrl-C, or SIGTERM when running under systemd.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => error!("Unable to listen for SIGTERM: {}", e),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Runs `setup` after `shutdown` has been polled once, so its signal handlers
/// are installed before any blocking work. Returns `None` if shutdown won.
async fn armed<F, T>(mut shutdown: Pin<&mut F>, setup: impl FnOnce() -> T) -> Option<T>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = shutdown.as_mut() => None,
        value = async move { setup() } => Some(value),
    }
}

async fn run() -> anyhow::Result<()> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut station = match armed(shutdown.as_mut(), initialize).await {
        Some(station) => station?,
        None => return Ok(()),
    };

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                station.on_tick(&Local::now());
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Unable to start the runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = runtime.block_on(run()) {
        error!("{:#}", e);
        return ExitCode::FAILURE;
    }

    info!("Exiting application");
    ExitCode::SUCCESS
}
