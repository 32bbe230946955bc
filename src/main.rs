//! Dashboard - Headless Entry Point
//!
//! Runs the clock and weather services and prints the widget lines whenever
//! they change. Logs go to a daily rolling file so stdout stays readable.

use dashboard::domain::DashboardConfig;
use dashboard::helpers::get_or_create_data_dir;
use dashboard::services::ServiceHub;
use dashboard::widgets::{ClockWidget, WeatherWidget};
use tracing_appender::non_blocking::WorkerGuard;

fn init_tracing() -> anyhow::Result<WorkerGuard> {
    let log_dir = get_or_create_data_dir()?.join("logs");
    let appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_tracing()?;
    tracing::info!("Starting dashboard...");

    let config = DashboardConfig::try_load()?;
    let hub = ServiceHub::new(&config)?;

    let mut clock = ClockWidget::mount(hub.bus(), |line| println!("{line}"));
    let mut weather = WeatherWidget::mount(hub.bus(), |lines| {
        for line in lines {
            println!("{line}");
        }
    });

    hub.start();
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    clock.unmount();
    weather.unmount();
    hub.stop();
    Ok(())
}
