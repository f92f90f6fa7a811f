// PrayerChime - daily prayer reminders pushed to your phone
// Main entry point: load config, arm the schedule, poll until Ctrl-C

use log::{error, info};
use prayerchime::app::build_monitor;
use prayerchime::config::Config;
use prayerchime::utils::logging::{init_logging, log_error_with_context};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    info!("Starting PrayerChime {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let monitor = match build_monitor(&config, shutdown).await {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Startup failed: {}", e.to_safe_string());
            return Err(e.into());
        }
    };

    if let Err(e) = monitor.run().await {
        let e = anyhow::Error::from(e);
        log_error_with_context(&e, "Prayer monitor");
        return Err(e);
    }

    Ok(())
}
