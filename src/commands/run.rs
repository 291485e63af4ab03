use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crosspost::browser::ChromeLauncher;
use crosspost::config::store::{load_credentials, load_settings};
use crosspost::config::{Config, KeyValueStore};
use crosspost::controller::{ProcessController, RunOutcome, StartRequest, StatusEvent, StatusSink};
use crosspost::transfer::HttpMediaFetcher;
use crosspost::utils::retry::RetryConfig;

/// Command-line overrides for `crosspost run`
#[derive(Debug, Default)]
pub struct RunParams {
    pub account: Option<String>,
    pub secondary: Option<String>,
    pub tertiary: Option<String>,
    pub items_per_hour: Option<u32>,
    pub headless: bool,
    pub auto_publish: bool,
    pub once: bool,
    pub chrome: Option<PathBuf>,
}

/// Run the relay loop
///
/// Settings resolve lowest to highest: saved store settings, the config
/// file, `CROSSPOST_*` environment variables, then command-line flags.
pub async fn run(config_path: Option<&Path>, params: RunParams) -> Result<()> {
    let located = super::load_config(config_path)?;
    let store = located
        .storage
        .open_store()
        .context("Failed to open settings store")?;
    let stored = load_settings(&store)?;

    let mut config = Config::layered(config_path, &stored)?;
    apply_params(&mut config, &params);
    fill_saved_credentials(&mut config, &store)?;
    config.validate().context("Invalid configuration")?;

    println!("Starting crosspost relay");
    println!("========================");
    for (rank, account) in config.accounts.urls().iter().enumerate() {
        println!("  account #{}: {account}", rank + 1);
    }
    println!(
        "  destination: {}",
        config.credentials.destination.masked_username()
    );
    println!(
        "  schedule: {} item(s) per {} minutes{}",
        config.schedule.items_per_window,
        config.schedule.window_minutes,
        if config.settings.auto_publish {
            ", publishing immediately"
        } else {
            ""
        }
    );
    println!();

    let launcher = match &params.chrome {
        Some(path) => ChromeLauncher::with_executable(path.clone()),
        None => ChromeLauncher::new(),
    };
    let retry = RetryConfig::with_delays(
        config.transfer.max_attempts,
        config.transfer.retry_delay_ms,
        config.transfer.retry_delay_ms.saturating_mul(4),
    );
    let fetcher = HttpMediaFetcher::new(
        config.storage.media_dir(),
        config.settings.page_timeout(),
        retry,
    )
    .context("Failed to create media fetcher")?;

    let (status, events) = StatusSink::channel();
    let controller = ProcessController::new(
        config.clone(),
        Arc::new(launcher),
        Arc::new(fetcher),
        status,
    );

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nStop requested, finishing the current step...");
            stop.stop();
        }
    });
    let printer = tokio::spawn(print_events(events));

    let outcome = controller.start(StartRequest::from_config(&config)).await;
    drop(controller);
    let _ = printer.await;

    match outcome {
        RunOutcome::Finished => {
            println!("\nAll planned cycles finished");
            Ok(())
        }
        RunOutcome::Cancelled => {
            println!("\nStopped");
            Ok(())
        }
        RunOutcome::Failed(reason) => anyhow::bail!("Run failed: {reason}"),
    }
}

fn apply_params(config: &mut Config, params: &RunParams) {
    if let Some(account) = &params.account {
        config.accounts.primary = account.clone();
    }
    if params.secondary.is_some() {
        config.accounts.secondary = params.secondary.clone();
    }
    if params.tertiary.is_some() {
        config.accounts.tertiary = params.tertiary.clone();
    }
    if let Some(items) = params.items_per_hour {
        config.schedule.items_per_window = items;
        config.schedule.window_minutes = 60;
    }
    config.settings.headless |= params.headless;
    config.settings.auto_publish |= params.auto_publish;
    if params.once {
        config.schedule.max_cycles = Some(1);
    }
}

/// Fall back to the login saved with `crosspost store save-credentials`
fn fill_saved_credentials(config: &mut Config, store: &dyn KeyValueStore) -> Result<()> {
    if config.credentials.destination.is_complete() && !config.accounts.primary.trim().is_empty() {
        return Ok(());
    }

    let Some(saved) = load_credentials(store)? else {
        return Ok(());
    };

    if !config.credentials.destination.is_complete() && saved.destination.is_complete() {
        tracing::info!(
            user = %saved.destination.masked_username(),
            "Using saved destination login"
        );
        config.credentials.destination = saved.destination;
    }
    if config.accounts.primary.trim().is_empty() && !saved.account.trim().is_empty() {
        config.accounts.primary = saved.account;
    }
    Ok(())
}

async fn print_events(mut events: UnboundedReceiver<StatusEvent>) {
    while let Some(event) = events.recv().await {
        let now = chrono::Local::now().format("%H:%M:%S");
        match &event {
            StatusEvent::Status(message) => println!("[{now}] {message}"),
            StatusEvent::NewPlan {
                item_count,
                intervals,
            } => {
                let minutes: Vec<String> = intervals.iter().map(|m| format!("{m}m")).collect();
                println!("[{now}] New plan: {item_count} slot(s) [{}]", minutes.join(", "));
            }
            StatusEvent::StartCountdown { seconds } => {
                let next = chrono::Local::now() + chrono::Duration::seconds(*seconds as i64);
                println!(
                    "[{now}] Waiting {}m {:02}s, next slot at {}",
                    seconds / 60,
                    seconds % 60,
                    next.format("%H:%M:%S")
                );
            }
            StatusEvent::Finished => println!("[{now}] Finished"),
            StatusEvent::Failed(reason) => println!("[{now}] Failed: {reason}"),
            StatusEvent::Cancelled => println!("[{now}] Cancelled"),
        }
        if event.is_terminal() {
            break;
        }
    }
}
