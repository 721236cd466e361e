//! Shows the next RenoSyd waste pickup on a small e-paper panel.
//!
//! Run without arguments to refresh on a timer, or with `clear` to blank the
//! panel to white and exit.

mod canvas;
mod display;
mod layout;
mod settings;

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tomme_core::{
    model::{CollectionPointId, InkyColor},
    ports::DisplayPort,
    service::{CycleOutcome, Orchestrator},
    state::StateStore,
};
use tomme_http::HttpClient;
use tomme_renosyd::RenosydScheduleSource;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::display::PngDisplay;
use crate::layout::TitleAndDateLayout;
use crate::settings::Settings;

const USER_AGENT: &str = concat!("tomme/", env!("CARGO_PKG_VERSION"));

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return Err(err.into());
        }
    };

    let mut display = PngDisplay::new(
        settings.display.width,
        settings.display.height,
        &settings.display.output,
    );
    if std::env::args().nth(1).as_deref() == Some("clear") {
        display.clear(InkyColor::White)?;
        info!("Display cleared to white");
        return Ok(());
    }

    if let Err(err) = settings.validate() {
        error!(error = %err, "Invalid configuration");
        return Err(err.into());
    }

    // HTTP + schedule source
    let client = HttpClient::builder()
        .base_url(settings.base_url.clone())
        .timeout(settings.timeout)
        .max_retries(settings.max_retries)
        .backoff_base(settings.backoff_base)
        .user_agent(USER_AGENT)
        .build()?;
    let source = RenosydScheduleSource::new(client);

    let layout = TitleAndDateLayout::new(display.width(), display.height());
    let mut orchestrator = Orchestrator::new(
        CollectionPointId(settings.nummer.clone()),
        Box::new(source),
        Box::new(layout),
        Box::new(display),
        StateStore::open(&settings.state_file),
    );

    run(&mut orchestrator, &settings).await;

    orchestrator.close();
    info!("Shut down");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(orchestrator: &mut Orchestrator, settings: &Settings) {
    if settings.run_once {
        cycle(orchestrator).await;
        return;
    }

    info!(interval = ?settings.refresh_interval, "Starting refresh loop");
    let mut interval = tokio::time::interval(settings.refresh_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => cycle(orchestrator).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping refresh loop");
                return;
            }
        }
    }
}

async fn cycle(orchestrator: &mut Orchestrator) {
    match orchestrator.run_cycle().await {
        Ok(CycleOutcome::Updated(state)) => {
            info!(status = state.status(), title = state.title(), "Display updated");
        }
        Ok(CycleOutcome::Unchanged(state)) => {
            info!(status = state.status(), "Display unchanged");
        }
        Err(err) => error!(error = %err, "Display cycle failed"),
    }
}
