//! Display cycle: fetch the schedule, derive a snapshot, and redraw only on change.

use chrono::{Local, NaiveDate};
use tracing::{error, info, instrument, warn};

use crate::model::{CollectionPointId, DisplayState, InkyColor};
use crate::ports::{DisplayPort, PortError, RenderPort, SchedulePort};
use crate::state::StateStore;

/// State key holding the snapshot of what the panel currently shows.
pub const LAST_DISPLAY_KEY: &str = "last_display";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of one display cycle.
pub enum CycleOutcome {
    /// The snapshot matched the persisted one; the panel was left alone.
    Unchanged(DisplayState),
    /// The panel was redrawn with this snapshot.
    Updated(DisplayState),
}

impl CycleOutcome {
    /// Snapshot computed during the cycle.
    #[must_use]
    pub fn state(&self) -> &DisplayState {
        match self {
            Self::Unchanged(state) | Self::Updated(state) => state,
        }
    }
}

/// Runs fetch → compare → render cycles for one collection point.
pub struct Orchestrator {
    collection_point: CollectionPointId,
    schedules: Box<dyn SchedulePort>,
    renderer: Box<dyn RenderPort>,
    display: Box<dyn DisplayPort>,
    state: StateStore,
}

impl Orchestrator {
    /// Wire an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        collection_point: CollectionPointId,
        schedules: Box<dyn SchedulePort>,
        renderer: Box<dyn RenderPort>,
        display: Box<dyn DisplayPort>,
        state: StateStore,
    ) -> Self {
        Self {
            collection_point,
            schedules,
            renderer,
            display,
            state,
        }
    }

    /// Snapshot store backing change detection.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Run one full cycle.
    ///
    /// Fetch failures never escape: they become `NoData` or `Error` snapshots.
    /// If drawing the snapshot fails, the `Error` snapshot is drawn instead.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] only when even the error screen cannot be drawn.
    #[instrument(skip_all, fields(nummer = %self.collection_point))]
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, PortError> {
        let today = Local::now().date_naive();
        let snapshot = self.compute_state(today).await;

        match self.apply(snapshot) {
            Ok(outcome) => Ok(outcome),
            Err((DisplayState::Error { .. }, err)) => Err(err),
            Err((_, err)) => {
                error!(error = %err, "Failed to update display");
                self.apply(DisplayState::error(err.to_string(), today))
                    .map_err(|(_, err)| err)
            }
        }
    }

    /// Release the schedule source.
    pub fn close(self) {
        self.schedules.close();
        info!("Orchestrator resources cleaned up");
    }

    async fn compute_state(&self, today: NaiveDate) -> DisplayState {
        info!("Fetching next waste pickup");

        let schedules = match self.schedules.schedule(&self.collection_point).await {
            Ok(Some(schedules)) => schedules,
            Ok(None) => {
                error!("No waste schedule data available");
                return DisplayState::no_data(today);
            }
            Err(err) => {
                error!(error = %err, "Error fetching waste pickup data");
                return DisplayState::error(err.to_string(), today);
            }
        };

        let next = schedules
            .first()
            .and_then(|schedule| schedule.next_collection_on(today));

        match next {
            Some(collection) => DisplayState::success(collection, today),
            None => {
                warn!("No upcoming waste collections found");
                DisplayState::no_pickups(today)
            }
        }
    }

    fn apply(
        &mut self,
        snapshot: DisplayState,
    ) -> Result<CycleOutcome, (DisplayState, PortError)> {
        if !self.state.has_changed(LAST_DISPLAY_KEY, &snapshot) {
            info!(status = snapshot.status(), "Data unchanged - skipping display update");
            return Ok(CycleOutcome::Unchanged(snapshot));
        }

        info!(
            status = snapshot.status(),
            title = snapshot.title(),
            date = snapshot.date_text(),
            "Data changed - updating display"
        );
        if let Err(err) = self.show_title_and_date(snapshot.title(), snapshot.date_text()) {
            return Err((snapshot, err));
        }

        // The panel already shows the new content; a failed write only means
        // the next cycle redraws it once more.
        if let Err(err) = self.state.set(LAST_DISPLAY_KEY, &snapshot) {
            error!(error = %err, "Failed to persist display state");
        }

        Ok(CycleOutcome::Updated(snapshot))
    }

    fn show_title_and_date(&mut self, title: &str, date: &str) -> Result<(), PortError> {
        let frame = self.renderer.title_and_date(title, date)?;
        self.display.set_border(InkyColor::White);
        self.display.show(&frame)?;
        info!("Title and date displayed");
        Ok(())
    }
}
