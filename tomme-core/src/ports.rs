//! Traits describing the schedule source, renderer, and display collaborators.

use async_trait::async_trait;

use crate::model::{CollectionPointId, Frame, InkyColor, Schedule};

#[derive(thiserror::Error, Debug)]
/// Errors raised by the collaborators of a display cycle.
pub enum PortError {
    /// The provider answered with a payload of an unexpected shape.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    /// The collection point identifier cannot be used for a request.
    #[error("Invalid collection point id")]
    InvalidCollectionPoint,
    /// Drawing a frame failed.
    #[error("Render error: {0}")]
    Render(String),
    /// The display rejected or could not show a frame.
    #[error("Display error: {0}")]
    Display(String),
    /// Internal provider error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Trait for backends that deliver waste collection schedules.
pub trait SchedulePort: Send + Sync {
    /// Fetch the schedules registered for a collection point.
    ///
    /// `Ok(None)` means no usable result could be obtained; the reason has
    /// already been logged.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request cannot be made at all.
    async fn schedule(&self, id: &CollectionPointId)
    -> Result<Option<Vec<Schedule>>, PortError>;

    /// Release pooled resources such as network connections.
    fn close(self: Box<Self>) {}
}

/// Trait for turning display text into a panel-sized frame.
pub trait RenderPort: Send + Sync {
    /// Draw a two-band layout with `title` on top and `date` below.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Render`] when the frame cannot be drawn.
    fn title_and_date(&self, title: &str, date: &str) -> Result<Frame, PortError>;
}

/// Trait for a physical or simulated e-paper panel.
pub trait DisplayPort: Send {
    /// Panel width in pixels.
    fn width(&self) -> u32;

    /// Panel height in pixels.
    fn height(&self) -> u32;

    /// Select the color of the panel border for the next refresh.
    fn set_border(&mut self, color: InkyColor);

    /// Push a frame to the panel.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Display`] when the frame does not fit or cannot be written.
    fn show(&mut self, frame: &Frame) -> Result<(), PortError>;
}
