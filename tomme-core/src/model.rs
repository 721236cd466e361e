//! Domain data structures for collection points, planned pickups, and display frames.

use std::fmt;

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate};
use serde::{Deserialize, Serialize};

const ISO_DATE: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier of a collection point ("standplads" number), e.g. `013165`.
pub struct CollectionPointId(pub String);

impl CollectionPointId {
    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CollectionPointId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Postal and geographic attributes of a physical location.
pub struct Address {
    /// Free-form name of the location.
    pub name: String,
    /// Street name.
    pub street: String,
    /// House number including letters such as “B”.
    pub house_number: String,
    /// Floor, when the address is an apartment.
    pub floor: Option<String>,
    /// Door designation next to the floor.
    pub door: Option<String>,
    /// Postal district name.
    pub postal_district: String,
    /// Postal code.
    pub postal_code: String,
    /// Danish KVHX address code.
    pub kvhx_code: String,
    /// Municipality code.
    pub municipality_code: i64,
    /// Road code within the municipality.
    pub road_code: i64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Physical waste-bin location.
pub struct CollectionPoint {
    /// Identifier used when requesting schedules.
    pub id: CollectionPointId,
    /// Display name.
    pub name: String,
    /// Optional description of the location.
    pub description: Option<String>,
    /// Address the collection point belongs to.
    pub address: Address,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// When the provider last changed the record.
    pub last_modified: DateTime<FixedOffset>,
    /// Optional container description.
    pub container: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Where the date of a planned collection came from.
pub enum DateOrigin {
    /// Parsed from the provider payload.
    Upstream,
    /// The provider value was missing or unparsable and "now" was substituted.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One pickup event and the waste fractions collected on it.
pub struct PlannedCollection {
    /// Pickup time.
    pub date: DateTime<FixedOffset>,
    /// Fraction names in the order the provider sent them.
    pub fractions: Vec<String>,
    /// Whether `date` is real or a substitute.
    pub origin: DateOrigin,
}

impl PlannedCollection {
    /// Create a collection with a date taken from the provider.
    #[must_use]
    pub fn new(date: DateTime<FixedOffset>, fractions: Vec<String>) -> Self {
        Self {
            date,
            fractions,
            origin: DateOrigin::Upstream,
        }
    }

    /// Create a collection whose date could not be read; the current time is used instead.
    #[must_use]
    pub fn with_fallback_date(fractions: Vec<String>) -> Self {
        Self {
            date: Local::now().fixed_offset(),
            fractions,
            origin: DateOrigin::Fallback,
        }
    }

    /// Calendar day of the pickup on the local calendar.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.date.with_timezone(&Local).date_naive()
    }

    /// Relative label for the pickup day as seen from the local calendar.
    #[must_use]
    pub fn date_label(&self) -> String {
        self.date_label_on(Local::now().date_naive())
    }

    /// Relative label for the pickup day as seen from `today`:
    /// `today`, `tomorrow`, or an ISO `YYYY-MM-DD` date.
    #[must_use]
    pub fn date_label_on(&self, today: NaiveDate) -> String {
        let day = self.day();
        if day == today {
            "today".to_owned()
        } else if today.checked_add_days(Days::new(1)) == Some(day) {
            "tomorrow".to_owned()
        } else {
            day.format(ISO_DATE).to_string()
        }
    }

    /// Fraction names joined with `", "`.
    #[must_use]
    pub fn fractions_label(&self) -> String {
        self.fractions.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A collection point with its planned collections.
pub struct Schedule {
    /// Location the schedule belongs to.
    pub collection_point: CollectionPoint,
    /// Planned collections, unordered.
    pub collections: Vec<PlannedCollection>,
}

impl Schedule {
    /// Next pickup from today's local date onwards.
    #[must_use]
    pub fn next_collection(&self) -> Option<&PlannedCollection> {
        self.next_collection_on(Local::now().date_naive())
    }

    /// Earliest collection whose day is on or after `today`.
    ///
    /// Collections with a substituted date are never eligible.
    #[must_use]
    pub fn next_collection_on(&self, today: NaiveDate) -> Option<&PlannedCollection> {
        self.collections
            .iter()
            .filter(|collection| collection.origin == DateOrigin::Upstream)
            .filter(|collection| collection.day() >= today)
            .min_by_key(|collection| collection.date)
    }

    /// All collections falling on the given calendar day.
    #[must_use]
    pub fn collections_on(&self, day: NaiveDate) -> Vec<&PlannedCollection> {
        self.collections
            .iter()
            .filter(|collection| collection.day() == day)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
/// Minimal summary of what the panel shows, compared against the last persisted one.
pub enum DisplayState {
    /// The schedule could not be fetched.
    NoData {
        /// Day the state was computed.
        date: String,
    },
    /// The schedule holds no upcoming collection.
    NoPickups {
        /// Day the state was computed.
        date: String,
    },
    /// An upcoming collection was found.
    Success {
        /// Joined fraction names.
        waste_types: String,
        /// Relative pickup label.
        collection_date: String,
        /// Raw fraction list.
        fractions: Vec<String>,
    },
    /// The cycle failed unexpectedly.
    Error {
        /// Failure description.
        message: String,
        /// Day the state was computed.
        date: String,
    },
}

impl DisplayState {
    /// Build the success state for a collection, labelled relative to `today`.
    #[must_use]
    pub fn success(collection: &PlannedCollection, today: NaiveDate) -> Self {
        Self::Success {
            waste_types: collection.fractions_label(),
            collection_date: collection.date_label_on(today),
            fractions: collection.fractions.clone(),
        }
    }

    /// Build a `NoData` state stamped with `today`.
    #[must_use]
    pub fn no_data(today: NaiveDate) -> Self {
        Self::NoData {
            date: today.format(ISO_DATE).to_string(),
        }
    }

    /// Build a `NoPickups` state stamped with `today`.
    #[must_use]
    pub fn no_pickups(today: NaiveDate) -> Self {
        Self::NoPickups {
            date: today.format(ISO_DATE).to_string(),
        }
    }

    /// Build an `Error` state stamped with `today`.
    #[must_use]
    pub fn error(message: impl Into<String>, today: NaiveDate) -> Self {
        Self::Error {
            message: message.into(),
            date: today.format(ISO_DATE).to_string(),
        }
    }

    /// Status tag as persisted.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::NoData { .. } => "no_data",
            Self::NoPickups { .. } => "no_pickups",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }

    /// Text for the title band.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::NoData { .. } => "No Data",
            Self::NoPickups { .. } => "No Pickups",
            Self::Success { waste_types, .. } => waste_types,
            Self::Error { .. } => "Error",
        }
    }

    /// Text for the date band.
    #[must_use]
    pub fn date_text(&self) -> &str {
        match self {
            Self::NoData { date } | Self::NoPickups { date } | Self::Error { date, .. } => date,
            Self::Success {
                collection_date, ..
            } => collection_date,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Colors a tri-color e-paper panel can show.
pub enum InkyColor {
    /// Paper white.
    #[default]
    White,
    /// Black ink.
    Black,
    /// Red or yellow accent ink.
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Row-major pixel buffer sized to a panel.
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<InkyColor>,
}

impl Frame {
    /// Create a frame filled with white.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, InkyColor::White)
    }

    /// Create a frame filled with one color.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: InkyColor) -> Self {
        let len = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            pixels: vec![color; len],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color at a position, or `None` outside the frame.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<InkyColor> {
        self.index(x, y)
            .and_then(|index| self.pixels.get(index))
            .copied()
    }

    /// Paint a pixel; positions outside the frame are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: InkyColor) {
        if let Some(pixel) = self
            .index(x, y)
            .and_then(|index| self.pixels.get_mut(index))
        {
            *pixel = color;
        }
    }

    /// All pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[InkyColor] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        usize::try_from(u64::from(y) * u64::from(self.width) + u64::from(x)).ok()
    }
}
