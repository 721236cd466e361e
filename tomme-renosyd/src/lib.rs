//! Provider implementation for RenoSyd using the self-service "tømmekalender" API.

mod wire;

use async_trait::async_trait;
use tomme_core::{
    model::{CollectionPointId, Schedule},
    ports::{PortError, SchedulePort},
};
use tomme_http::HttpClient;
use tracing::{error, info};

/// Public RenoSyd self-service API.
pub const DEFAULT_BASE_URL: &str = "https://skoda-selvbetjeningsapi.renosyd.dk";

const API_VERSION: &str = "v1";
const RESOURCE: &str = "toemmekalender";

/// Schedule source backed by the RenoSyd API.
pub struct RenosydScheduleSource {
    client: HttpClient,
}

impl RenosydScheduleSource {
    /// Create a source bound to the given HTTP client.
    ///
    /// The client's base URL should point at the API host, e.g. [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        info!(base_url = ?client.base_url(), "RenoSyd schedule source initialized");
        Self { client }
    }

    /// Path of the collection calendar resource.
    #[must_use]
    pub fn endpoint() -> String {
        format!("/api/{API_VERSION}/{RESOURCE}")
    }
}

#[async_trait]
impl SchedulePort for RenosydScheduleSource {
    async fn schedule(
        &self,
        id: &CollectionPointId,
    ) -> Result<Option<Vec<Schedule>>, PortError> {
        if id.is_blank() {
            return Err(PortError::InvalidCollectionPoint);
        }

        info!(nummer = %id, "Fetching waste schedule");
        let endpoint = Self::endpoint();

        let Some(body) = self
            .client
            .get(&endpoint, &[("nummer", id.as_str())], None)
            .await
        else {
            error!(nummer = %id, "Failed to fetch waste schedule");
            return Ok(None);
        };

        match wire::parse_schedules(&body) {
            Ok(schedules) => {
                info!(count = schedules.len(), "Parsed waste schedules");
                Ok(Some(schedules))
            }
            Err(err) => {
                error!(nummer = %id, error = %err, "Unexpected waste schedule response");
                Ok(None)
            }
        }
    }

    fn close(self: Box<Self>) {
        self.client.close();
        info!("RenoSyd schedule source closed");
    }
}
