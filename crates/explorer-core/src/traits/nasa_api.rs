// # NASA API Trait
//
// Defines the interface for the remote data client.
//
// ## Implementations
//
// - HTTP: `explorer-client-nasa` crate
// - Test doubles: `tests/common/mod.rs`
//
// ## Usage
//
// ```rust,ignore
// use explorer_core::{NasaApi, RoverName};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let api = /* NasaApi implementation */;
//
//     // Today's picture (the server picks the date)
//     let image = api.fetch_daily_image(None).await?;
//
//     // Curiosity's photos on sol 1000
//     let photos = api.fetch_rover_photos(1000, RoverName::Curiosity).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::{DailyImage, RoverName, RoverPhotosResponse};

/// Trait for remote data clients
///
/// Implementations issue exactly one request per call and propagate
/// transport failures untouched as [`crate::TransportError`]. They must not
/// retry, classify or cache: the keyed query and the controllers own those
/// concerns.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait NasaApi: Send + Sync {
    /// Fetch the Astronomy Picture of the Day
    ///
    /// # Parameters
    ///
    /// - `date`: Day to fetch; `None` lets the server pick today
    async fn fetch_daily_image(&self, date: Option<NaiveDate>) -> crate::Result<DailyImage>;

    /// Fetch the photos a rover took on a given sol
    ///
    /// Photos are returned in API order.
    ///
    /// # Parameters
    ///
    /// - `sol`: Martian day since landing
    /// - `rover`: Rover to query
    async fn fetch_rover_photos(
        &self,
        sol: u32,
        rover: RoverName,
    ) -> crate::Result<RoverPhotosResponse>;

    /// Client name (for logging/debugging)
    fn api_name(&self) -> &'static str;
}
