//! Mars rover photo view state
//!
//! Keeps a *draft* search (sol, rover) that the user edits freely and a
//! separately *committed* [`SearchParameters`] that is the only fetch key.
//! Draft edits never touch the network; `search()` validates the draft and
//! commits it. The display limit is applied client-side and takes effect
//! immediately.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::classify::{ClassifiedError, ErrorClassifier};
use crate::config::{ExplorerConfig, Locale};
use crate::format;
use crate::model::{self, DEFAULT_SOL, RoverInfo, RoverName, RoverPhoto, RoverPhotosResponse, SearchParameters};
use crate::query::{Query, QueryKey, QueryState};
use crate::retry::RetryPolicy;
use crate::traits::NasaApi;
use crate::validation;

/// Display limit used when none is configured
pub const DEFAULT_MAX_DISPLAY_COUNT: usize = 10;

#[derive(Debug, Clone, Copy)]
struct Draft {
    /// Raw numeric input; validated on search
    sol: f64,
    rover: RoverName,
    max_display_count: usize,
}

/// View state for rover photo searches
pub struct RoverPhotoController {
    api: Arc<dyn NasaApi>,
    query: Query<RoverPhotosResponse>,
    draft: Mutex<Draft>,
    committed: Mutex<SearchParameters>,
}

impl std::fmt::Debug for RoverPhotoController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoverPhotoController")
            .field("api", &self.api.api_name())
            .field("draft", &*self.lock_draft())
            .field("committed", &self.search_parameters())
            .field("query", &self.query)
            .finish()
    }
}

impl RoverPhotoController {
    /// Create a controller committed to the default search (sol 1000, curiosity)
    ///
    /// Nothing is fetched until [`load`](Self::load) or [`search`](Self::search).
    pub fn new(
        api: Arc<dyn NasaApi>,
        classifier: ErrorClassifier,
        retry: Option<RetryPolicy>,
        max_display_count: usize,
    ) -> Self {
        let committed = SearchParameters::default();
        let query = Query::new("marsRoverPhotos", classifier, retry);
        query.commit(QueryKey::rover_photos(&committed));

        let max_display_count = if validation::is_valid_photo_count(max_display_count as f64) {
            max_display_count
        } else {
            DEFAULT_MAX_DISPLAY_COUNT
        };

        Self {
            api,
            query,
            draft: Mutex::new(Draft {
                sol: committed.sol as f64,
                rover: committed.rover,
                max_display_count,
            }),
            committed: Mutex::new(committed),
        }
    }

    /// Create a controller from explorer configuration
    pub fn from_config(api: Arc<dyn NasaApi>, config: &ExplorerConfig) -> Self {
        Self::new(
            api,
            ErrorClassifier::new(config.locale),
            config.retry_policy(),
            config.default_max_display_count,
        )
    }

    /// Draft sol, as entered
    pub fn sol(&self) -> f64 {
        self.lock_draft().sol
    }

    /// Draft rover
    pub fn rover(&self) -> RoverName {
        self.lock_draft().rover
    }

    pub fn max_display_count(&self) -> usize {
        self.lock_draft().max_display_count
    }

    /// Committed search, the key of the current fetch
    pub fn search_parameters(&self) -> SearchParameters {
        *self.lock_committed()
    }

    /// Whether the draft sol would pass `search()`
    pub fn is_sol_valid(&self) -> bool {
        validation::is_valid_sol(self.sol())
    }

    pub fn validate_sol(&self, sol: f64) -> bool {
        validation::is_valid_sol(sol)
    }

    /// Edit the draft sol (no fetch, no validation)
    pub fn handle_sol_change(&self, sol: f64) {
        self.lock_draft().sol = sol;
    }

    /// Switch the draft rover; the draft sol resets to 1000 (no fetch)
    pub fn handle_rover_change(&self, rover: RoverName) {
        let mut draft = self.lock_draft();
        draft.rover = rover;
        draft.sol = DEFAULT_SOL as f64;
        debug!("Draft rover set to {} (sol reset to {})", rover, DEFAULT_SOL);
    }

    /// Change the display limit; applied immediately, no refetch
    pub fn handle_max_photos_change(&self, count: f64) -> Result<(), ClassifiedError> {
        if !validation::is_valid_photo_count(count) {
            return Err(self.query.classifier().validation("photo_count", count));
        }
        self.lock_draft().max_display_count = count as usize;
        Ok(())
    }

    /// Validate the draft and commit it as the new search
    ///
    /// An invalid draft sol returns VALIDATION_SOL and leaves the committed
    /// search untouched.
    pub async fn search(&self) -> Result<QueryState<RoverPhotosResponse>, ClassifiedError> {
        let draft = *self.lock_draft();
        if !validation::is_valid_sol(draft.sol) {
            debug!("Rejected sol {} for search", draft.sol);
            return Err(self.query.classifier().validation("sol", draft.sol));
        }

        let params = SearchParameters {
            sol: draft.sol as u32,
            rover: draft.rover,
        };
        {
            let mut committed = self.lock_committed();
            *committed = params;
            self.query.commit(QueryKey::rover_photos(&params));
        }
        info!("Searching {} photos on sol {}", params.rover, params.sol);

        Ok(self.fetch(params, false).await)
    }

    /// Fetch the committed search (cached results are reused)
    pub async fn load(&self) -> QueryState<RoverPhotosResponse> {
        self.fetch(self.search_parameters(), false).await
    }

    /// Re-issue the committed search, bypassing the cache
    pub async fn refetch(&self) -> QueryState<RoverPhotosResponse> {
        self.fetch(self.search_parameters(), true).await
    }

    /// Current published state
    pub fn state(&self) -> QueryState<RoverPhotosResponse> {
        self.query.state()
    }

    /// Stream of state changes
    pub fn subscribe(&self) -> WatchStream<QueryState<RoverPhotosResponse>> {
        self.query.subscribe()
    }

    /// Fetched photos in API order, empty unless loaded
    pub fn all_photos(&self) -> Vec<RoverPhoto> {
        self.query
            .state()
            .data()
            .map(|response| response.photos.clone())
            .unwrap_or_default()
    }

    /// Fetched photos truncated to the display limit
    pub fn displayed_photos(&self) -> Vec<RoverPhoto> {
        let max = self.max_display_count();
        self.query
            .state()
            .data()
            .map(|response| response.photos.iter().take(max).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of fetched photos before truncation
    pub fn total_photos_count(&self) -> usize {
        self.query.state().data().map_or(0, |response| response.photos.len())
    }

    pub fn available_rovers(&self) -> [RoverInfo; 3] {
        model::available_rovers()
    }

    pub fn rover_display_name(&self, rover: RoverName) -> &'static str {
        rover.display_name()
    }

    pub fn locale(&self) -> Locale {
        self.query.classifier().locale()
    }

    pub fn format_sol_info(&self, sol: u32) -> String {
        format::format_sol_info(sol, self.locale())
    }

    /// Summary line for the current result ("Showing 10 of 10 photos")
    pub fn format_photo_count(&self) -> String {
        format::format_photo_count(
            self.displayed_photos().len(),
            self.total_photos_count(),
            self.max_display_count(),
            self.locale(),
        )
    }

    async fn fetch(&self, params: SearchParameters, force: bool) -> QueryState<RoverPhotosResponse> {
        let api = &self.api;
        self.query
            .fetch(QueryKey::rover_photos(&params), force, || {
                api.fetch_rover_photos(params.sol, params.rover)
            })
            .await
    }

    fn lock_draft(&self) -> MutexGuard<'_, Draft> {
        self.draft.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_committed(&self) -> MutexGuard<'_, SearchParameters> {
        self.committed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
