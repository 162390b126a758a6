//! Astronomy Picture of the Day view state
//!
//! Holds the selected date (default: today). Every valid date change
//! commits the date and fetches the picture keyed by it; invalid input is
//! rejected and the previous date is kept.

use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::classify::{ClassifiedError, ErrorClassifier};
use crate::config::{ExplorerConfig, Locale};
use crate::format;
use crate::model::DailyImage;
use crate::query::{Query, QueryKey, QueryState};
use crate::retry::RetryPolicy;
use crate::traits::NasaApi;
use crate::validation;

/// View state for the daily image
pub struct DailyImageController {
    api: Arc<dyn NasaApi>,
    query: Query<DailyImage>,
    /// `None` lets the server pick the date
    selected: Mutex<Option<NaiveDate>>,
}

impl std::fmt::Debug for DailyImageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyImageController")
            .field("api", &self.api.api_name())
            .field("selected", &self.selected_date())
            .field("query", &self.query)
            .finish()
    }
}

impl DailyImageController {
    /// Create a controller with today's date selected
    ///
    /// Nothing is fetched until [`load`](Self::load) or a date change.
    pub fn new(api: Arc<dyn NasaApi>, classifier: ErrorClassifier, retry: Option<RetryPolicy>) -> Self {
        let today = validation::today();
        let query = Query::new("apod", classifier, retry);
        query.commit(QueryKey::daily_image(Some(today)));

        Self {
            api,
            query,
            selected: Mutex::new(Some(today)),
        }
    }

    /// Create a controller from explorer configuration
    pub fn from_config(api: Arc<dyn NasaApi>, config: &ExplorerConfig) -> Self {
        Self::new(api, ErrorClassifier::new(config.locale), config.retry_policy())
    }

    /// Currently committed date (`None` = server default)
    pub fn selected_date(&self) -> Option<NaiveDate> {
        *self.lock_selected()
    }

    /// Whether the committed date is inside the APOD range
    pub fn is_date_valid(&self) -> bool {
        self.selected_date()
            .is_none_or(|date| validation::daily_image_date_range().contains(date))
    }

    /// Check user input without committing it
    pub fn validate_date(&self, input: &str) -> bool {
        validation::is_valid_daily_image_date(input)
    }

    /// Fetch the picture for the committed date (cached results are reused)
    pub async fn load(&self) -> QueryState<DailyImage> {
        self.fetch(self.selected_date(), false).await
    }

    /// Validate `input` and, if valid, commit it and fetch
    ///
    /// An empty input selects the server's default date. Invalid input
    /// returns a VALIDATION_DATE error and keeps the previous date.
    pub async fn handle_date_change(&self, input: &str) -> Result<QueryState<DailyImage>, ClassifiedError> {
        if !validation::is_valid_daily_image_date(input) {
            debug!("Rejected APOD date input: {:?}", input);
            return Err(self.query.classifier().validation("date", input));
        }

        let date = validation::parse_date(input);
        self.select(date);
        info!("Selected APOD date: {}", self.format_date_for_display());

        Ok(self.fetch(date, false).await)
    }

    /// Reset the selection to today and fetch
    pub async fn clear_date(&self) -> QueryState<DailyImage> {
        let today = validation::today();
        self.select(Some(today));
        self.fetch(Some(today), false).await
    }

    /// Re-issue the last request, bypassing the cache
    pub async fn refetch(&self) -> QueryState<DailyImage> {
        self.fetch(self.selected_date(), true).await
    }

    /// Current published state
    pub fn state(&self) -> QueryState<DailyImage> {
        self.query.state()
    }

    /// Stream of state changes
    pub fn subscribe(&self) -> WatchStream<QueryState<DailyImage>> {
        self.query.subscribe()
    }

    /// Picture for the committed date, once loaded
    pub fn daily_image(&self) -> Option<Arc<DailyImage>> {
        self.query.state().data().cloned()
    }

    pub fn locale(&self) -> Locale {
        self.query.classifier().locale()
    }

    pub fn format_date_for_display(&self) -> String {
        format::format_date_display(self.selected_date(), self.locale())
    }

    fn select(&self, date: Option<NaiveDate>) {
        let mut selected = self.lock_selected();
        *selected = date;
        self.query.commit(QueryKey::daily_image(date));
    }

    async fn fetch(&self, date: Option<NaiveDate>, force: bool) -> QueryState<DailyImage> {
        let api = &self.api;
        self.query
            .fetch(QueryKey::daily_image(date), force, || api.fetch_daily_image(date))
            .await
    }

    fn lock_selected(&self) -> MutexGuard<'_, Option<NaiveDate>> {
        self.selected.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
