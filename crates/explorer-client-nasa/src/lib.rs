// # NASA API Client
//
// `NasaApi` implementation over api.nasa.gov.
//
// ## Behavior
//
// - One HTTP GET per call; no retry, no caching (both owned by the keyed
//   query in explorer-core)
// - Non-success statuses, timeouts, connection and decode failures are
//   returned as tagged `TransportError`s for the classifier
// - Optional request timeout from `ApiConfig`
//
// ## Security Requirements
//
// - API key NEVER appears in logs, `Debug` output or error URLs
//
// ## API Reference
//
// - APOD: GET `/planetary/apod?api_key=...&date=YYYY-MM-DD` (date optional)
// - Mars rover photos: GET `/mars-photos/api/v1/rovers/:rover/photos?api_key=...&sol=N`

use async_trait::async_trait;
use chrono::NaiveDate;
use explorer_core::config::ApiConfig;
use explorer_core::model::{DailyImage, RoverName, RoverPhotosResponse};
use explorer_core::traits::NasaApi;
use explorer_core::validation::DATE_FORMAT;
use explorer_core::{Error, Result, TransportError};
use reqwest::{Request, Url};
use serde::de::DeserializeOwned;

/// APOD endpoint path
const APOD_PATH: &str = "/planetary/apod";

/// Query parameter carrying the key; stripped from URLs surfaced in errors
const API_KEY_PARAM: &str = "api_key";

/// HTTP client for the APOD and Mars rover photo endpoints
pub struct NasaClient {
    /// HTTP client for API requests
    client: reqwest::Client,

    /// Base URL without a trailing slash
    base_url: String,

    /// api.nasa.gov key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Configured timeout, reported in timeout errors
    timeout_secs: Option<u64>,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for NasaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NasaClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl NasaClient {
    /// Create a client from API configuration
    ///
    /// Fails with `Error::Config` if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the APOD request (`date` omitted means the server's current day)
    pub fn build_daily_image_request(&self, date: Option<NaiveDate>) -> Result<Request> {
        let url = format!("{}{}", self.base_url, APOD_PATH);
        let mut request = self.client.get(url).query(&[(API_KEY_PARAM, self.api_key.as_str())]);
        if let Some(date) = date {
            request = request.query(&[("date", date.format(DATE_FORMAT).to_string())]);
        }
        request.build().map_err(|e| self.map_error(e))
    }

    /// Build the rover photo request for one sol
    pub fn build_rover_photos_request(&self, sol: u32, rover: RoverName) -> Result<Request> {
        let url = format!("{}/mars-photos/api/v1/rovers/{}/photos", self.base_url, rover.as_str());
        self.client
            .get(url)
            .query(&[(API_KEY_PARAM, self.api_key.as_str())])
            .query(&[("sol", sol)])
            .build()
            .map_err(|e| self.map_error(e))
    }

    /// Execute a request and decode its JSON body
    async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let url = redact_url(request.url());
        tracing::debug!("GET {}", url);

        let response = self.client.execute(request).await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered {}", url, status);
            return Err(Error::http_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                url,
            ));
        }

        response.json::<T>().await.map_err(|e| self.map_error(e))
    }

    /// Map a reqwest failure onto the transport taxonomy
    ///
    /// The URL is dropped from the message since it carries the key.
    fn map_error(&self, error: reqwest::Error) -> Error {
        let transport = if error.is_timeout() {
            TransportError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if error.is_connect() {
            TransportError::Connect(error.without_url().to_string())
        } else if error.is_decode() {
            TransportError::Decode(error.without_url().to_string())
        } else {
            TransportError::Request(error.without_url().to_string())
        };
        transport.into()
    }
}

#[async_trait]
impl NasaApi for NasaClient {
    async fn fetch_daily_image(&self, date: Option<NaiveDate>) -> Result<DailyImage> {
        let request = self.build_daily_image_request(date)?;
        let image: DailyImage = self.execute(request).await?;
        tracing::info!("Fetched daily image for {}: {}", image.date, image.title);
        Ok(image)
    }

    async fn fetch_rover_photos(&self, sol: u32, rover: RoverName) -> Result<RoverPhotosResponse> {
        let request = self.build_rover_photos_request(sol, rover)?;
        let response: RoverPhotosResponse = self.execute(request).await?;
        tracing::info!("Fetched {} photos from {} on sol {}", response.photos.len(), rover, sol);
        Ok(response)
    }

    fn api_name(&self) -> &'static str {
        "api.nasa.gov"
    }
}

/// URL with the API key parameter removed
fn redact_url(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != API_KEY_PARAM)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    let mut clean = url.clone();
    if pairs.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(pairs);
    }
    clean.to_string()
}
