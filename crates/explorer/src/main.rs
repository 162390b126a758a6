// # nasa-explorer
//
// Thin runner over explorer-core: reads configuration from the environment,
// loads one Astronomy Picture of the Day and one Mars rover photo search,
// and prints the results. All validation, caching and error classification
// live in explorer-core.
//
// ## Configuration
//
// ### API
// - `NASA_API_BASE_URL`: API base URL (default https://api.nasa.gov)
// - `NASA_API_KEY`: api.nasa.gov key (default DEMO_KEY)
// - `NASA_HTTP_TIMEOUT_SECS`: Request timeout in seconds (optional)
//
// ### Retry (off unless one of these is set)
// - `NASA_RETRY_MAX`: Retries after the first attempt (0-10)
// - `NASA_RETRY_BASE_DELAY_MS`: Base backoff delay in milliseconds
//
// ### Presentation
// - `NASA_LOCALE`: Message language (en, pt-br)
// - `NASA_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ### Run parameters
// - `NASA_APOD_DATE`: YYYY-MM-DD (default today)
// - `NASA_ROVER`: curiosity, opportunity, spirit (default curiosity)
// - `NASA_SOL`: Martian day 1-4000 (default 1000)
// - `NASA_MAX_PHOTOS`: Photos to display, 1-50 (default 10)
//
// ## Example
//
// ```bash
// export NASA_API_KEY=your_key
// export NASA_ROVER=spirit
// export NASA_SOL=42
//
// nasa-explorer
// ```

use anyhow::{Context, Result};
use explorer_client_nasa::NasaClient;
use explorer_core::config::{self, ApiConfig, RetryConfig};
use explorer_core::model::RoverName;
use explorer_core::query::QueryState;
use explorer_core::traits::NasaApi;
use explorer_core::{DailyImageController, ExplorerConfig, Locale, RoverPhotoController, validation};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tokio::task::JoinError;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Process exit codes
#[derive(Debug, Clone, Copy)]
enum ExplorerExitCode {
    /// Both views loaded
    Success = 0,
    /// Configuration or startup error
    ConfigError = 1,
    /// A request failed
    RuntimeError = 2,
}

impl From<ExplorerExitCode> for ExitCode {
    fn from(code: ExplorerExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Runner configuration, as read from the environment
struct Config {
    base_url: String,
    api_key: String,
    timeout_secs: Option<u64>,
    retry_max: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    locale: Locale,
    log_level: String,
    apod_date: Option<String>,
    rover: Option<RoverName>,
    sol: Option<f64>,
    max_photos: Option<f64>,
}

/// Read an optional variable, treating empty as unset
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Read and parse an optional variable
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("{} is not valid: '{}'", name, value))
        })
        .transpose()
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: var("NASA_API_BASE_URL").unwrap_or_else(|| config::DEFAULT_BASE_URL.to_string()),
            api_key: var("NASA_API_KEY").unwrap_or_else(|| config::DEMO_API_KEY.to_string()),
            timeout_secs: parse_var("NASA_HTTP_TIMEOUT_SECS")?,
            retry_max: parse_var("NASA_RETRY_MAX")?,
            retry_base_delay_ms: parse_var("NASA_RETRY_BASE_DELAY_MS")?,
            locale: parse_var("NASA_LOCALE")?.unwrap_or_default(),
            log_level: var("NASA_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            apod_date: env::var("NASA_APOD_DATE").ok(),
            rover: parse_var("NASA_ROVER")?,
            sol: parse_var("NASA_SOL")?,
            max_photos: parse_var("NASA_MAX_PHOTOS")?,
        })
    }

    /// Validate run parameters and the log level
    ///
    /// API and retry settings are checked by `ExplorerConfig::validate`.
    fn validate(&self) -> Result<()> {
        if let Some(date) = &self.apod_date
            && !validation::is_valid_daily_image_date(date)
        {
            let range = validation::daily_image_date_range();
            anyhow::bail!(
                "NASA_APOD_DATE must be a YYYY-MM-DD date between {} and {}. Got: {}",
                range.min,
                range.max,
                date
            );
        }

        if let Some(sol) = self.sol
            && !validation::is_valid_sol(sol)
        {
            anyhow::bail!(
                "NASA_SOL must be a whole number between 1 and {}. Got: {}",
                validation::MAX_SOL,
                sol
            );
        }

        if let Some(count) = self.max_photos
            && !validation::is_valid_photo_count(count)
        {
            anyhow::bail!(
                "NASA_MAX_PHOTOS must be a whole number between 1 and {}. Got: {}",
                validation::MAX_PHOTO_COUNT,
                count
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "NASA_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Library configuration derived from the environment
    fn explorer_config(&self) -> ExplorerConfig {
        let mut api = ApiConfig::new(self.base_url.clone(), self.api_key.clone());
        api.timeout_secs = self.timeout_secs;

        let retry = (self.retry_max.is_some() || self.retry_base_delay_ms.is_some()).then(|| {
            let defaults = RetryConfig::default();
            RetryConfig {
                max_retries: self.retry_max.unwrap_or(defaults.max_retries),
                base_delay_ms: self.retry_base_delay_ms.unwrap_or(defaults.base_delay_ms),
            }
        });

        let mut explorer = ExplorerConfig {
            api,
            retry,
            locale: self.locale,
            ..ExplorerConfig::default()
        };
        if let Some(count) = self.max_photos {
            explorer.default_max_display_count = count as usize;
        }
        explorer
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExplorerExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ExplorerExitCode::ConfigError.into();
    }

    let explorer = config.explorer_config();
    if let Err(e) = explorer.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ExplorerExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExplorerExitCode::ConfigError.into();
    }

    info!("Starting nasa-explorer");
    debug!("API configuration: {:?}", explorer.api);

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ExplorerExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(config, explorer).await {
            Ok(()) => ExplorerExitCode::Success,
            Err(e) => {
                error!("{}", e);
                ExplorerExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Load both views once and print them
async fn run(config: Config, explorer: ExplorerConfig) -> Result<()> {
    let client = NasaClient::new(&explorer.api)?;
    info!("Using {} at {}", client.api_name(), client.base_url());
    let api: Arc<dyn NasaApi> = Arc::new(client);

    let daily = DailyImageController::from_config(Arc::clone(&api), &explorer);
    let rovers = RoverPhotoController::from_config(Arc::clone(&api), &explorer);

    let daily_log = tokio::spawn(log_transitions("apod", daily.subscribe()));
    let rovers_log = tokio::spawn(log_transitions("marsRoverPhotos", rovers.subscribe()));

    let daily_state = match &config.apod_date {
        Some(date) => daily.handle_date_change(date).await?,
        None => daily.load().await,
    };

    let rover_state = if config.rover.is_some() || config.sol.is_some() {
        if let Some(rover) = config.rover {
            rovers.handle_rover_change(rover);
        }
        if let Some(sol) = config.sol {
            rovers.handle_sol_change(sol);
        }
        rovers.search().await?
    } else {
        rovers.load().await
    };

    print_daily_image(&daily);
    print_rover_photos(&rovers);

    // Dropping the controllers closes the state streams
    drop(daily);
    drop(rovers);
    let (daily_done, rovers_done) = tokio::join!(daily_log, rovers_log);
    log_join("apod", daily_done);
    log_join("marsRoverPhotos", rovers_done);

    let failures: Vec<String> = [daily_state.error(), rover_state.error()]
        .into_iter()
        .flatten()
        .map(|error| format!("{}: {}", error.code(), error.message))
        .collect();
    if !failures.is_empty() {
        anyhow::bail!("{}", failures.join("; "));
    }
    Ok(())
}

/// Log every published state of one view
async fn log_transitions<T>(name: &'static str, mut states: WatchStream<QueryState<T>>)
where
    T: Send + Sync + 'static,
{
    while let Some(state) = states.next().await {
        match &state {
            QueryState::Idle => debug!("[{}] idle", name),
            QueryState::Loading { key } => debug!("[{}] loading {}", name, key),
            QueryState::Success { key, .. } => debug!("[{}] loaded {}", name, key),
            QueryState::Error { key, error } => debug!("[{}] {} failed: {}", name, key, error.code()),
        }
    }
}

/// Report how a state logging task ended; `false` if it failed
fn log_join(name: &str, result: Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("[{}] state logging task failed: {}", name, e);
            false
        }
    }
}

fn print_daily_image(daily: &DailyImageController) {
    println!("== Astronomy Picture of the Day ({}) ==", daily.format_date_for_display());
    match (daily.daily_image(), daily.state().error()) {
        (Some(image), _) => {
            println!("{} ({})", image.title, image.date);
            match image.best_image_url() {
                Some(url) => println!("{}", url),
                None => println!("(interactive entry, no image URL)"),
            }
            if let Some(holder) = &image.copyright_holder {
                println!("© {}", holder);
            }
            println!();
            println!("{}", image.explanation);
        }
        (None, Some(error)) => println!("{}", error.message),
        (None, None) => {}
    }
    println!();
}

fn print_rover_photos(rovers: &RoverPhotoController) {
    let params = rovers.search_parameters();
    println!(
        "== {} - {} ==",
        rovers.rover_display_name(params.rover),
        rovers.format_sol_info(params.sol)
    );
    if let Some(error) = rovers.state().error() {
        println!("{}", error.message);
        return;
    }
    println!("{}", rovers.format_photo_count());
    for photo in rovers.displayed_photos() {
        println!("#{} [{}] {} {}", photo.id, photo.camera.name, photo.earth_date, photo.image_url);
    }
}
