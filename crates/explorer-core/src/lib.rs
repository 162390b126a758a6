// # explorer-core
//
// Core library for browsing NASA's Astronomy Picture of the Day (APOD) and
// Mars rover photo archives.
//
// ## Architecture Overview
//
// - **NasaApi**: Trait for the remote data client (two parameterized GETs)
// - **validation**: Pure date-range and numeric-bounds checks
// - **ErrorClassifier**: Maps failures into a closed set of user-facing kinds
// - **retry**: Exponential backoff helper for classified failures
// - **Query / QueryCache**: Keyed fetch memoization with last-committed-wins
// - **DailyImageController / RoverPhotoController**: View state for the two
//   archives (selected date; draft vs. committed rover search)
//
// ## Data Flow
//
// user input → controller validates and commits → committed key drives a
// keyed query → NasaApi call → `QueryState` published to subscribers
//
// Validation failures never reach the network layer.

pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod model;
pub mod query;
pub mod retry;
pub mod traits;
pub mod validation;

// Re-export core types for convenience
pub use classify::{AssumeOnline, ClassifiedError, Connectivity, ErrorClassifier, ErrorKind, ManualConnectivity};
pub use config::{ApiConfig, ExplorerConfig, Locale, RetryConfig};
pub use controller::{DailyImageController, RoverPhotoController};
pub use error::{Error, Result, TransportError};
pub use model::{DailyImage, MediaKind, RoverName, RoverPhoto, RoverPhotosResponse, SearchParameters};
pub use query::{Query, QueryCache, QueryKey, QueryState};
pub use retry::{RetryOn, RetryPolicy, retry_with_backoff};
pub use traits::NasaApi;
