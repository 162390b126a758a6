//! Core traits for the explorer
//!
//! - [`NasaApi`]: Remote data client for the APOD and rover photo endpoints

pub mod nasa_api;

pub use nasa_api::NasaApi;
