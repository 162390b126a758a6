//! Test doubles and common utilities for controller contract tests
//!
//! `MockNasaApi` counts calls, records request parameters, can be scripted
//! to fail, and can hold individual requests open until a test releases
//! them (to reorder responses).

#![allow(dead_code)]

use chrono::NaiveDate;
use explorer_core::error::{Error, Result};
use explorer_core::model::{Camera, DailyImage, MediaKind, Rover, RoverName, RoverPhoto, RoverPhotosResponse};
use explorer_core::traits::NasaApi;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Number of photos returned for a sol unless configured otherwise
pub const DEFAULT_PHOTOS_PER_SOL: usize = 30;

/// A scriptable NasaApi that tracks calls
pub struct MockNasaApi {
    daily_calls: AtomicUsize,
    rover_calls: AtomicUsize,
    daily_requests: Mutex<Vec<Option<NaiveDate>>>,
    rover_requests: Mutex<Vec<(u32, RoverName)>>,
    photos_per_sol: Mutex<HashMap<u32, usize>>,
    failures: Mutex<VecDeque<Error>>,
    sol_gates: Mutex<HashMap<u32, Arc<Notify>>>,
    date_gates: Mutex<HashMap<Option<NaiveDate>, Arc<Notify>>>,
}

impl MockNasaApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            daily_calls: AtomicUsize::new(0),
            rover_calls: AtomicUsize::new(0),
            daily_requests: Mutex::new(Vec::new()),
            rover_requests: Mutex::new(Vec::new()),
            photos_per_sol: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            sol_gates: Mutex::new(HashMap::new()),
            date_gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn daily_call_count(&self) -> usize {
        self.daily_calls.load(Ordering::SeqCst)
    }

    pub fn rover_call_count(&self) -> usize {
        self.rover_calls.load(Ordering::SeqCst)
    }

    pub fn daily_requests(&self) -> Vec<Option<NaiveDate>> {
        self.daily_requests.lock().unwrap().clone()
    }

    pub fn rover_requests(&self) -> Vec<(u32, RoverName)> {
        self.rover_requests.lock().unwrap().clone()
    }

    /// Return `count` photos for `sol`
    pub fn set_photos_for_sol(&self, sol: u32, count: usize) {
        self.photos_per_sol.lock().unwrap().insert(sol, count);
    }

    /// Fail the next call (of either kind) with `error`
    pub fn fail_next(&self, error: Error) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Fail the next call with an HTTP status
    pub fn fail_next_with_status(&self, status: u16) {
        self.fail_next(Error::http_status(status, "", "https://api.nasa.gov/mock"));
    }

    /// Hold rover requests for `sol` until the returned handle is notified
    pub fn gate_sol(&self, sol: u32) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.sol_gates.lock().unwrap().insert(sol, Arc::clone(&gate));
        gate
    }

    /// Hold daily image requests for `date` until the returned handle is notified
    pub fn gate_date(&self, date: Option<NaiveDate>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.date_gates.lock().unwrap().insert(date, Arc::clone(&gate));
        gate
    }

    fn take_failure(&self) -> Option<Error> {
        self.failures.lock().unwrap().pop_front()
    }
}

#[async_trait::async_trait]
impl NasaApi for MockNasaApi {
    async fn fetch_daily_image(&self, date: Option<NaiveDate>) -> Result<DailyImage> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        self.daily_requests.lock().unwrap().push(date);

        let gate = self.date_gates.lock().unwrap().get(&date).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        Ok(sample_daily_image(date.unwrap_or_else(|| day("2024-01-01"))))
    }

    async fn fetch_rover_photos(&self, sol: u32, rover: RoverName) -> Result<RoverPhotosResponse> {
        self.rover_calls.fetch_add(1, Ordering::SeqCst);
        self.rover_requests.lock().unwrap().push((sol, rover));

        let gate = self.sol_gates.lock().unwrap().get(&sol).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let count = self
            .photos_per_sol
            .lock()
            .unwrap()
            .get(&sol)
            .copied()
            .unwrap_or(DEFAULT_PHOTOS_PER_SOL);
        Ok(RoverPhotosResponse {
            photos: (0..count as u64).map(|id| sample_photo(id, sol, rover)).collect(),
        })
    }

    fn api_name(&self) -> &'static str {
        "mock"
    }
}

/// Wait until `condition` holds, yielding to other tasks in between
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn sample_daily_image(date: NaiveDate) -> DailyImage {
    DailyImage {
        date,
        title: format!("Picture for {}", date),
        explanation: "A view of the sky.".to_string(),
        image_url: Some(format!("https://apod.nasa.gov/apod/image/{}.jpg", date)),
        high_def_url: None,
        media_kind: MediaKind::Image,
        copyright_holder: None,
        service_version: Some("v1".to_string()),
    }
}

pub fn sample_photo(id: u64, sol: u32, rover: RoverName) -> RoverPhoto {
    RoverPhoto {
        id,
        sol,
        camera: Camera {
            id: 20,
            name: "FHAZ".to_string(),
            rover_id: 5,
            full_name: "Front Hazard Avoidance Camera".to_string(),
        },
        image_url: format!("https://mars.nasa.gov/{}/{}/{}.jpg", rover, sol, id),
        earth_date: day("2015-05-30"),
        rover: Rover {
            id: 5,
            name: rover.display_name().to_string(),
            landing_date: day("2012-08-06"),
            launch_date: day("2011-11-26"),
            status: "active".to_string(),
        },
    }
}
