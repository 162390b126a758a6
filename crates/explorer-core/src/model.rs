//! Data model for the two NASA archives
//!
//! Field names follow Rust conventions; serde attributes map them onto the
//! API's JSON names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sol used when no search has been made yet
pub const DEFAULT_SOL: u32 = 1000;

/// Rover used when no search has been made yet
pub const DEFAULT_ROVER: RoverName = RoverName::Curiosity;

/// Astronomy Picture of the Day entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyImage {
    /// Publication date
    pub date: NaiveDate,
    /// Title
    pub title: String,
    /// Explanation written by the APOD editors
    pub explanation: String,
    /// Image (or embedded video) URL, absent for interactive entries
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// High-definition image URL, absent for videos
    #[serde(rename = "hdurl", default, skip_serializing_if = "Option::is_none")]
    pub high_def_url: Option<String>,
    /// Kind of media behind `image_url`
    #[serde(rename = "media_type")]
    pub media_kind: MediaKind,
    /// Copyright holder, absent for public-domain entries
    #[serde(rename = "copyright", default, skip_serializing_if = "Option::is_none")]
    pub copyright_holder: Option<String>,
    /// API service version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,
}

impl DailyImage {
    /// Whether the entry is a still image
    pub fn is_image(&self) -> bool {
        self.media_kind == MediaKind::Image
    }

    /// Best available image URL (HD when present)
    pub fn best_image_url(&self) -> Option<&str> {
        self.high_def_url.as_deref().or(self.image_url.as_deref())
    }
}

/// APOD media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    /// Anything else the archive serves (interactive pages, etc.)
    #[serde(other)]
    Other,
}

/// One of the three Mars rovers served by the photo API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoverName {
    #[default]
    Curiosity,
    Opportunity,
    Spirit,
}

impl RoverName {
    /// All rovers, in display order
    pub const ALL: [RoverName; 3] = [RoverName::Curiosity, RoverName::Opportunity, RoverName::Spirit];

    /// Lowercase name used in API paths
    pub fn as_str(&self) -> &'static str {
        match self {
            RoverName::Curiosity => "curiosity",
            RoverName::Opportunity => "opportunity",
            RoverName::Spirit => "spirit",
        }
    }

    /// Capitalized display name
    pub fn display_name(&self) -> &'static str {
        match self {
            RoverName::Curiosity => "Curiosity",
            RoverName::Opportunity => "Opportunity",
            RoverName::Spirit => "Spirit",
        }
    }
}

impl std::fmt::Display for RoverName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoverName {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "curiosity" => Ok(RoverName::Curiosity),
            "opportunity" => Ok(RoverName::Opportunity),
            "spirit" => Ok(RoverName::Spirit),
            _ => Err(crate::Error::validation("rover", s)),
        }
    }
}

/// Camera that took a rover photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub id: u64,
    /// Short name (e.g. "FHAZ")
    pub name: String,
    #[serde(default)]
    pub rover_id: u64,
    /// Long name (e.g. "Front Hazard Avoidance Camera")
    pub full_name: String,
}

/// Rover mission details embedded in every photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rover {
    pub id: u64,
    pub name: String,
    pub landing_date: NaiveDate,
    pub launch_date: NaiveDate,
    /// Mission status as reported by the API ("active", "complete")
    pub status: String,
}

/// A single Mars rover photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoverPhoto {
    pub id: u64,
    /// Martian day index since landing
    pub sol: u32,
    pub camera: Camera,
    #[serde(rename = "img_src")]
    pub image_url: String,
    pub earth_date: NaiveDate,
    pub rover: Rover,
}

/// Body of the rover photos endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoverPhotosResponse {
    #[serde(default)]
    pub photos: Vec<RoverPhoto>,
}

/// Committed rover search; the only key that drives a photo fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParameters {
    pub sol: u32,
    pub rover: RoverName,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            sol: DEFAULT_SOL,
            rover: DEFAULT_ROVER,
        }
    }
}

/// Static mission metadata shown next to the rover selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoverInfo {
    pub id: RoverName,
    pub name: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

/// Metadata for the three rovers
pub fn available_rovers() -> [RoverInfo; 3] {
    [
        RoverInfo {
            id: RoverName::Curiosity,
            name: RoverName::Curiosity.display_name(),
            status: "Active",
            description: "Active rover exploring Mars since 2012",
        },
        RoverInfo {
            id: RoverName::Opportunity,
            name: RoverName::Opportunity.display_name(),
            status: "Mission Complete",
            description: "Mission completed in 2018 after 15 years",
        },
        RoverInfo {
            id: RoverName::Spirit,
            name: RoverName::Spirit.display_name(),
            status: "Mission Complete",
            description: "Mission completed in 2010 after 6 years",
        },
    ]
}
