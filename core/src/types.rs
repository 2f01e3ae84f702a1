//! Domain DTOs for the star chart catalog API.
//!
//! # Design
//! These types mirror the server's JSON schema but are defined independently
//! from the mock-server crate. Nullable catalog columns are `Option` so a
//! sparse record still deserializes. Integration tests catch any schema drift
//! between the two crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Main spectral classification of a star.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectralClass {
    O,
    B,
    A,
    F,
    G,
    K,
    M,
    L,
    T,
    Y,
    /// Unknown or unclassified.
    U,
}

impl SpectralClass {
    pub const ALL: [SpectralClass; 11] = [
        SpectralClass::O,
        SpectralClass::B,
        SpectralClass::A,
        SpectralClass::F,
        SpectralClass::G,
        SpectralClass::K,
        SpectralClass::M,
        SpectralClass::L,
        SpectralClass::T,
        SpectralClass::Y,
        SpectralClass::U,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpectralClass::O => "O",
            SpectralClass::B => "B",
            SpectralClass::A => "A",
            SpectralClass::F => "F",
            SpectralClass::G => "G",
            SpectralClass::K => "K",
            SpectralClass::M => "M",
            SpectralClass::L => "L",
            SpectralClass::T => "T",
            SpectralClass::Y => "Y",
            SpectralClass::U => "U",
        }
    }
}

impl fmt::Display for SpectralClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the eleven spectral class codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown spectral class: {0}")]
pub struct UnknownSpectralClass(pub String);

impl FromStr for SpectralClass {
    type Err = UnknownSpectralClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpectralClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| UnknownSpectralClass(s.to_string()))
    }
}

/// A single star. Positional and photometric columns are nullable in the
/// catalog and therefore optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub id: u64,
    pub name: String,
    pub proper_name: Option<String>,
    pub is_primary: bool,
    /// Hipparcos catalog number.
    pub hip: Option<u64>,
    /// Henry Draper catalog number.
    pub hd: Option<u64>,
    /// Harvard Revised catalog number.
    pub hr: Option<u64>,
    /// Gliese catalog designation.
    pub gl: Option<String>,
    pub bayer_flamsteed: Option<String>,
    /// Hours, 0 to 24.
    pub right_ascension: Option<f64>,
    pub right_ascension_degrees: Option<f64>,
    pub declination: Option<f64>,
    pub distance_parsecs: Option<f64>,
    /// Milliarcseconds per year.
    pub proper_motion_ra: Option<f64>,
    pub proper_motion_dec: Option<f64>,
    /// Kilometers per second.
    pub radial_velocity: Option<f64>,
    pub apparent_magnitude: Option<f64>,
    pub absolute_magnitude: Option<f64>,
    pub spectral_type: Option<String>,
    pub spectral_class: SpectralClass,
    /// B-V color index.
    pub color_index: Option<f64>,
    /// Cartesian coordinates in parsecs from the Sun.
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub luminosity: Option<f64>,
    pub variable_type: Option<String>,
    pub variable_min: Option<f64>,
    pub variable_max: Option<f64>,
    pub constellation: Option<String>,
    pub star_system_id: u64,
}

/// A star system and, depending on the endpoint, its stars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_star: Option<Star>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_stars: Option<Vec<Star>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub parsecs: f64,
    pub light_years: f64,
}

/// A star system returned by a proximity query, with its distance from the
/// origin system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStarSystem {
    pub system: StarSystem,
    pub distance: Distance,
}

/// Server-declared state of a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_entries: u64,
    pub total_pages: u32,
}

/// `{ "data": [...], "meta": {...} }` list envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

/// `{ "data": ... }` single-resource envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// Structured error body returned by the server on validated failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Filters shared by the list and nearby endpoints. Every field is optional;
/// absent fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarSystemFilters {
    pub spectral_class: Option<SpectralClass>,
    /// At least this many stars (server requires >= 1).
    pub min_stars: Option<u32>,
    /// At most this many stars (server requires >= 1).
    pub max_stars: Option<u32>,
}

/// Page selection. The server defaults to page 1 with 100 entries and caps
/// `page_size` at 200.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }
}

/// Items that carry a unique numeric id within their collection.
pub trait Identified {
    fn id(&self) -> u64;
}

impl Identified for StarSystem {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Identified for Star {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Identified for NearbyStarSystem {
    fn id(&self) -> u64 {
        self.system.id
    }
}
