#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone types shared across the rental map workspace.
//!
//! A zone is a named polygon region, either a neighborhood or a census
//! tract. Zone ids are unique only within their [`ZoneType`] namespace.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Zone namespace.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum ZoneType {
    /// City neighborhoods.
    #[serde(alias = "neighborhoods")]
    #[strum(to_string = "neighborhood", serialize = "neighborhoods")]
    Neighborhood,
    /// Census tracts.
    #[serde(alias = "tracts", alias = "census_tract")]
    #[strum(
        to_string = "tract",
        serialize = "tracts",
        serialize = "census-tracts",
        serialize = "census_tract"
    )]
    Tract,
}

impl ZoneType {
    /// Human-readable plural label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Neighborhood => "Neighborhoods",
            Self::Tract => "Census Tracts",
        }
    }

    /// Human-readable label for a single zone of this type.
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Neighborhood => "Neighborhood",
            Self::Tract => "Census Tract",
        }
    }
}

/// Which zone a scope covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSelect {
    /// Every listing, including ones outside all zones.
    All,
    /// A single zone by id.
    Zone(String),
}

impl ZoneSelect {
    /// Returns the zone id for [`ZoneSelect::Zone`].
    #[must_use]
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Zone(id) => Some(id),
        }
    }
}

impl fmt::Display for ZoneSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Zone(id) => f.write_str(id),
        }
    }
}

impl FromStr for ZoneSelect {
    type Err = std::convert::Infallible;

    /// `"all"` and `"All (<city>)"` select every zone; anything else is a
    /// zone id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower == "all" || lower.starts_with("all (") {
            Ok(Self::All)
        } else {
            Ok(Self::Zone(trimmed.to_string()))
        }
    }
}

/// How to resolve a point that falls inside more than one zone polygon.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OverlapPolicy {
    /// Refuse zone collections whose polygon interiors overlap.
    #[default]
    Reject,
    /// The zone that appears first in the collection wins.
    FirstMatch,
    /// The zone with the smallest equal-area footprint wins, then
    /// collection order.
    SmallestArea,
}

/// A zone polygon in geographic WGS84 (lon/lat) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Zone identifier, unique within its [`ZoneType`].
    pub zone_id: String,
    /// Boundary in lon/lat.
    pub geometry: MultiPolygon<f64>,
    /// Remaining feature properties as strings (e.g. tract codes).
    pub properties: BTreeMap<String, String>,
}

impl Zone {
    /// Creates a zone with no extra properties.
    #[must_use]
    pub fn new(zone_id: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            zone_id: zone_id.into(),
            geometry,
            properties: BTreeMap::new(),
        }
    }

    /// Returns a property value by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// Listing count, equal-area size and density of one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStats {
    /// Zone identifier.
    pub zone_id: String,
    /// Number of listing records inside the zone.
    pub listing_count: u64,
    /// Area in square kilometers, from the equal-area projection.
    pub area_km2: f64,
    /// Listings per square kilometer. Always finite and non-negative.
    pub density: f64,
}

impl ZoneStats {
    /// Builds stats for a zone, deriving density with [`density_per_km2`].
    #[must_use]
    pub fn new(zone_id: impl Into<String>, listing_count: u64, area_km2: f64) -> Self {
        Self {
            zone_id: zone_id.into(),
            listing_count,
            area_km2,
            density: density_per_km2(listing_count, area_km2),
        }
    }
}

/// Listings per square kilometer.
///
/// Returns `0.0` when the count is zero or the area is zero, negative or
/// not finite, so the result is never `NaN` or infinite.
#[must_use]
pub fn density_per_km2(listing_count: u64, area_km2: f64) -> f64 {
    if listing_count == 0 || !area_km2.is_finite() || area_km2 <= 0.0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let density = listing_count as f64 / area_km2;
    if density.is_finite() { density } else { 0.0 }
}
