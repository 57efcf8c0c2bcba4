//! Coordinate reference systems accepted for zone input geometry.
//!
//! Zones may arrive in a projected system; they are converted to WGS84
//! lon/lat once at load and stay there.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, CoordsIter as _, MapCoords, MultiPolygon};

use crate::SpatialError;
use crate::projection::EqualAreaProjection;

/// Sphere radius used by web mercator.
const WEB_MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// A supported coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Geographic WGS84 lon/lat (`EPSG:4326`, `OGC:CRS84`).
    Wgs84,
    /// Spherical web mercator meters (`EPSG:3857`).
    WebMercator,
    /// Cylindrical equal-area meters (`EPSG:6933`).
    EqualArea,
}

impl Crs {
    /// Canonical `AUTHORITY:CODE` name.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Wgs84 => "EPSG:4326",
            Self::WebMercator => "EPSG:3857",
            Self::EqualArea => "EPSG:6933",
        }
    }

    fn coord_to_lon_lat(self, coord: Coord<f64>) -> Result<Coord<f64>, SpatialError> {
        Ok(match self {
            Self::Wgs84 => coord,
            Self::WebMercator => Coord {
                x: (coord.x / WEB_MERCATOR_RADIUS_M).to_degrees(),
                y: (2.0 * (coord.y / WEB_MERCATOR_RADIUS_M).exp().atan()
                    - std::f64::consts::FRAC_PI_2)
                    .to_degrees(),
            },
            Self::EqualArea => EqualAreaProjection::default().inverse(coord)?,
        })
    }

    /// Converts a geometry in this CRS to WGS84 lon/lat.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidGeometry`] if any coordinate cannot be
    /// converted, or if a converted one is not finite or falls outside the
    /// lon/lat range.
    pub fn to_lon_lat(
        self,
        zone_id: &str,
        geometry: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialError> {
        let converted = geometry
            .try_map_coords(|c| self.coord_to_lon_lat(c))
            .map_err(|e| SpatialError::InvalidGeometry {
                zone_id: zone_id.to_string(),
                message: e.to_string(),
            })?;

        if let Some(bad) = converted.coords_iter().find(|c| !is_lon_lat(*c)) {
            return Err(SpatialError::InvalidGeometry {
                zone_id: zone_id.to_string(),
                message: format!(
                    "coordinate ({}, {}) is not a valid lon/lat after converting from {}",
                    bad.x,
                    bad.y,
                    self.code()
                ),
            });
        }

        Ok(converted)
    }
}

/// Returns `true` for a finite coordinate inside the lon/lat range.
#[must_use]
pub fn is_lon_lat(coord: Coord<f64>) -> bool {
    coord.x.is_finite()
        && coord.y.is_finite()
        && (-180.0..=180.0).contains(&coord.x)
        && (-90.0..=90.0).contains(&coord.y)
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Crs {
    type Err = SpatialError;

    /// Accepts `EPSG:4326`, `epsg:4326`, `OGC:CRS84`, `CRS84`, `WGS84` and
    /// the `urn:ogc:def:crs:` forms used by `GeoJSON` `crs` members.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper
            .strip_prefix("URN:OGC:DEF:CRS:")
            .unwrap_or(&upper)
            .replace("::", ":");

        match name.as_str() {
            "EPSG:4326" | "OGC:CRS84" | "OGC:1.3:CRS84" | "CRS84" | "WGS84" => Ok(Self::Wgs84),
            "EPSG:3857" | "EPSG:900913" => Ok(Self::WebMercator),
            "EPSG:6933" => Ok(Self::EqualArea),
            _ => Err(SpatialError::UnsupportedCrs {
                crs: s.trim().to_string(),
            }),
        }
    }
}
