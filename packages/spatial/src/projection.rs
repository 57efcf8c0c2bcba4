//! Equal-area projection used for zone area computation.
//!
//! Lambert cylindrical equal-area on the WGS84 authalic sphere. With a
//! standard parallel of 30° this is the spherical form of `EPSG:6933`.
//! Projected coordinates are in meters and planar area in this system is
//! proportional to ground area, so it is used only for area math; display
//! geometry stays in lon/lat.

use geo::{Area, Coord, MapCoords, MultiPolygon};

use crate::SpatialError;

/// Radius of the sphere with the same surface area as the WGS84 ellipsoid.
pub const AUTHALIC_RADIUS_M: f64 = 6_371_007.181;

const SQ_M_PER_SQ_KM: f64 = 1_000_000.0;

/// Rounding slack on `sin(latitude)` for points projected exactly at a pole.
const POLE_TOLERANCE: f64 = 1e-12;

/// Lambert cylindrical equal-area projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualAreaProjection {
    cos_standard_parallel: f64,
}

impl Default for EqualAreaProjection {
    fn default() -> Self {
        Self::with_standard_parallel(30.0)
    }
}

impl EqualAreaProjection {
    /// Creates a projection true to scale along `degrees` north and south.
    #[must_use]
    pub fn with_standard_parallel(degrees: f64) -> Self {
        Self {
            cos_standard_parallel: degrees.to_radians().cos(),
        }
    }

    /// Projects a lon/lat coordinate (degrees) to meters.
    #[must_use]
    pub fn forward(&self, coord: Coord<f64>) -> Coord<f64> {
        let lambda = coord.x.to_radians();
        let phi = coord.y.to_radians();
        Coord {
            x: AUTHALIC_RADIUS_M * lambda * self.cos_standard_parallel,
            y: AUTHALIC_RADIUS_M * phi.sin() / self.cos_standard_parallel,
        }
    }

    /// Converts projected meters back to lon/lat degrees.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::OutOfProjectionRange`] if `coord` is not
    /// finite or its northing lies beyond a pole.
    pub fn inverse(&self, coord: Coord<f64>) -> Result<Coord<f64>, SpatialError> {
        let lambda = coord.x / (AUTHALIC_RADIUS_M * self.cos_standard_parallel);
        let sin_phi = coord.y * self.cos_standard_parallel / AUTHALIC_RADIUS_M;
        if !lambda.is_finite() || !sin_phi.is_finite() || sin_phi.abs() > 1.0 + POLE_TOLERANCE {
            return Err(SpatialError::OutOfProjectionRange {
                projection: "EPSG:6933",
                x: coord.x,
                y: coord.y,
            });
        }
        Ok(Coord {
            x: lambda.to_degrees(),
            y: sin_phi.clamp(-1.0, 1.0).asin().to_degrees(),
        })
    }

    /// Reprojects a lon/lat multipolygon into the equal-area plane.
    #[must_use]
    pub fn project(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|c| self.forward(c))
    }

    /// Area of a lon/lat multipolygon in square kilometers.
    #[must_use]
    pub fn area_km2(&self, geometry: &MultiPolygon<f64>) -> f64 {
        self.project(geometry).unsigned_area() / SQ_M_PER_SQ_KM
    }
}
