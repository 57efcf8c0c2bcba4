#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for zone attribution.
//!
//! Builds an R-tree over zone bounding boxes and refines candidates with
//! an exact point-in-polygon test. Each zone's equal-area size is computed
//! once at build time. How overlapping zones are treated is governed by an
//! explicit [`OverlapPolicy`].

pub mod crs;
pub mod projection;

use std::collections::BTreeMap;

use geo::{BoundingRect, Contains, CoordsIter as _, MultiPolygon, Relate};
use rental_map_zone_models::{OverlapPolicy, Zone, ZoneType};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

use crate::crs::is_lon_lat;
use crate::projection::EqualAreaProjection;

/// Errors raised while building or querying a [`ZoneIndex`].
///
/// Every variant describes malformed input data.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// A zone's geometry is missing, empty or has invalid coordinates.
    #[error("Invalid geometry for zone '{zone_id}': {message}")]
    InvalidGeometry {
        /// Offending zone.
        zone_id: String,
        /// What is wrong with it.
        message: String,
    },

    /// Two zones in one collection share an id.
    #[error("Duplicate {zone_type} zone id '{zone_id}'")]
    DuplicateZone {
        /// Zone namespace.
        zone_type: ZoneType,
        /// Repeated id.
        zone_id: String,
    },

    /// Two zone polygons overlap under [`OverlapPolicy::Reject`].
    #[error("{zone_type} zones '{first}' and '{second}' overlap")]
    OverlappingZones {
        /// Zone namespace.
        zone_type: ZoneType,
        /// Zone earlier in the collection.
        first: String,
        /// Zone later in the collection.
        second: String,
    },

    /// A projected coordinate lies beyond the poles of its projection.
    #[error("Projected coordinate ({x}, {y}) is outside the range of {projection}")]
    OutOfProjectionRange {
        /// Projection name.
        projection: &'static str,
        /// Easting in meters.
        x: f64,
        /// Northing in meters.
        y: f64,
    },

    /// The zone input declares a coordinate reference system this crate
    /// cannot convert.
    #[error("Unsupported coordinate reference system '{crs}'")]
    UnsupportedCrs {
        /// CRS name as given.
        crs: String,
    },
}

/// A zone's bounding box in the R-tree, pointing back at its position in
/// the collection.
struct ZoneEntry {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Zones of one [`ZoneType`], indexed for point lookups.
///
/// Constructed once per dataset and shared read-only.
pub struct ZoneIndex {
    zone_type: ZoneType,
    policy: OverlapPolicy,
    zones: Vec<Zone>,
    areas_km2: Vec<f64>,
    positions: BTreeMap<String, usize>,
    tree: RTree<ZoneEntry>,
}

impl ZoneIndex {
    /// Validates `zones`, computes their equal-area sizes and builds the
    /// R-tree.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if a zone id is empty or repeated, a
    /// geometry is empty or has coordinates outside lon/lat range, or, with
    /// [`OverlapPolicy::Reject`], two zone interiors overlap.
    pub fn build(
        zone_type: ZoneType,
        zones: Vec<Zone>,
        policy: OverlapPolicy,
    ) -> Result<Self, SpatialError> {
        let projection = EqualAreaProjection::default();
        let mut positions = BTreeMap::new();
        let mut entries = Vec::with_capacity(zones.len());
        let mut areas_km2 = Vec::with_capacity(zones.len());

        for (position, zone) in zones.iter().enumerate() {
            if zone.zone_id.trim().is_empty() {
                return Err(SpatialError::InvalidGeometry {
                    zone_id: format!("#{position}"),
                    message: "zone has an empty id".to_string(),
                });
            }

            if positions.insert(zone.zone_id.clone(), position).is_some() {
                return Err(SpatialError::DuplicateZone {
                    zone_type,
                    zone_id: zone.zone_id.clone(),
                });
            }

            validate_geometry(&zone.zone_id, &zone.geometry)?;

            let envelope = compute_envelope(&zone.geometry).ok_or_else(|| {
                SpatialError::InvalidGeometry {
                    zone_id: zone.zone_id.clone(),
                    message: "geometry has no extent".to_string(),
                }
            })?;

            areas_km2.push(projection.area_km2(&zone.geometry));
            entries.push(ZoneEntry { position, envelope });
        }

        let index = Self {
            zone_type,
            policy,
            zones,
            areas_km2,
            positions,
            tree: RTree::bulk_load(entries),
        };

        if policy == OverlapPolicy::Reject {
            index.reject_overlaps()?;
        }

        log::info!(
            "Indexed {} {} zones (overlap policy: {policy})",
            index.zones.len(),
            zone_type
        );

        Ok(index)
    }

    /// Fails on the first pair of zones whose interiors intersect. Zones
    /// that only share boundary segments or vertices are fine.
    fn reject_overlaps(&self) -> Result<(), SpatialError> {
        for entry in self.tree.iter() {
            let first = &self.zones[entry.position];
            for other in self.tree.locate_in_envelope_intersecting(&entry.envelope) {
                if other.position <= entry.position {
                    continue;
                }
                let second = &self.zones[other.position];
                let matrix = first.geometry.relate(&second.geometry);
                if matrix.is_intersects() && !matrix.is_touches() {
                    return Err(SpatialError::OverlappingZones {
                        zone_type: self.zone_type,
                        first: first.zone_id.clone(),
                        second: second.zone_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns the collection position of the zone containing the point,
    /// resolving overlaps according to the index's [`OverlapPolicy`].
    #[must_use]
    pub fn lookup_position(&self, lng: f64, lat: f64) -> Option<usize> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        let containing = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| self.zones[entry.position].geometry.contains(&point))
            .map(|entry| entry.position);

        match self.policy {
            OverlapPolicy::Reject | OverlapPolicy::FirstMatch => containing.min(),
            OverlapPolicy::SmallestArea => containing.min_by(|a, b| {
                self.areas_km2[*a]
                    .total_cmp(&self.areas_km2[*b])
                    .then(a.cmp(b))
            }),
        }
    }

    /// Looks up the zone containing a point.
    #[must_use]
    pub fn lookup(&self, lng: f64, lat: f64) -> Option<&Zone> {
        self.lookup_position(lng, lat).map(|p| &self.zones[p])
    }

    /// Returns the collection position of a zone id.
    #[must_use]
    pub fn position(&self, zone_id: &str) -> Option<usize> {
        self.positions.get(zone_id).copied()
    }

    /// Returns `true` if the index has a zone with this id.
    #[must_use]
    pub fn contains_zone(&self, zone_id: &str) -> bool {
        self.positions.contains_key(zone_id)
    }

    /// The zone at a collection position.
    #[must_use]
    pub fn zone(&self, position: usize) -> Option<&Zone> {
        self.zones.get(position)
    }

    /// Equal-area size of the zone at `position`, in square kilometers.
    #[must_use]
    pub fn area_km2(&self, position: usize) -> Option<f64> {
        self.areas_km2.get(position).copied()
    }

    /// All zones in collection order.
    #[must_use]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// The zone namespace.
    #[must_use]
    pub const fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    /// The overlap policy the index was built with.
    #[must_use]
    pub const fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Number of zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Returns `true` if the index has no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Checks that a geometry has at least one ring with area and only valid
/// lon/lat coordinates.
fn validate_geometry(zone_id: &str, geometry: &MultiPolygon<f64>) -> Result<(), SpatialError> {
    if geometry.0.is_empty() {
        return Err(SpatialError::InvalidGeometry {
            zone_id: zone_id.to_string(),
            message: "missing geometry".to_string(),
        });
    }

    if let Some(polygon) = geometry.0.iter().find(|p| p.exterior().0.len() < 4) {
        return Err(SpatialError::InvalidGeometry {
            zone_id: zone_id.to_string(),
            message: format!(
                "polygon exterior ring has {} coordinates, at least 4 required",
                polygon.exterior().0.len()
            ),
        });
    }

    if let Some(bad) = geometry.coords_iter().find(|c| !is_lon_lat(*c)) {
        return Err(SpatialError::InvalidGeometry {
            zone_id: zone_id.to_string(),
            message: format!("coordinate ({}, {}) is not a valid lon/lat", bad.x, bad.y),
        });
    }

    Ok(())
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
