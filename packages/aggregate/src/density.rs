//! Per-zone listing counts and density.

use std::collections::BTreeMap;

use rental_map_listing_models::Listing;
use rental_map_spatial::ZoneIndex;
use rental_map_zone_models::{ZoneSelect, ZoneStats, ZoneType};

use crate::AggregateError;
use crate::assign::{ZoneAssignment, assign_all};
use crate::progress::ProgressCallback;

/// Zone assignment and per-zone statistics for one zone-type of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneAggregate {
    zone_type: ZoneType,
    assignment: ZoneAssignment,
    stats: Vec<ZoneStats>,
    positions: BTreeMap<String, usize>,
}

/// Counts assigned listings per zone and derives each zone's density.
///
/// Zones without listings get a count of `0`. Areas come from the index,
/// which measures every zone in the equal-area projection. Density is
/// `0` for zero or non-finite areas.
///
/// # Errors
///
/// Returns [`AggregateError::ZoneTypeMismatch`] if the assignment was made
/// against a different zone-type than `index`, or
/// [`AggregateError::AssignmentMismatch`] if it was made against another
/// collection of the same zone-type.
pub fn aggregate_density(
    index: &ZoneIndex,
    assignment: ZoneAssignment,
) -> Result<ZoneAggregate, AggregateError> {
    if assignment.zone_type() != index.zone_type() {
        return Err(AggregateError::ZoneTypeMismatch {
            requested: assignment.zone_type(),
            actual: index.zone_type(),
        });
    }

    let mismatch = || AggregateError::AssignmentMismatch {
        zone_type: index.zone_type(),
    };
    if !assignment.matches_index(index) {
        return Err(mismatch());
    }

    let mut counts = vec![0u64; index.len()];
    for position in assignment.positions().iter().flatten() {
        *counts.get_mut(*position).ok_or_else(mismatch)? += 1;
    }

    let stats: Vec<ZoneStats> = index
        .zones()
        .iter()
        .enumerate()
        .map(|(position, zone)| {
            let area_km2 = index.area_km2(position).unwrap_or(0.0);
            ZoneStats::new(zone.zone_id.clone(), counts[position], area_km2)
        })
        .collect();

    let positions = stats
        .iter()
        .enumerate()
        .map(|(i, s)| (s.zone_id.clone(), i))
        .collect();

    log::info!(
        "Aggregated {} listings into {} {} zones ({} outside every zone)",
        assignment.len(),
        stats.len(),
        index.zone_type(),
        assignment.unassigned()
    );

    Ok(ZoneAggregate {
        zone_type: index.zone_type(),
        assignment,
        stats,
        positions,
    })
}

/// Assigns `listings` to the zones of `index` and aggregates density.
///
/// # Errors
///
/// Returns [`AggregateError`] if any listing has invalid coordinates.
pub fn aggregate(
    listings: &[Listing],
    index: &ZoneIndex,
    progress: &dyn ProgressCallback,
) -> Result<ZoneAggregate, AggregateError> {
    let assignment = assign_all(listings, index, progress)?;
    aggregate_density(index, assignment)
}

impl ZoneAggregate {
    /// Zone namespace.
    #[must_use]
    pub const fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    /// Per-zone statistics in zone collection order.
    #[must_use]
    pub fn stats(&self) -> &[ZoneStats] {
        &self.stats
    }

    /// The listing-to-zone assignment the statistics were derived from.
    #[must_use]
    pub const fn assignment(&self) -> &ZoneAssignment {
        &self.assignment
    }

    /// Returns `true` if the zone id exists in this aggregate's zone-type.
    #[must_use]
    pub fn contains_zone(&self, zone_id: &str) -> bool {
        self.positions.contains_key(zone_id)
    }

    /// Statistics of one zone.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::ZoneNotFound`] if the zone does not exist.
    pub fn stats_for(&self, zone_id: &str) -> Result<&ZoneStats, AggregateError> {
        self.positions
            .get(zone_id)
            .map(|&p| &self.stats[p])
            .ok_or_else(|| AggregateError::ZoneNotFound {
                zone_type: self.zone_type,
                zone_id: zone_id.to_string(),
            })
    }

    /// Zone id of the listing at `listing_position`.
    #[must_use]
    pub fn zone_id_of(&self, listing_position: usize) -> Option<&str> {
        self.assignment
            .positions()
            .get(listing_position)
            .copied()
            .flatten()
            .map(|p| self.stats[p].zone_id.as_str())
    }

    /// Number of listings the aggregate was computed over.
    #[must_use]
    pub fn listing_count(&self) -> usize {
        self.assignment.len()
    }

    /// Number of listings outside every zone.
    #[must_use]
    pub fn unassigned(&self) -> u64 {
        self.assignment.unassigned() as u64
    }

    /// Sum of all zone listing counts.
    #[must_use]
    pub fn assigned_total(&self) -> u64 {
        self.stats.iter().map(|s| s.listing_count).sum()
    }

    /// Zone listing total for a selection: the sum of every zone's count
    /// for [`ZoneSelect::All`], or the zone's own count.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::ZoneNotFound`] for an unknown zone.
    pub fn listing_total(&self, select: &ZoneSelect) -> Result<u64, AggregateError> {
        match select {
            ZoneSelect::All => Ok(self.assigned_total()),
            ZoneSelect::Zone(id) => self.stats_for(id).map(|s| s.listing_count),
        }
    }

    /// Statistics sorted by descending density, ties by zone id.
    #[must_use]
    pub fn ranked_by_density(&self) -> Vec<&ZoneStats> {
        let mut ranked: Vec<&ZoneStats> = self.stats.iter().collect();
        ranked.sort_by(|a, b| {
            b.density
                .total_cmp(&a.density)
                .then_with(|| a.zone_id.cmp(&b.zone_id))
        });
        ranked
    }
}
