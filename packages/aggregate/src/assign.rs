//! Point-in-zone assignment of listings.

use rental_map_listing_models::Listing;
use rental_map_spatial::ZoneIndex;
use rental_map_zone_models::ZoneType;

use crate::AggregateError;
use crate::cache::{listing_identity_digest, zone_index_digest};
use crate::progress::ProgressCallback;

/// Number of listings between progress updates.
const PROGRESS_BATCH: usize = 1024;

/// Zone of every listing in a dataset, for one zone-type.
///
/// Entry `i` is the collection position (in the [`ZoneIndex`]) of the zone
/// containing listing `i`, or `None` if no zone contains it. The
/// assignment remembers digests of the zone collection and listing slice it
/// was computed from, so it cannot be paired with other inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneAssignment {
    zone_type: ZoneType,
    zone_digest: String,
    listing_digest: String,
    positions: Vec<Option<usize>>,
}

impl ZoneAssignment {
    /// Zone namespace of this assignment.
    #[must_use]
    pub const fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    /// Zone position per listing.
    #[must_use]
    pub fn positions(&self) -> &[Option<usize>] {
        &self.positions
    }

    /// Number of listings covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if no listings are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of listings outside every zone.
    #[must_use]
    pub fn unassigned(&self) -> usize {
        self.positions.iter().filter(|p| p.is_none()).count()
    }

    /// Returns `true` if this assignment was computed against `index`.
    #[must_use]
    pub fn matches_index(&self, index: &ZoneIndex) -> bool {
        self.zone_type == index.zone_type() && self.zone_digest == zone_index_digest(index)
    }

    /// Returns `true` if this assignment was computed over `listings`, in
    /// the same order.
    #[must_use]
    pub fn matches_listings(&self, listings: &[Listing]) -> bool {
        self.positions.len() == listings.len()
            && self.listing_digest == listing_identity_digest(listings)
    }
}

/// Returns the id of the zone containing `listing`, or `None` if it lies
/// outside every zone.
///
/// Containment excludes the polygon boundary. Overlaps are resolved by the
/// index's overlap policy.
///
/// # Errors
///
/// Returns [`AggregateError::DataFormat`] if the listing's coordinates are
/// not finite or out of lon/lat range.
pub fn assign_zone<'a>(
    listing: &Listing,
    index: &'a ZoneIndex,
) -> Result<Option<&'a str>, AggregateError> {
    check_coordinates(listing)?;
    Ok(index
        .lookup(listing.longitude, listing.latitude)
        .map(|zone| zone.zone_id.as_str()))
}

/// Assigns every listing to a zone of `index`.
///
/// # Errors
///
/// Returns [`AggregateError::DataFormat`] for the first listing with
/// invalid coordinates. No partial assignment is returned.
pub fn assign_all(
    listings: &[Listing],
    index: &ZoneIndex,
    progress: &dyn ProgressCallback,
) -> Result<ZoneAssignment, AggregateError> {
    progress.set_total(listings.len() as u64);
    progress.set_message(format!("Assigning listings to {} zones", index.zone_type()));

    let mut positions = Vec::with_capacity(listings.len());
    for (i, listing) in listings.iter().enumerate() {
        check_coordinates(listing)?;
        positions.push(index.lookup_position(listing.longitude, listing.latitude));

        if (i + 1) % PROGRESS_BATCH == 0 {
            progress.inc(PROGRESS_BATCH as u64);
        }
    }
    progress.inc((listings.len() % PROGRESS_BATCH) as u64);

    let assignment = ZoneAssignment {
        zone_type: index.zone_type(),
        zone_digest: zone_index_digest(index),
        listing_digest: listing_identity_digest(listings),
        positions,
    };

    let unassigned = assignment.unassigned();
    if unassigned > 0 {
        log::debug!(
            "{unassigned} of {} listings fall outside every {} zone",
            listings.len(),
            index.zone_type()
        );
    }
    progress.finish(format!(
        "Assigned {} listings to {} zones",
        listings.len() - unassigned,
        index.zone_type()
    ));

    Ok(assignment)
}

fn check_coordinates(listing: &Listing) -> Result<(), AggregateError> {
    if listing.has_valid_coordinates() {
        Ok(())
    } else {
        Err(AggregateError::DataFormat {
            record: format!("id={} date={}", listing.id, listing.date),
            message: format!(
                "invalid coordinates (latitude={}, longitude={})",
                listing.latitude, listing.longitude
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{listing_at, scenario_index, INSIDE_A, INSIDE_B, OUTSIDE};
    use crate::progress::NullProgress;

    #[test]
    fn point_inside_one_zone_gets_that_zone() {
        let index = scenario_index();
        let a = listing_at(1, INSIDE_A[0], "2023-04-15");
        let b = listing_at(2, INSIDE_B, "2023-04-15");
        assert_eq!(assign_zone(&a, &index).unwrap(), Some("A"));
        assert_eq!(assign_zone(&b, &index).unwrap(), Some("B"));
    }

    #[test]
    fn point_outside_all_zones_gets_none() {
        let index = scenario_index();
        let outside = listing_at(3, OUTSIDE, "2023-04-15");
        assert_eq!(assign_zone(&outside, &index).unwrap(), None);
    }

    #[test]
    fn invalid_coordinates_are_reported_with_the_record() {
        let index = scenario_index();
        let mut bad = listing_at(99, INSIDE_A[0], "2023-04-15");
        bad.latitude = f64::NAN;
        let err = assign_zone(&bad, &index).unwrap_err();
        assert!(matches!(err, AggregateError::DataFormat { ref record, .. } if record.contains("id=99")));

        let listings = vec![listing_at(1, INSIDE_A[0], "2023-04-15"), bad];
        assert!(assign_all(&listings, &index, &NullProgress).is_err());
    }

    #[test]
    fn assign_all_keeps_listing_order() {
        let index = scenario_index();
        let listings = vec![
            listing_at(1, INSIDE_B, "2023-04-15"),
            listing_at(2, OUTSIDE, "2023-04-15"),
            listing_at(3, INSIDE_A[1], "2023-04-15"),
        ];
        let assignment = assign_all(&listings, &index, &NullProgress).unwrap();
        assert_eq!(assignment.len(), 3);
        assert_eq!(assignment.unassigned(), 1);
        assert_eq!(
            assignment.positions(),
            &[index.position("B"), None, index.position("A")]
        );
    }
}
