//! Scoping listings by zone and calendar month.

use rental_map_listing_models::{Listing, YearMonth};
use rental_map_zone_models::{ZoneSelect, ZoneType};

use crate::AggregateError;
use crate::density::ZoneAggregate;

/// Returns the listings of one zone (or all listings) whose snapshot date
/// falls in `month`.
///
/// [`ZoneSelect::All`] keeps listings outside every zone so city-wide
/// figures are not short; a specific zone never includes them. A month
/// with no records yields an empty result.
///
/// `listings` must be the slice `aggregate` was computed from.
///
/// # Errors
///
/// * [`AggregateError::ZoneTypeMismatch`] if `zone_type` is not the
///   aggregate's zone-type.
/// * [`AggregateError::ZoneNotFound`] if the selected zone does not exist.
/// * [`AggregateError::ListingCountMismatch`] if `listings` has a different
///   length than the aggregated dataset.
/// * [`AggregateError::ListingMismatch`] if `listings` has the same length
///   but different rows or a different order.
pub fn filter_scope<'a>(
    listings: &'a [Listing],
    aggregate: &ZoneAggregate,
    zone_type: ZoneType,
    zone_select: &ZoneSelect,
    month: YearMonth,
) -> Result<Vec<&'a Listing>, AggregateError> {
    if zone_type != aggregate.zone_type() {
        return Err(AggregateError::ZoneTypeMismatch {
            requested: zone_type,
            actual: aggregate.zone_type(),
        });
    }

    if listings.len() != aggregate.listing_count() {
        return Err(AggregateError::ListingCountMismatch {
            expected: aggregate.listing_count(),
            actual: listings.len(),
        });
    }

    if !aggregate.assignment().matches_listings(listings) {
        return Err(AggregateError::ListingMismatch {
            count: listings.len(),
        });
    }

    let zone_id = match zone_select {
        ZoneSelect::All => None,
        ZoneSelect::Zone(id) => {
            if !aggregate.contains_zone(id) {
                return Err(AggregateError::ZoneNotFound {
                    zone_type,
                    zone_id: id.clone(),
                });
            }
            Some(id.as_str())
        }
    };

    let scoped: Vec<&Listing> = listings
        .iter()
        .enumerate()
        .filter(|(i, _)| zone_id.is_none() || aggregate.zone_id_of(*i) == zone_id)
        .map(|(_, listing)| listing)
        .filter(|listing| month.contains(listing.date))
        .collect();

    log::debug!(
        "Scope {zone_type}/{zone_select}/{month}: {} of {} listings",
        scoped.len(),
        listings.len()
    );

    Ok(scoped)
}
