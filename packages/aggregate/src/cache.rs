//! Memoized zone aggregates keyed by dataset version.
//!
//! Assignment and density depend only on the listing set and the zone
//! collection, so they are computed once per `(zone-type, fingerprint)`.
//! Changing the selected zone or month only filters the cached result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use geo::CoordsIter;
use rental_map_listing_models::Listing;
use rental_map_spatial::ZoneIndex;
use rental_map_zone_models::ZoneType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::AggregateError;
use crate::density::{ZoneAggregate, aggregate};
use crate::progress::ProgressCallback;

/// SHA-256 digest (lowercase hex) identifying one loaded dataset version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetFingerprint(String);

impl DatasetFingerprint {
    /// Digests every listing row and every zone's id and geometry.
    ///
    /// Field values are hashed by their exact bit patterns, so any change
    /// to a coordinate or price yields a new fingerprint.
    #[must_use]
    pub fn compute(listings: &[Listing], indexes: &[&ZoneIndex]) -> Self {
        let mut hasher = Sha256::new();

        hasher.update((listings.len() as u64).to_le_bytes());
        for listing in listings {
            hasher.update(listing.id.to_le_bytes());
            hasher.update(listing.latitude.to_bits().to_le_bytes());
            hasher.update(listing.longitude.to_bits().to_le_bytes());
            hasher.update(listing.price.to_bits().to_le_bytes());
            update_str(&mut hasher, &listing.room_type);
            update_str(&mut hasher, &listing.property_type);
            hasher.update(listing.minimum_nights.to_le_bytes());
            hasher.update([u8::from(listing.available)]);
            update_str(&mut hasher, &listing.date.to_string());
            hasher.update((listing.amenities.len() as u64).to_le_bytes());
            for amenity in &listing.amenities {
                update_str(&mut hasher, amenity);
            }
        }

        for index in indexes {
            update_zone_index(&mut hasher, index);
        }

        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first 12 hex characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for DatasetFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn update_zone_index(hasher: &mut Sha256, index: &ZoneIndex) {
    update_str(hasher, index.zone_type().as_ref());
    update_str(hasher, index.policy().as_ref());
    hasher.update((index.len() as u64).to_le_bytes());
    for zone in index.zones() {
        update_str(hasher, &zone.zone_id);
        hasher.update((zone.geometry.coords_count() as u64).to_le_bytes());
        for coord in zone.geometry.coords_iter() {
            hasher.update(coord.x.to_bits().to_le_bytes());
            hasher.update(coord.y.to_bits().to_le_bytes());
        }
    }
}

/// Digest of one zone collection: ids, order, geometry and overlap policy.
pub(crate) fn zone_index_digest(index: &ZoneIndex) -> String {
    let mut hasher = Sha256::new();
    update_zone_index(&mut hasher, index);
    hex::encode(hasher.finalize())
}

/// Order-sensitive digest of the listing fields that decide zone
/// membership and month filtering.
pub(crate) fn listing_identity_digest(listings: &[Listing]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((listings.len() as u64).to_le_bytes());
    for listing in listings {
        hasher.update(listing.id.to_le_bytes());
        hasher.update(listing.latitude.to_bits().to_le_bytes());
        hasher.update(listing.longitude.to_bits().to_le_bytes());
        update_str(&mut hasher, &listing.date.to_string());
    }
    hex::encode(hasher.finalize())
}

/// A loaded dataset the cache can aggregate.
pub trait AggregateSource {
    /// Version of the dataset.
    fn fingerprint(&self) -> &DatasetFingerprint;

    /// Every listing record, in load order.
    fn listings(&self) -> &[Listing];

    /// The zone index of `zone_type`, if that zone-type was loaded.
    fn zone_index(&self, zone_type: ZoneType) -> Option<&ZoneIndex>;
}

type CacheKey = (ZoneType, DatasetFingerprint);

/// Thread-safe memo of [`ZoneAggregate`]s.
#[derive(Debug, Default)]
pub struct AggregateCache {
    entries: RwLock<BTreeMap<CacheKey, Arc<ZoneAggregate>>>,
}

impl AggregateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached aggregate of `zone_type` for the dataset version
    /// `fingerprint`, without computing it.
    #[must_use]
    pub fn get(
        &self,
        fingerprint: &DatasetFingerprint,
        zone_type: ZoneType,
    ) -> Option<Arc<ZoneAggregate>> {
        let hit = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(zone_type, fingerprint.clone()))
            .cloned();
        if hit.is_some() {
            log::trace!("Aggregate cache hit for {zone_type} @ {}", fingerprint.short());
        }
        hit
    }

    /// Returns the cached aggregate for `(zone_type, dataset)`, computing
    /// and storing it on first use.
    ///
    /// # Errors
    ///
    /// * [`AggregateError::ZoneTypeUnavailable`] if the dataset has no
    ///   zones of `zone_type`.
    /// * Any error from [`aggregate`]; nothing is cached in that case.
    pub fn get_or_compute(
        &self,
        dataset: &dyn AggregateSource,
        zone_type: ZoneType,
        progress: &dyn ProgressCallback,
    ) -> Result<Arc<ZoneAggregate>, AggregateError> {
        if let Some(hit) = self.get(dataset.fingerprint(), zone_type) {
            return Ok(hit);
        }
        let key = (zone_type, dataset.fingerprint().clone());

        let index = dataset
            .zone_index(zone_type)
            .ok_or(AggregateError::ZoneTypeUnavailable(zone_type))?;

        log::debug!("Aggregate cache miss for {zone_type} @ {}", key.1.short());
        let computed = Arc::new(aggregate(dataset.listings(), index, progress)?);

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(computed)))
    }

    /// Drops every entry computed from the dataset version `fingerprint`.
    /// Returns the number of entries removed.
    pub fn invalidate(&self, fingerprint: &DatasetFingerprint) -> usize {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(_, fp), _| fp != fingerprint);
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("Invalidated {removed} cached aggregates for {}", fingerprint.short());
        }
        removed
    }

    /// Number of cached aggregates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
