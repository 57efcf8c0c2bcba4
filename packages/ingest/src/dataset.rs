//! A fully loaded, immutable dataset.

use std::collections::{BTreeMap, BTreeSet};

use rental_map_aggregate::progress::{NullProgress, ProgressCallback};
use rental_map_aggregate::{AggregateSource, DatasetFingerprint, SummaryOptions};
use rental_map_census::CensusTable;
use rental_map_listing_models::{Listing, YearMonth};
use rental_map_price::ModelRegistry;
use rental_map_spatial::ZoneIndex;
use rental_map_zone_models::ZoneType;

use crate::config::DatasetConfig;
use crate::{IngestError, census, listings, models, zones};

/// Listings, zone indexes, census tables and price models of one dataset
/// version.
pub struct Dataset {
    fingerprint: DatasetFingerprint,
    listings: Vec<Listing>,
    zones: BTreeMap<ZoneType, ZoneIndex>,
    census: BTreeMap<ZoneType, CensusTable>,
    models: ModelRegistry,
    city: String,
    summary_options: SummaryOptions,
}

impl Dataset {
    /// Loads everything `config` names.
    ///
    /// `progress` sees one step for the listings, each zone file and census
    /// table, and one for all price models.
    ///
    /// # Errors
    ///
    /// Returns the first [`IngestError`] encountered; nothing is partially
    /// loaded.
    pub fn load(config: &DatasetConfig, progress: &dyn ProgressCallback) -> Result<Self, IngestError> {
        let census_count = config.zones.iter().filter(|z| z.census.is_some()).count();
        let steps = 2 + config.zones.len() + census_count;
        progress.set_total(steps as u64);

        progress.set_message(format!("Loading listings from {}", config.listings.display()));
        let listings = listings::load_listings(&config.listings, &NullProgress)?;
        progress.inc(1);

        let mut indexes = BTreeMap::new();
        let mut tables = BTreeMap::new();
        for source in &config.zones {
            if indexes.contains_key(&source.zone_type) {
                return Err(IngestError::DuplicateZoneType(source.zone_type));
            }

            progress.set_message(format!("Loading {} zones", source.zone_type));
            let zones = zones::load_zones(source)?;
            let index = ZoneIndex::build(source.zone_type, zones, config.overlap_policy)?;
            indexes.insert(source.zone_type, index);
            progress.inc(1);

            if let Some(census_source) = &source.census {
                progress.set_message(format!("Loading {} census data", source.zone_type));
                tables.insert(
                    source.zone_type,
                    census::load_census(source.zone_type, census_source)?,
                );
                progress.inc(1);
            }
        }

        progress.set_message("Loading price models".to_string());
        let registry = models::load_registry(&config.models)?;
        progress.inc(1);

        let dataset = Self::from_parts(listings, indexes, tables, registry)
            .with_city(config.city.clone())
            .with_summary_options(config.summary);

        progress.finish(format!(
            "Loaded {} listing records, {} zone types",
            dataset.listings.len(),
            dataset.zones.len()
        ));
        log::info!("Dataset fingerprint {}", dataset.fingerprint.short());

        Ok(dataset)
    }

    /// Assembles a dataset from already loaded parts and fingerprints it.
    #[must_use]
    pub fn from_parts(
        listings: Vec<Listing>,
        zones: BTreeMap<ZoneType, ZoneIndex>,
        census: BTreeMap<ZoneType, CensusTable>,
        models: ModelRegistry,
    ) -> Self {
        let indexes: Vec<&ZoneIndex> = zones.values().collect();
        let fingerprint = DatasetFingerprint::compute(&listings, &indexes);
        Self {
            fingerprint,
            listings,
            zones,
            census,
            models,
            city: "Boston".to_string(),
            summary_options: SummaryOptions::default(),
        }
    }

    /// Sets the city name used for the "all zones" selection.
    #[must_use]
    pub fn with_city(mut self, city: String) -> Self {
        self.city = city;
        self
    }

    #[must_use]
    pub fn with_summary_options(mut self, options: SummaryOptions) -> Self {
        self.summary_options = options;
        self
    }

    /// Zone-types with a loaded zone collection.
    #[must_use]
    pub fn zone_types(&self) -> Vec<ZoneType> {
        self.zones.keys().copied().collect()
    }

    /// Census table of `zone_type`.
    #[must_use]
    pub fn census(&self, zone_type: ZoneType) -> Option<&CensusTable> {
        self.census.get(&zone_type)
    }

    /// Loaded price models.
    #[must_use]
    pub const fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// City name for the "all zones" selection.
    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub const fn summary_options(&self) -> &SummaryOptions {
        &self.summary_options
    }

    /// Distinct snapshot months, oldest first.
    #[must_use]
    pub fn available_months(&self) -> Vec<YearMonth> {
        self.listings
            .iter()
            .map(|l| YearMonth::of(l.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl AggregateSource for Dataset {
    fn fingerprint(&self) -> &DatasetFingerprint {
        &self.fingerprint
    }

    fn listings(&self) -> &[Listing] {
        &self.listings
    }

    fn zone_index(&self, zone_type: ZoneType) -> Option<&ZoneIndex> {
        self.zones.get(&zone_type)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;
    use rental_map_aggregate::AggregateCache;
    use rental_map_spatial::crs::Crs;
    use rental_map_zone_models::OverlapPolicy;

    use super::*;

    const ZONES: &str = r#"{ "type": "FeatureCollection", "features": [
        { "type": "Feature", "properties": { "name": "West" },
          "geometry": { "type": "Polygon", "coordinates":
            [[[-71.10, 42.30], [-71.05, 42.30], [-71.05, 42.35], [-71.10, 42.35], [-71.10, 42.30]]] } },
        { "type": "Feature", "properties": { "name": "East" },
          "geometry": { "type": "Polygon", "coordinates":
            [[[-71.05, 42.30], [-71.00, 42.30], [-71.00, 42.35], [-71.05, 42.35], [-71.05, 42.30]]] } }
    ] }"#;

    fn listing(id: u64, lon: f64, lat: f64, date: (i32, u32, u32)) -> Listing {
        Listing {
            id,
            latitude: lat,
            longitude: lon,
            price: 150.0,
            room_type: "Private room".to_string(),
            property_type: "Private room in home".to_string(),
            minimum_nights: 1,
            available: true,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amenities: BTreeSet::new(),
        }
    }

    fn dataset(listings: Vec<Listing>) -> Dataset {
        let zones = zones::parse_zones(ZONES, "name", Crs::Wgs84, Path::new("zones.geojson")).unwrap();
        let index = ZoneIndex::build(ZoneType::Neighborhood, zones, OverlapPolicy::Reject).unwrap();
        Dataset::from_parts(
            listings,
            BTreeMap::from([(ZoneType::Neighborhood, index)]),
            BTreeMap::new(),
            ModelRegistry::default(),
        )
    }

    #[test]
    fn available_months_are_distinct_and_sorted() {
        let dataset = dataset(vec![
            listing(1, -71.07, 42.32, (2023, 6, 3)),
            listing(2, -71.02, 42.32, (2023, 4, 15)),
            listing(3, -71.02, 42.33, (2023, 4, 30)),
        ]);
        let months: Vec<String> = dataset
            .available_months()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(months, vec!["2023-04", "2023-06"]);
    }

    #[test]
    fn loaded_dataset_aggregates_through_cache() {
        let dataset = dataset(vec![
            listing(1, -71.07, 42.32, (2023, 4, 15)),
            listing(2, -71.02, 42.32, (2023, 4, 15)),
            listing(3, -71.03, 42.31, (2023, 4, 15)),
            listing(4, -70.90, 42.32, (2023, 4, 15)),
        ]);
        let cache = AggregateCache::new();
        let aggregate = cache
            .get_or_compute(&dataset, ZoneType::Neighborhood, &NullProgress)
            .unwrap();

        assert_eq!(aggregate.stats_for("West").unwrap().listing_count, 1);
        assert_eq!(aggregate.stats_for("East").unwrap().listing_count, 2);
        assert_eq!(aggregate.unassigned(), 1);
        // Equal-sized cells at the same latitude have equal areas.
        let west = aggregate.stats_for("West").unwrap().area_km2;
        let east = aggregate.stats_for("East").unwrap().area_km2;
        assert!((west - east).abs() < 1e-6);
        assert!(west > 20.0 && west < 25.0, "area {west}");
    }

    #[test]
    fn fingerprint_tracks_listing_content() {
        let a = dataset(vec![listing(1, -71.07, 42.32, (2023, 4, 15))]);
        let b = dataset(vec![listing(1, -71.07, 42.32, (2023, 4, 16))]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(
            a.fingerprint(),
            dataset(vec![listing(1, -71.07, 42.32, (2023, 4, 15))]).fingerprint()
        );
    }

    #[test]
    fn unloaded_zone_type_is_absent() {
        let dataset = dataset(Vec::new());
        assert_eq!(dataset.zone_types(), vec![ZoneType::Neighborhood]);
        assert!(dataset.zone_index(ZoneType::Tract).is_none());
        assert!(dataset.census(ZoneType::Tract).is_none());
        assert_eq!(
            dataset.zone_index(ZoneType::Neighborhood).map(ZoneIndex::policy),
            Some(OverlapPolicy::Reject)
        );
    }
}
