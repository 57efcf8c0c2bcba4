#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census demographics and household vacancy per zone.
//!
//! A [`CensusTable`] holds one [`CensusProfile`] per census key for a
//! single zone-type. Neighborhood tables are keyed by zone id; tract
//! tables are usually keyed by tract code, which zones carry as a
//! property (see [`CensusTable::with_key_property`]).

use std::collections::BTreeMap;

use rental_map_zone_models::{Zone, ZoneType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Household column holding occupied units.
pub const OCCUPIED: &str = "Occupied";
/// Household column holding vacant units.
pub const VACANT: &str = "Vacant";

/// Errors that can occur while building or querying census tables.
#[derive(Debug, Error)]
pub enum CensusError {
    /// No census row exists for the requested key.
    #[error("No {zone_type} census data for '{key}'")]
    ZoneNotFound {
        /// Zone namespace of the table.
        zone_type: ZoneType,
        /// Census key looked up.
        key: String,
    },

    /// Two census rows share a key.
    #[error("Duplicate {zone_type} census key '{key}'")]
    DuplicateKey {
        /// Zone namespace of the table.
        zone_type: ZoneType,
        /// Repeated key.
        key: String,
    },

    /// A row's columns differ from the first row's.
    #[error("Census row '{key}' has columns {actual:?}, expected {expected:?}")]
    ColumnMismatch {
        /// Key of the offending row.
        key: String,
        /// Column labels of the first row.
        expected: Vec<String>,
        /// Column labels of the offending row.
        actual: Vec<String>,
    },

    /// The zone lacks the property that links it to its census row.
    #[error("Zone '{zone_id}' has no '{property}' property")]
    MissingKeyProperty {
        /// Zone missing the property.
        zone_id: String,
        /// Property name.
        property: String,
    },
}

/// A census category and its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusCount {
    /// Column label (e.g. "White alone", "Vacant").
    pub label: String,
    /// Persons or households.
    pub count: u64,
}

impl CensusCount {
    /// Creates a count.
    #[must_use]
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Demographic and household breakdown of one census row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CensusProfile {
    /// Census key (zone id or tract code), or a city label for
    /// [`CensusTable::citywide`].
    pub zone_id: String,
    /// Total population.
    pub population_total: u64,
    /// Population per demographic category, in column order.
    pub demographics: Vec<CensusCount>,
    /// Housing units per occupancy category, in column order.
    pub households: Vec<CensusCount>,
}

/// Categories with a non-zero count, in their original order.
#[must_use]
pub fn breakdown(counts: &[CensusCount]) -> Vec<&CensusCount> {
    counts.iter().filter(|c| c.count > 0).collect()
}

impl CensusProfile {
    /// Non-zero demographic categories.
    #[must_use]
    pub fn demographic_breakdown(&self) -> Vec<&CensusCount> {
        breakdown(&self.demographics)
    }

    /// Non-zero household categories.
    #[must_use]
    pub fn household_breakdown(&self) -> Vec<&CensusCount> {
        breakdown(&self.households)
    }

    fn household_count(&self, label: &str) -> u64 {
        self.households
            .iter()
            .filter(|c| c.label.eq_ignore_ascii_case(label))
            .map(|c| c.count)
            .sum()
    }

    /// Occupied plus vacant housing units.
    #[must_use]
    pub fn household_total(&self) -> u64 {
        self.household_count(OCCUPIED) + self.household_count(VACANT)
    }

    /// Vacant share of housing units, or `None` when the zone has no
    /// housing units at all.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn vacancy_rate(&self) -> Option<f64> {
        let total = self.household_total();
        (total > 0).then(|| self.household_count(VACANT) as f64 / total as f64)
    }

    fn labels(&self) -> Vec<String> {
        self.demographics
            .iter()
            .chain(&self.households)
            .map(|c| c.label.clone())
            .collect()
    }
}

/// Census profiles of one zone-type.
#[derive(Debug, Clone)]
pub struct CensusTable {
    zone_type: ZoneType,
    key_property: Option<String>,
    profiles: Vec<CensusProfile>,
    positions: BTreeMap<String, usize>,
}

impl CensusTable {
    /// Builds a table, checking that keys are unique and that every row
    /// has the same columns.
    ///
    /// # Errors
    ///
    /// * [`CensusError::DuplicateKey`] if two rows share a key.
    /// * [`CensusError::ColumnMismatch`] if rows disagree on columns.
    pub fn new(zone_type: ZoneType, profiles: Vec<CensusProfile>) -> Result<Self, CensusError> {
        let mut positions = BTreeMap::new();
        let expected = profiles.first().map(CensusProfile::labels);

        for (i, profile) in profiles.iter().enumerate() {
            if positions.insert(profile.zone_id.clone(), i).is_some() {
                return Err(CensusError::DuplicateKey {
                    zone_type,
                    key: profile.zone_id.clone(),
                });
            }
            if let Some(expected) = &expected {
                let actual = profile.labels();
                if &actual != expected {
                    return Err(CensusError::ColumnMismatch {
                        key: profile.zone_id.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
        }

        log::debug!("Built {zone_type} census table with {} rows", profiles.len());

        Ok(Self {
            zone_type,
            key_property: None,
            profiles,
            positions,
        })
    }

    /// Looks zones up by this property instead of their id.
    #[must_use]
    pub fn with_key_property(mut self, property: impl Into<String>) -> Self {
        self.key_property = Some(property.into());
        self
    }

    /// Zone namespace of the table.
    #[must_use]
    pub const fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    /// Every profile in row order.
    #[must_use]
    pub fn profiles(&self) -> &[CensusProfile] {
        &self.profiles
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profile by census key.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError::ZoneNotFound`] if no row has `key`.
    pub fn profile(&self, key: &str) -> Result<&CensusProfile, CensusError> {
        self.positions
            .get(key)
            .map(|&i| &self.profiles[i])
            .ok_or_else(|| CensusError::ZoneNotFound {
                zone_type: self.zone_type,
                key: key.to_string(),
            })
    }

    /// Profile of `zone`, through the key property when one is set.
    ///
    /// # Errors
    ///
    /// * [`CensusError::MissingKeyProperty`] if the zone lacks the key
    ///   property.
    /// * [`CensusError::ZoneNotFound`] if no row matches.
    pub fn lookup(&self, zone: &Zone) -> Result<&CensusProfile, CensusError> {
        let key = match &self.key_property {
            Some(property) => {
                zone.property(property)
                    .ok_or_else(|| CensusError::MissingKeyProperty {
                        zone_id: zone.zone_id.clone(),
                        property: property.clone(),
                    })?
            }
            None => zone.zone_id.as_str(),
        };
        self.profile(key)
    }

    /// Sum of every column across all rows, labeled `label`.
    #[must_use]
    pub fn citywide(&self, label: &str) -> CensusProfile {
        let mut total = CensusProfile {
            zone_id: label.to_string(),
            population_total: 0,
            demographics: Vec::new(),
            households: Vec::new(),
        };

        if let Some(first) = self.profiles.first() {
            total.demographics = first
                .demographics
                .iter()
                .map(|c| CensusCount::new(c.label.clone(), 0))
                .collect();
            total.households = first
                .households
                .iter()
                .map(|c| CensusCount::new(c.label.clone(), 0))
                .collect();
        }

        for profile in &self.profiles {
            total.population_total += profile.population_total;
            for (sum, c) in total.demographics.iter_mut().zip(&profile.demographics) {
                sum.count += c.count;
            }
            for (sum, c) in total.households.iter_mut().zip(&profile.households) {
                sum.count += c.count;
            }
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn profile(key: &str, demographics: &[(&str, u64)], occupied: u64, vacant: u64) -> CensusProfile {
        CensusProfile {
            zone_id: key.to_string(),
            population_total: demographics.iter().map(|(_, n)| n).sum(),
            demographics: demographics
                .iter()
                .map(|(label, n)| CensusCount::new(*label, *n))
                .collect(),
            households: vec![CensusCount::new(OCCUPIED, occupied), CensusCount::new(VACANT, vacant)],
        }
    }

    fn table() -> CensusTable {
        CensusTable::new(
            ZoneType::Neighborhood,
            vec![
                profile("Back Bay", &[("White", 60), ("Black", 0), ("Asian", 40)], 90, 10),
                profile("Harbor Islands", &[("White", 0), ("Black", 0), ("Asian", 0)], 0, 0),
            ],
        )
        .unwrap()
    }

    fn zone(id: &str) -> Zone {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        Zone::new(id, MultiPolygon(vec![square]))
    }

    #[test]
    fn breakdown_drops_zero_categories() {
        let table = table();
        let back_bay = table.profile("Back Bay").unwrap();
        let labels: Vec<&str> = back_bay
            .demographic_breakdown()
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(labels, vec!["White", "Asian"]);
    }

    #[test]
    fn vacancy_rate_uses_occupied_plus_vacant() {
        let table = table();
        let back_bay = table.profile("Back Bay").unwrap();
        assert_eq!(back_bay.household_total(), 100);
        let rate = back_bay.vacancy_rate().unwrap();
        assert!((rate - 0.1).abs() < 1e-12);
    }

    #[test]
    fn zone_without_housing_has_no_vacancy_rate() {
        let table = table();
        let islands = table.profile("Harbor Islands").unwrap();
        assert_eq!(islands.household_total(), 0);
        assert_eq!(islands.vacancy_rate(), None);
        assert!(islands.household_breakdown().is_empty());
    }

    #[test]
    fn citywide_sums_every_column() {
        let city = table().citywide("Boston");
        assert_eq!(city.zone_id, "Boston");
        assert_eq!(city.population_total, 100);
        assert_eq!(city.demographics[0], CensusCount::new("White", 60));
        assert_eq!(city.demographics[2], CensusCount::new("Asian", 40));
        assert_eq!(city.household_total(), 100);
    }

    #[test]
    fn missing_zone_is_a_lookup_error() {
        let err = table().profile("Nonexistent").unwrap_err();
        assert!(matches!(err, CensusError::ZoneNotFound { ref key, .. } if key == "Nonexistent"));
    }

    #[test]
    fn lookup_follows_key_property() {
        let tracts = CensusTable::new(
            ZoneType::Tract,
            vec![profile("010103", &[("White", 5)], 3, 1)],
        )
        .unwrap()
        .with_key_property("TRACTCE20");

        let mut tract = zone("101.03");
        tract
            .properties
            .insert("TRACTCE20".to_string(), "010103".to_string());
        assert_eq!(tracts.lookup(&tract).unwrap().population_total, 5);

        let err = tracts.lookup(&zone("101.04")).unwrap_err();
        assert!(matches!(err, CensusError::MissingKeyProperty { .. }));
    }

    #[test]
    fn lookup_by_zone_id_without_key_property() {
        assert!(table().lookup(&zone("Back Bay")).is_ok());
    }

    #[test]
    fn duplicate_keys_and_ragged_columns_are_rejected() {
        let dup = CensusTable::new(
            ZoneType::Neighborhood,
            vec![profile("A", &[("White", 1)], 1, 0), profile("A", &[("White", 2)], 1, 0)],
        );
        assert!(matches!(dup, Err(CensusError::DuplicateKey { .. })));

        let ragged = CensusTable::new(
            ZoneType::Neighborhood,
            vec![profile("A", &[("White", 1)], 1, 0), profile("B", &[("Black", 2)], 1, 0)],
        );
        assert!(matches!(ragged, Err(CensusError::ColumnMismatch { .. })));
    }
}
