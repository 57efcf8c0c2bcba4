//! Dataset configuration file.
//!
//! ```toml
//! listings = "data/listings_calendar.csv.gz"
//! models = ["models/neighborhood.json", "models/tract.json"]
//! overlap_policy = "reject"
//!
//! [[zones]]
//! zone_type = "neighborhood"
//! path = "zones/neighborhoods.geojson"
//! id_field = "BlockGr202"
//! native_crs = "EPSG:4326"
//!
//! [zones.census]
//! path = "census/neighborhoods.csv"
//! key_column = "field concept"
//! ```

use std::path::{Path, PathBuf};

use rental_map_aggregate::SummaryOptions;
use rental_map_zone_models::{OverlapPolicy, ZoneType};
use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Environment variable naming the dataset config file.
pub const CONFIG_ENV_VAR: &str = "RENTAL_MAP_CONFIG";

/// Config file looked for in the working directory when nothing else is
/// given.
pub const DEFAULT_CONFIG_FILE: &str = "rental_map.toml";

fn default_crs() -> String {
    "EPSG:4326".to_string()
}

fn default_city() -> String {
    "Boston".to_string()
}

fn default_total_column() -> String {
    "Total:".to_string()
}

fn default_household_columns() -> Vec<String> {
    vec![
        rental_map_census::OCCUPIED.to_string(),
        rental_map_census::VACANT.to_string(),
    ]
}

/// Where a dataset's files live and how to interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Listing CSV (`.csv` or `.csv.gz`).
    pub listings: PathBuf,
    /// One entry per zone-type.
    #[serde(default)]
    pub zones: Vec<ZoneSourceConfig>,
    /// Price model bundles (JSON).
    #[serde(default)]
    pub models: Vec<PathBuf>,
    /// How overlapping zone polygons are treated.
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
    /// City name shown for the "all zones" selection.
    #[serde(default = "default_city")]
    pub city: String,
    /// Scope summary thresholds.
    #[serde(default)]
    pub summary: SummaryOptions,
}

/// A zone `GeoJSON` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSourceConfig {
    pub zone_type: ZoneType,
    /// `GeoJSON` `FeatureCollection`.
    pub path: PathBuf,
    /// Feature property holding the zone id.
    pub id_field: String,
    /// CRS of the file's coordinates.
    #[serde(default = "default_crs")]
    pub native_crs: String,
    #[serde(default)]
    pub census: Option<CensusSourceConfig>,
}

/// A census CSV for one zone-type.
///
/// Columns other than the key, total, household and skipped columns are
/// demographic categories, kept in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusSourceConfig {
    pub path: PathBuf,
    /// Column holding the census key.
    pub key_column: String,
    /// Column holding the total population.
    #[serde(default = "default_total_column")]
    pub total_column: String,
    /// Household occupancy columns.
    #[serde(default = "default_household_columns")]
    pub household_columns: Vec<String>,
    /// Columns to ignore.
    #[serde(default)]
    pub skip_columns: Vec<String>,
    /// Zone property matching `key_column` when the table is not keyed
    /// by zone id (e.g. `TRACTCE20` for tracts).
    #[serde(default)]
    pub zone_property: Option<String>,
}

/// Picks the config file: the explicit path if given, then
/// [`CONFIG_ENV_VAR`], then [`DEFAULT_CONFIG_FILE`].
#[must_use]
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl DatasetConfig {
    /// Reads and parses a config file. Relative paths inside it are
    /// resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// * [`IngestError::Io`] if the file cannot be read.
    /// * [`IngestError::Config`] if it is not a valid config.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
        let config = Self::parse(&text, path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        log::debug!("Loaded dataset config {}", path.display());
        Ok(config.resolve_paths(base))
    }

    /// Parses config text. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if the text is not a valid config.
    pub fn parse(text: &str, path: &Path) -> Result<Self, IngestError> {
        toml::from_str(text).map_err(|source| IngestError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Makes every relative path absolute against `base`.
    #[must_use]
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.listings);
        self.models.iter_mut().for_each(resolve);
        for zone in &mut self.zones {
            resolve(&mut zone.path);
            if let Some(census) = &mut zone.census {
                resolve(&mut census.path);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        listings = "listings.csv.gz"
        models = ["models/nbh.json", "/abs/tract.json"]
        overlap_policy = "first_match"

        [summary]
        amenity_take = 40

        [[zones]]
        zone_type = "neighborhood"
        path = "zones/nbh.geojson"
        id_field = "BlockGr202"

        [zones.census]
        path = "census/nbh.csv"
        key_column = "field concept"

        [[zones]]
        zone_type = "tract"
        path = "zones/tracts.geojson"
        id_field = "NAME20"
        native_crs = "EPSG:3857"

        [zones.census]
        path = "census/tracts.csv"
        key_column = "Census Tract"
        zone_property = "TRACTCE20"
    "#;

    fn zone_source(config: &DatasetConfig, zone_type: ZoneType) -> &ZoneSourceConfig {
        config.zones.iter().find(|z| z.zone_type == zone_type).unwrap()
    }

    #[test]
    fn parses_full_config_with_defaults() {
        let config = DatasetConfig::parse(CONFIG, Path::new("test.toml")).unwrap();
        assert_eq!(config.overlap_policy, OverlapPolicy::FirstMatch);
        assert_eq!(config.city, "Boston");
        assert_eq!(config.summary.amenity_take, 40);
        assert_eq!(config.summary.amenity_skip, 5);

        let nbh = zone_source(&config, ZoneType::Neighborhood);
        assert_eq!(nbh.native_crs, "EPSG:4326");
        let census = nbh.census.as_ref().unwrap();
        assert_eq!(census.total_column, "Total:");
        assert_eq!(census.household_columns, vec!["Occupied", "Vacant"]);
        assert_eq!(census.zone_property, None);

        let tract = zone_source(&config, ZoneType::Tract);
        assert_eq!(tract.native_crs, "EPSG:3857");
        assert_eq!(
            tract.census.as_ref().unwrap().zone_property.as_deref(),
            Some("TRACTCE20")
        );
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let config = DatasetConfig::parse(CONFIG, Path::new("test.toml"))
            .unwrap()
            .resolve_paths(Path::new("/data/boston"));
        assert_eq!(config.listings, PathBuf::from("/data/boston/listings.csv.gz"));
        assert_eq!(config.models[0], PathBuf::from("/data/boston/models/nbh.json"));
        assert_eq!(config.models[1], PathBuf::from("/abs/tract.json"));
        assert_eq!(
            config.zones[1].census.as_ref().unwrap().path,
            PathBuf::from("/data/boston/census/tracts.csv")
        );
    }

    #[test]
    fn missing_listings_is_a_config_error() {
        let err = DatasetConfig::parse("zones = []", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, IngestError::Config { .. }));
    }

    #[test]
    fn explicit_config_path_wins() {
        assert_eq!(
            resolve_config_path(Some(PathBuf::from("custom.toml"))),
            PathBuf::from("custom.toml")
        );
    }
}
