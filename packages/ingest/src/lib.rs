#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loads a rental dataset from disk.
//!
//! A [`DatasetConfig`] (TOML) names the listing CSV, the zone `GeoJSON`
//! collections with their native CRS, optional census tables and price
//! model bundles. [`Dataset::load`] reads all of it once, validates it and
//! fingerprints the result for the aggregate cache.

pub mod census;
pub mod config;
pub mod dataset;
pub mod listings;
pub mod models;
pub mod zones;

pub use config::{CensusSourceConfig, DatasetConfig, ZoneSourceConfig, resolve_config_path};
pub use dataset::Dataset;

use std::path::PathBuf;

use rental_map_zone_models::ZoneType;
use thiserror::Error;

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A file could not be opened or read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The dataset configuration is not valid TOML or is missing fields.
    #[error("Invalid dataset config {}: {source}", path.display())]
    Config {
        /// Config file.
        path: PathBuf,
        /// Parse failure.
        source: toml::de::Error,
    },

    /// A record in an input file is malformed.
    #[error("Malformed record in {file} at {record}: {message}")]
    DataFormat {
        /// Input file (or source label).
        file: String,
        /// Identifies the record (row number, listing id, feature index).
        record: String,
        /// What is wrong with it.
        message: String,
    },

    /// Two zone sources were configured for the same zone-type.
    #[error("Zone type {0} is configured more than once")]
    DuplicateZoneType(ZoneType),

    /// Zone geometry failed validation.
    #[error(transparent)]
    Spatial(#[from] rental_map_spatial::SpatialError),

    /// A census table is inconsistent.
    #[error(transparent)]
    Census(#[from] rental_map_census::CensusError),

    /// A price model bundle is invalid.
    #[error(transparent)]
    Price(#[from] rental_map_price::PriceError),
}

impl IngestError {
    pub(crate) fn data_format(
        file: impl Into<String>,
        record: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DataFormat {
            file: file.into(),
            record: record.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
