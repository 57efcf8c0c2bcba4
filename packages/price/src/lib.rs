#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nightly price suggestion for a prospective listing.
//!
//! Inputs are a validated [`PriceFeatures`] vector. Predictions come from
//! a [`PriceModel`], normally a [`LinearPriceModel`] loaded from a JSON
//! coefficient bundle, picked per zone-type and month by the
//! [`ModelRegistry`].

pub mod features;
pub mod model;
pub mod registry;

pub use features::{Amenity, PriceFeatures, PropertyType, RoomType};
pub use model::{LinearPriceModel, PriceModel};
pub use registry::{ModelBundle, ModelRegistry, ModelSchedule};

use rental_map_listing_models::YearMonth;
use rental_map_zone_models::ZoneType;
use thiserror::Error;

/// Errors that can occur while building features or predicting prices.
#[derive(Debug, Error)]
pub enum PriceError {
    /// A specific zone is required but "all zones" was selected.
    #[error("Select a neighborhood or tract for a price suggestion")]
    ZoneRequired,

    /// A numeric feature is outside its allowed range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Feature name.
        field: &'static str,
        /// Rejected value.
        value: u32,
        /// Smallest allowed value.
        min: u32,
        /// Largest allowed value.
        max: u32,
    },

    /// The model has no coefficient for the zone.
    #[error("Model '{model}' has no coefficient for {zone_type} '{zone_id}'")]
    UnknownZone {
        /// Model name.
        model: String,
        /// Zone namespace.
        zone_type: ZoneType,
        /// Zone id.
        zone_id: String,
    },

    /// Features of one zone-type were given to a model of another.
    #[error("Model '{model}' predicts for {expected} zones, features are for {actual} zones")]
    ZoneTypeMismatch {
        /// Model name.
        model: String,
        /// Zone-type of the model.
        expected: ZoneType,
        /// Zone-type of the features.
        actual: ZoneType,
    },

    /// No model is scheduled for the month.
    #[error("No price model is scheduled for {0}")]
    NoModelForMonth(YearMonth),

    /// The schedule names a model that was never loaded.
    #[error("Price model '{name}' for {zone_type} zones is not loaded")]
    MissingModel {
        /// Zone namespace.
        zone_type: ZoneType,
        /// Scheduled model name.
        name: String,
    },

    /// The model produced a NaN or infinite price.
    #[error("Model '{model}' produced a non-finite price")]
    NonFinite {
        /// Model name.
        model: String,
    },

    /// A model bundle could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
