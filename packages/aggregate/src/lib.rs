#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone assignment and listing density aggregation.
//!
//! Maps listing points into the zones of a [`ZoneIndex`], counts listings
//! per zone, derives equal-area density, and narrows the listing set to a
//! (zone-type, zone-or-all, month) scope. Results are memoized per
//! dataset fingerprint by [`cache::AggregateCache`] so that selection
//! changes never recompute them.
//!
//! [`ZoneIndex`]: rental_map_spatial::ZoneIndex

pub mod assign;
pub mod cache;
pub mod density;
pub mod progress;
pub mod scope;
pub mod summary;

#[cfg(test)]
mod fixtures;

pub use assign::{ZoneAssignment, assign_all, assign_zone};
pub use cache::{AggregateCache, AggregateSource, DatasetFingerprint};
pub use density::{ZoneAggregate, aggregate, aggregate_density};
pub use scope::filter_scope;
pub use summary::{LabelCount, ScopeSummary, SummaryOptions, summarize};

use rental_map_zone_models::ZoneType;
use thiserror::Error;

/// Errors that can occur during aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A listing record is malformed.
    #[error("Malformed listing {record}: {message}")]
    DataFormat {
        /// Identifies the offending record.
        record: String,
        /// What is wrong with it.
        message: String,
    },

    /// The zone collection is malformed.
    #[error(transparent)]
    Spatial(#[from] rental_map_spatial::SpatialError),

    /// The requested zone does not exist in the active zone-type.
    #[error("No {zone_type} zone named '{zone_id}'")]
    ZoneNotFound {
        /// Zone namespace searched.
        zone_type: ZoneType,
        /// Requested zone id.
        zone_id: String,
    },

    /// A zone-type was requested against results of another zone-type.
    #[error("Requested {requested} zones but the aggregate covers {actual} zones")]
    ZoneTypeMismatch {
        /// Zone-type asked for.
        requested: ZoneType,
        /// Zone-type of the aggregate.
        actual: ZoneType,
    },

    /// The dataset has no zones of the requested type.
    #[error("No {0} zones are loaded")]
    ZoneTypeUnavailable(ZoneType),

    /// The listing slice does not belong to the aggregate it is filtered
    /// with.
    #[error("Aggregate covers {expected} listings but {actual} were given")]
    ListingCountMismatch {
        /// Listings covered by the aggregate.
        expected: usize,
        /// Listings passed in.
        actual: usize,
    },

    /// The listing slice has the aggregate's length but different rows or
    /// a different order.
    #[error("Listings differ from the {count} listings the aggregate was computed over")]
    ListingMismatch {
        /// Listings covered by the aggregate.
        count: usize,
    },

    /// An assignment is paired with a zone collection it was not computed
    /// against.
    #[error("Assignment was computed against a different {zone_type} zone collection")]
    AssignmentMismatch {
        /// Zone-type of the index passed in.
        zone_type: ZoneType,
    },
}
