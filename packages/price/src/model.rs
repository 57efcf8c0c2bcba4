//! Price models.

use std::collections::BTreeMap;

use rental_map_zone_models::ZoneType;
use serde::{Deserialize, Serialize};

use crate::PriceError;
use crate::features::{Amenity, PriceFeatures, PropertyType, RoomType};

/// Predicts a nightly list price from validated features.
pub trait PriceModel: Send + Sync {
    /// Model name, as referenced by the month schedule.
    fn name(&self) -> &str;

    /// Zone-type the model was fitted on.
    fn zone_type(&self) -> ZoneType;

    /// Suggested nightly price in dollars. Never negative.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the features do not fit the model.
    fn predict(&self, features: &PriceFeatures) -> Result<f64, PriceError>;
}

/// A linear model over one-hot categorical levels, numeric features,
/// amenity flags and zone fixed effects.
///
/// Categorical levels without a coefficient are the reference level and
/// contribute nothing. Every zone must have a coefficient, even if it is
/// `0.0`, so that an unknown zone is distinguishable from the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPriceModel {
    /// Filled in from the bundle key when empty.
    #[serde(default)]
    pub name: String,
    pub zone_type: ZoneType,
    pub intercept: f64,
    #[serde(default)]
    pub room_type: BTreeMap<RoomType, f64>,
    #[serde(default)]
    pub property_type: BTreeMap<PropertyType, f64>,
    /// Per bedroom.
    #[serde(default)]
    pub bedrooms: f64,
    /// Per guest.
    #[serde(default)]
    pub accommodates: f64,
    #[serde(default)]
    pub amenities: BTreeMap<Amenity, f64>,
    pub zones: BTreeMap<String, f64>,
}

impl PriceModel for LinearPriceModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    fn predict(&self, features: &PriceFeatures) -> Result<f64, PriceError> {
        if features.zone_type() != self.zone_type {
            return Err(PriceError::ZoneTypeMismatch {
                model: self.name.clone(),
                expected: self.zone_type,
                actual: features.zone_type(),
            });
        }

        let zone = *self
            .zones
            .get(features.zone_id())
            .ok_or_else(|| PriceError::UnknownZone {
                model: self.name.clone(),
                zone_type: self.zone_type,
                zone_id: features.zone_id().to_string(),
            })?;

        let room = self.room_type.get(&features.room_type()).copied().unwrap_or(0.0);
        let property = self
            .property_type
            .get(&features.property_type())
            .copied()
            .unwrap_or(0.0);
        let amenities: f64 = features
            .amenities()
            .iter()
            .filter_map(|a| self.amenities.get(a))
            .sum();

        let price = self.intercept
            + zone
            + room
            + property
            + self.bedrooms * f64::from(features.bedrooms())
            + self.accommodates * f64::from(features.accommodates())
            + amenities;

        if !price.is_finite() {
            return Err(PriceError::NonFinite {
                model: self.name.clone(),
            });
        }

        log::trace!(
            "Model '{}' predicted {price:.2} for {} '{}'",
            self.name,
            self.zone_type,
            features.zone_id()
        );

        Ok(price.max(0.0))
    }
}
