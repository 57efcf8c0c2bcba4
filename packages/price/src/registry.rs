//! Month-to-model schedule and the loaded model set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rental_map_listing_models::YearMonth;
use rental_map_zone_models::ZoneType;
use serde::{Deserialize, Serialize};

use crate::PriceError;
use crate::features::PriceFeatures;
use crate::model::{LinearPriceModel, PriceModel};

/// Models fitted per snapshot window, April 2023 through March 2024.
const DEFAULT_SCHEDULE: [(i32, u32, &str); 12] = [
    (2023, 4, "model_0"),
    (2023, 5, "model_1"),
    (2023, 6, "model_1"),
    (2023, 7, "model_2"),
    (2023, 8, "model_2"),
    (2023, 9, "model_4"),
    (2023, 10, "model_5"),
    (2023, 11, "model_6"),
    (2023, 12, "model_6"),
    (2024, 1, "model_9"),
    (2024, 2, "model_9"),
    (2024, 3, "model_9"),
];

/// Which model name serves each month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelSchedule(BTreeMap<YearMonth, String>);

impl Default for ModelSchedule {
    fn default() -> Self {
        Self(
            DEFAULT_SCHEDULE
                .iter()
                .filter_map(|&(year, month, name)| {
                    YearMonth::new(year, month)
                        .ok()
                        .map(|m| (m, name.to_string()))
                })
                .collect(),
        )
    }
}

impl ModelSchedule {
    /// Model name for `month`.
    #[must_use]
    pub fn model_name(&self, month: YearMonth) -> Option<&str> {
        self.0.get(&month).map(String::as_str)
    }

    /// Scheduled months in calendar order.
    pub fn months(&self) -> impl Iterator<Item = YearMonth> + '_ {
        self.0.keys().copied()
    }

    /// Assigns `name` to `month`, replacing any previous entry.
    pub fn insert(&mut self, month: YearMonth, name: impl Into<String>) {
        self.0.insert(month, name.into());
    }
}

/// A JSON coefficient bundle: named models plus an optional schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub models: BTreeMap<String, LinearPriceModel>,
    /// Entries override the default schedule month by month.
    #[serde(default)]
    pub schedule: Option<ModelSchedule>,
}

impl ModelBundle {
    /// Parses a bundle.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Json`] if the document is not a valid bundle.
    pub fn from_json(json: &str) -> Result<Self, PriceError> {
        let mut bundle: Self = serde_json::from_str(json)?;
        for (name, model) in &mut bundle.models {
            if model.name.is_empty() {
                model.name.clone_from(name);
            }
        }
        Ok(bundle)
    }
}

/// Loaded price models keyed by zone-type and name.
pub struct ModelRegistry {
    schedule: ModelSchedule,
    models: BTreeMap<(ZoneType, String), Arc<dyn PriceModel>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("schedule", &self.schedule)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(ModelSchedule::default())
    }
}

impl ModelRegistry {
    /// Creates an empty registry with `schedule`.
    #[must_use]
    pub const fn new(schedule: ModelSchedule) -> Self {
        Self {
            schedule,
            models: BTreeMap::new(),
        }
    }

    /// Registers `model` under its zone-type and name, replacing any model
    /// already there.
    pub fn insert(&mut self, model: Arc<dyn PriceModel>) {
        let key = (model.zone_type(), model.name().to_string());
        if self.models.insert(key, model).is_some() {
            log::warn!("Replaced an already loaded price model");
        }
    }

    /// Registers every model of `bundle` and merges its schedule.
    pub fn add_bundle(&mut self, bundle: ModelBundle) {
        let count = bundle.models.len();
        for (name, mut model) in bundle.models {
            if model.name.is_empty() {
                model.name = name;
            }
            self.insert(Arc::new(model));
        }
        if let Some(schedule) = bundle.schedule {
            for (month, name) in schedule.0 {
                self.schedule.insert(month, name);
            }
        }
        log::info!("Loaded {count} price models");
    }

    /// The active schedule.
    #[must_use]
    pub const fn schedule(&self) -> &ModelSchedule {
        &self.schedule
    }

    /// Number of loaded models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no models are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The model serving `zone_type` in `month`.
    ///
    /// # Errors
    ///
    /// * [`PriceError::NoModelForMonth`] if the month is not scheduled.
    /// * [`PriceError::MissingModel`] if the scheduled model is not loaded.
    pub fn model_for(
        &self,
        zone_type: ZoneType,
        month: YearMonth,
    ) -> Result<&dyn PriceModel, PriceError> {
        let name = self
            .schedule
            .model_name(month)
            .ok_or(PriceError::NoModelForMonth(month))?;
        self.models
            .get(&(zone_type, name.to_string()))
            .map(Arc::as_ref)
            .ok_or_else(|| PriceError::MissingModel {
                zone_type,
                name: name.to_string(),
            })
    }

    /// Suggested nightly price for `features` in `month`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if no model serves the month or the model
    /// rejects the features.
    pub fn suggest(&self, features: &PriceFeatures, month: YearMonth) -> Result<f64, PriceError> {
        let model = self.model_for(features.zone_type(), month)?;
        log::debug!(
            "Suggesting price for {} '{}' in {month} with '{}'",
            features.zone_type(),
            features.zone_id(),
            model.name()
        );
        model.predict(features)
    }
}
