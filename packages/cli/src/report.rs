//! Report building and rendering for the CLI commands.
//!
//! Every command produces a serializable report. Text output goes through
//! the report's [`Display`](fmt::Display) impl, `--json` through
//! `serde_json`.

use std::fmt;
use std::sync::Arc;

use rental_map_aggregate::progress::{ProgressCallback, null_progress};
use rental_map_aggregate::{
    AggregateCache, AggregateError, AggregateSource, ScopeSummary, ZoneAggregate, filter_scope,
    summarize,
};
use rental_map_census::{CensusError, CensusProfile};
use rental_map_cli_utils::{IndicatifProgress, MultiProgress};
use rental_map_ingest::Dataset;
use rental_map_listing_models::YearMonth;
use rental_map_price::{PriceError, PriceFeatures};
use rental_map_zone_models::{ZoneSelect, ZoneStats, ZoneType};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The month has no listing snapshot.
    #[error("No listings were recorded in {month} (available: {available})")]
    UnknownMonth {
        /// Requested month.
        month: YearMonth,
        /// Months present in the dataset.
        available: String,
    },

    /// No census table is configured for the zone-type.
    #[error("No census data is loaded for {0} zones")]
    CensusUnavailable(ZoneType),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Census(#[from] CensusError),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Per-zone density table of one zone-type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesReport {
    pub zone_type: ZoneType,
    pub listing_total: usize,
    pub unassigned: u64,
    /// Sorted by descending density.
    pub zones: Vec<ZoneStats>,
}

/// Summary of one (zone-type, zone-or-all, month) scope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeReport {
    pub zone_type: ZoneType,
    pub zone: String,
    pub month: YearMonth,
    /// Density of the selected zone over the whole dataset; absent for
    /// the "all" selection.
    pub zone_stats: Option<ZoneStats>,
    pub summary: ScopeSummary,
}

/// Census profile of a zone or the whole city.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CensusReport {
    pub zone_type: ZoneType,
    pub profile: CensusProfile,
    pub vacancy_rate: Option<f64>,
}

/// A nightly price suggestion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceReport {
    pub month: YearMonth,
    pub model: String,
    pub features: PriceFeatures,
    pub price: f64,
}

/// Builds reports from a loaded dataset, memoizing aggregates in `cache`.
pub struct Reports<'a> {
    dataset: &'a Dataset,
    cache: &'a AggregateCache,
    multi: Option<&'a MultiProgress>,
}

impl<'a> Reports<'a> {
    #[must_use]
    pub const fn new(dataset: &'a Dataset, cache: &'a AggregateCache) -> Self {
        Self {
            dataset,
            cache,
            multi: None,
        }
    }

    /// Shows a progress bar whenever an aggregate has to be computed.
    #[must_use]
    pub const fn with_progress(mut self, multi: &'a MultiProgress) -> Self {
        self.multi = Some(multi);
        self
    }

    #[must_use]
    pub const fn dataset(&self) -> &Dataset {
        self.dataset
    }

    fn aggregate(&self, zone_type: ZoneType) -> Result<Arc<ZoneAggregate>, ReportError> {
        if let Some(hit) = self.cache.get(self.dataset.fingerprint(), zone_type) {
            return Ok(hit);
        }

        let progress: Arc<dyn ProgressCallback> = match self.multi {
            Some(multi) => IndicatifProgress::records_bar(
                multi,
                &format!("Assigning listings to {}", zone_type.label()),
            ),
            None => null_progress(),
        };
        Ok(self
            .cache
            .get_or_compute(self.dataset, zone_type, progress.as_ref())?)
    }

    /// Fails unless the dataset has listings recorded in `month`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::UnknownMonth`] listing the available months.
    pub fn check_month(&self, month: YearMonth) -> Result<(), ReportError> {
        let months = self.dataset.available_months();
        if months.contains(&month) {
            return Ok(());
        }
        Err(ReportError::UnknownMonth {
            month,
            available: months
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Density table of `zone_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Aggregate`] if the zone-type is not loaded.
    pub fn zones(&self, zone_type: ZoneType) -> Result<ZonesReport, ReportError> {
        let aggregate = self.aggregate(zone_type)?;
        Ok(ZonesReport {
            zone_type,
            listing_total: aggregate.listing_count(),
            unassigned: aggregate.unassigned(),
            zones: aggregate.ranked_by_density().into_iter().cloned().collect(),
        })
    }

    /// Summary of the listings in scope.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] for a month without listings, an unloaded
    /// zone-type or an unknown zone.
    pub fn scope(
        &self,
        zone_type: ZoneType,
        zone: &ZoneSelect,
        month: YearMonth,
    ) -> Result<ScopeReport, ReportError> {
        self.check_month(month)?;
        let aggregate = self.aggregate(zone_type)?;
        let listings = filter_scope(self.dataset.listings(), &aggregate, zone_type, zone, month)?;
        log::debug!("{} records in scope {zone_type}/{zone}/{month}", listings.len());

        let zone_stats = match zone.zone_id() {
            Some(id) => Some(aggregate.stats_for(id)?.clone()),
            None => None,
        };

        Ok(ScopeReport {
            zone_type,
            zone: self.zone_label(zone),
            month,
            zone_stats,
            summary: summarize(&listings, self.dataset.summary_options()),
        })
    }

    /// Census profile of a zone, or the city-wide totals for "all".
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if no census table is loaded for the
    /// zone-type, the zone is unknown, or the zone has no census row.
    pub fn census(&self, zone_type: ZoneType, zone: &ZoneSelect) -> Result<CensusReport, ReportError> {
        let table = self
            .dataset
            .census(zone_type)
            .ok_or(ReportError::CensusUnavailable(zone_type))?;

        let profile = match zone.zone_id() {
            None => table.citywide(self.dataset.city()),
            Some(id) => {
                let index = self
                    .dataset
                    .zone_index(zone_type)
                    .ok_or(AggregateError::ZoneTypeUnavailable(zone_type))?;
                let found = index
                    .position(id)
                    .and_then(|position| index.zone(position))
                    .ok_or_else(|| AggregateError::ZoneNotFound {
                        zone_type,
                        zone_id: id.to_string(),
                    })?;
                table.lookup(found)?.clone()
            }
        };

        Ok(CensusReport {
            zone_type,
            vacancy_rate: profile.vacancy_rate(),
            profile,
        })
    }

    /// Suggested nightly price for `features` in `month`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Price`] if no model serves the month or the
    /// model does not know the zone.
    pub fn predict(&self, features: PriceFeatures, month: YearMonth) -> Result<PriceReport, ReportError> {
        let models = self.dataset.models();
        let model = models.model_for(features.zone_type(), month)?.name().to_string();
        let price = models.suggest(&features, month)?;
        Ok(PriceReport {
            month,
            model,
            features,
            price,
        })
    }

    fn zone_label(&self, zone: &ZoneSelect) -> String {
        match zone {
            ZoneSelect::All => format!("All ({})", self.dataset.city()),
            ZoneSelect::Zone(id) => id.clone(),
        }
    }
}

/// Prints `report` as pretty JSON or as text.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if serialization fails.
pub fn emit<T: Serialize + fmt::Display>(report: &T, json: bool) -> Result<(), ReportError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

// ── Text rendering ──

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("${v:.2}"))
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}%", v * 100.0))
}

impl fmt::Display for ZonesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<32} {:>8} {:>10} {:>12}",
            self.zone_type.singular(),
            "LISTINGS",
            "KM²",
            "PER KM²"
        )?;
        writeln!(f, "{}", "-".repeat(65))?;
        for stats in &self.zones {
            writeln!(
                f,
                "{:<32} {:>8} {:>10.3} {:>12.2}",
                stats.zone_id, stats.listing_count, stats.area_km2, stats.density
            )?;
        }
        write!(
            f,
            "{} listing records, {} outside every zone",
            self.listing_total, self.unassigned
        )
    }
}

impl fmt::Display for ScopeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "{} / {}", self.zone, self.month.long_label())?;
        if let Some(stats) = &self.zone_stats {
            writeln!(
                f,
                "  Density:          {:.2} listings/km² ({} over {:.3} km²)",
                stats.density, stats.listing_count, stats.area_km2
            )?;
        }
        writeln!(f, "  Records:          {}", s.total_records)?;
        writeln!(f, "  Listings:         {}", s.distinct_listings)?;
        writeln!(f, "  Highest price:    {}", money(s.highest_price))?;
        writeln!(f, "  Average price:    {}", money(s.average_price))?;
        writeln!(f, "  Lowest price:     {}", money(s.lowest_price))?;
        writeln!(f, "  Vacancy rate:     {}", percent(s.vacancy_rate))?;
        writeln!(f, "  Short-term share: {}", percent(s.short_term_share))?;
        if !s.room_types.is_empty() {
            writeln!(f, "  Room types:")?;
            for room in &s.room_types {
                writeln!(f, "    {:<20} {}", room.label, room.count)?;
            }
        }
        for (title, ranking) in [
            ("Below-average price amenities", &s.low_price_amenities),
            ("Above-average price amenities", &s.high_price_amenities),
        ] {
            if ranking.is_empty() {
                continue;
            }
            let top: Vec<&str> = ranking.iter().take(10).map(|a| a.label.as_str()).collect();
            writeln!(f, "  {title}: {}", top.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for CensusReport {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.profile;
        writeln!(f, "{} (population {})", p.zone_id, p.population_total)?;
        for count in p.demographic_breakdown() {
            let share = (p.population_total > 0)
                .then(|| count.count as f64 / p.population_total as f64);
            writeln!(f, "  {:<40} {:>8} {:>7}", count.label, count.count, percent(share))?;
        }
        writeln!(f, "Housing units: {}", p.household_total())?;
        for count in p.household_breakdown() {
            writeln!(f, "  {:<40} {:>8}", count.label, count.count)?;
        }
        write!(f, "Vacancy rate: {}", percent(self.vacancy_rate))
    }
}

impl fmt::Display for PriceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} in {}, {} bedroom(s), {} guest(s)",
            self.features.room_type(),
            self.features.zone_id(),
            self.features.bedrooms(),
            self.features.accommodates()
        )?;
        write!(
            f,
            "Suggested price for {}: ${:.2}/night (model {})",
            self.month.long_label(),
            self.price,
            self.model
        )
    }
}
