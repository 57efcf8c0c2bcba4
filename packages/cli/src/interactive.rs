#![allow(clippy::module_name_repetitions)]

//! Interactive menu for the rental map CLI.
//!
//! Walks through the same reports as the subcommands using `dialoguer`
//! prompts, looping until the user quits. The dataset stays loaded and
//! aggregates stay cached between reports.

use dialoguer::{Input, MultiSelect, Select};
use rental_map_aggregate::AggregateSource as _;
use rental_map_listing_models::YearMonth;
use rental_map_price::features::{ACCOMMODATES, BEDROOMS};
use rental_map_price::{Amenity, PriceFeatures, PropertyType, RoomType};
use rental_map_zone_models::{ZoneSelect, ZoneType};
use strum::IntoEnumIterator as _;

use crate::report::{Reports, emit};

/// Top-level actions available in the interactive menu.
enum Action {
    Zones,
    Scope,
    Census,
    Predict,
    Months,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Zones,
        Self::Scope,
        Self::Census,
        Self::Predict,
        Self::Months,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Zones => "Listing density by zone",
            Self::Scope => "Listings data",
            Self::Census => "Census info",
            Self::Predict => "Price suggestion",
            Self::Months => "Available months",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the interactive menu loop.
///
/// Report errors are logged and the loop continues; prompt failures end
/// it.
///
/// # Errors
///
/// Returns an error if a prompt cannot be shown.
pub fn run(reports: &Reports<'_>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Rental Map: {}", reports.dataset().city());
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to see?")
            .items(&labels)
            .default(0)
            .interact()?;

        let result = match Action::ALL[idx] {
            Action::Zones => {
                let zone_type = prompt_zone_type(reports)?;
                reports.zones(zone_type).and_then(|r| emit(&r, false))
            }
            Action::Scope => {
                let zone_type = prompt_zone_type(reports)?;
                let zone = prompt_zone(reports, zone_type, true)?;
                let month = prompt_month(&reports.dataset().available_months())?;
                reports
                    .scope(zone_type, &zone, month)
                    .and_then(|r| emit(&r, false))
            }
            Action::Census => {
                let zone_type = prompt_zone_type(reports)?;
                let zone = prompt_zone(reports, zone_type, true)?;
                reports
                    .census(zone_type, &zone)
                    .and_then(|r| emit(&r, false))
            }
            Action::Predict => predict(reports)?,
            Action::Months => {
                for month in reports.dataset().available_months() {
                    println!("{month}  {}", month.long_label());
                }
                Ok(())
            }
            Action::Quit => return Ok(()),
        };

        if let Err(e) = result {
            log::error!("{e}");
        }
        println!();
    }
}

fn predict(
    reports: &Reports<'_>,
) -> Result<Result<(), crate::report::ReportError>, Box<dyn std::error::Error>> {
    let zone_type = prompt_zone_type(reports)?;
    let zone = prompt_zone(reports, zone_type, false)?;
    let months: Vec<YearMonth> = reports.dataset().models().schedule().months().collect();
    let month = prompt_month(&months)?;

    let room_types: Vec<RoomType> = RoomType::iter().collect();
    let room_type = room_types[select("Room type", &room_types)?];

    let property_types: Vec<PropertyType> = PropertyType::iter().collect();
    let property_type = property_types[select("Property type", &property_types)?];

    let bedrooms = prompt_count("Bedrooms", *BEDROOMS.start(), *BEDROOMS.end())?;
    let guests = prompt_count("Guests", *ACCOMMODATES.start(), *ACCOMMODATES.end())?;

    let amenities: Vec<Amenity> = Amenity::iter().collect();
    let labels: Vec<String> = amenities.iter().map(ToString::to_string).collect();
    let chosen = MultiSelect::new()
        .with_prompt("Amenities (space=toggle, enter=confirm)")
        .items(&labels)
        .max_length(15)
        .interact()?;

    let features = PriceFeatures::new(
        zone_type,
        &zone,
        room_type,
        property_type,
        bedrooms,
        guests,
        chosen.into_iter().map(|i| amenities[i]),
    );

    Ok(features
        .map_err(crate::report::ReportError::from)
        .and_then(|f| reports.predict(f, month))
        .and_then(|r| emit(&r, false)))
}

fn select<T: ToString>(prompt: &str, items: &[T]) -> Result<usize, dialoguer::Error> {
    let labels: Vec<String> = items.iter().map(ToString::to_string).collect();
    Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .max_length(15)
        .interact()
}

fn prompt_zone_type(reports: &Reports<'_>) -> Result<ZoneType, dialoguer::Error> {
    let zone_types = reports.dataset().zone_types();
    if zone_types.len() == 1 {
        return Ok(zone_types[0]);
    }
    let labels: Vec<&str> = zone_types.iter().map(|z| z.label()).collect();
    let idx = Select::new()
        .with_prompt("Zone type")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(zone_types[idx])
}

fn prompt_zone(
    reports: &Reports<'_>,
    zone_type: ZoneType,
    allow_all: bool,
) -> Result<ZoneSelect, dialoguer::Error> {
    let mut ids: Vec<&str> = reports
        .dataset()
        .zone_index(zone_type)
        .map(|index| index.zones().iter().map(|z| z.zone_id.as_str()).collect())
        .unwrap_or_default();
    ids.sort_unstable();

    let mut labels: Vec<String> = Vec::with_capacity(ids.len() + 1);
    if allow_all {
        labels.push(format!("All ({})", reports.dataset().city()));
    }
    labels.extend(ids.iter().map(ToString::to_string));

    let idx = Select::new()
        .with_prompt(zone_type.singular())
        .items(&labels)
        .default(0)
        .max_length(15)
        .interact()?;

    Ok(if allow_all && idx == 0 {
        ZoneSelect::All
    } else {
        ZoneSelect::Zone(labels[idx].clone())
    })
}

fn prompt_month(months: &[YearMonth]) -> Result<YearMonth, Box<dyn std::error::Error>> {
    if months.is_empty() {
        return Err("No months available".into());
    }
    let labels: Vec<String> = months.iter().map(|m| m.long_label()).collect();
    let idx = Select::new()
        .with_prompt("Month")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(months[idx])
}

fn prompt_count(prompt: &str, min: u32, max: u32) -> Result<u32, dialoguer::Error> {
    Input::<u32>::new()
        .with_prompt(format!("{prompt} ({min}-{max})"))
        .default(min)
        .validate_with(move |n: &u32| {
            if (min..=max).contains(n) {
                Ok(())
            } else {
                Err(format!("must be between {min} and {max}"))
            }
        })
        .interact_text()
}
