#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the rental map toolkit.
//!
//! Loads the dataset named by `--config` (or `RENTAL_MAP_CONFIG`, or
//! `rental_map.toml`), then runs one report subcommand. Without a
//! subcommand an interactive `dialoguer` menu walks through the same
//! reports.
//!
//! Uses `indicatif-log-bridge` (via [`rental_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod interactive;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rental_map_aggregate::AggregateCache;
use rental_map_cli_utils::IndicatifProgress;
use rental_map_ingest::{Dataset, DatasetConfig, resolve_config_path};
use rental_map_listing_models::YearMonth;
use rental_map_price::{Amenity, PriceFeatures, PropertyType, RoomType};
use rental_map_zone_models::{ZoneSelect, ZoneType};

use crate::report::{Reports, emit};

#[derive(Parser)]
#[command(name = "rental_map_cli", about = "Short-term rental listing density explorer")]
struct Cli {
    /// Dataset config file (overrides `RENTAL_MAP_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Listing count, area and density of every zone
    Zones {
        /// Zone type ("neighborhood" or "tract")
        #[arg(long, default_value = "neighborhood")]
        zone_type: ZoneType,
    },
    /// Summary of the listings in one zone (or all) for one month
    Scope {
        /// Zone type ("neighborhood" or "tract")
        #[arg(long, default_value = "neighborhood")]
        zone_type: ZoneType,
        /// Zone id, or "all"
        #[arg(long, default_value = "all")]
        zone: ZoneSelect,
        /// Snapshot month (e.g., "2023-04")
        #[arg(long)]
        month: YearMonth,
    },
    /// Census demographics and housing vacancy of one zone (or the city)
    Census {
        /// Zone type ("neighborhood" or "tract")
        #[arg(long, default_value = "neighborhood")]
        zone_type: ZoneType,
        /// Zone id, or "all"
        #[arg(long, default_value = "all")]
        zone: ZoneSelect,
    },
    /// Suggest a nightly price for a prospective listing
    Predict {
        /// Zone type ("neighborhood" or "tract")
        #[arg(long, default_value = "neighborhood")]
        zone_type: ZoneType,
        /// Zone id
        #[arg(long)]
        zone: ZoneSelect,
        /// Month whose model to use (e.g., "2023-04")
        #[arg(long)]
        month: YearMonth,
        /// Room type (e.g., "entire", "private")
        #[arg(long)]
        room_type: RoomType,
        /// Property type (e.g., "Entire rental unit")
        #[arg(long)]
        property_type: PropertyType,
        /// Number of bedrooms (1-15)
        #[arg(long, default_value = "1")]
        bedrooms: u32,
        /// Number of guests (1-20)
        #[arg(long, default_value = "2")]
        guests: u32,
        /// Amenity (repeatable, e.g., `--amenity internet --amenity gym`)
        #[arg(long = "amenity")]
        amenities: Vec<Amenity>,
    },
    /// List the months with listing snapshots
    Months,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = rental_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config);
    log::debug!("Using dataset config {}", config_path.display());
    let config = DatasetConfig::load(&config_path)?;

    let progress = IndicatifProgress::steps_bar(&multi, "Loading dataset");
    let dataset = Dataset::load(&config, progress.as_ref())?;

    let cache = AggregateCache::new();
    let reports = Reports::new(&dataset, &cache).with_progress(&multi);

    let Some(command) = cli.command else {
        return interactive::run(&reports);
    };

    match command {
        Commands::Zones { zone_type } => emit(&reports.zones(zone_type)?, cli.json)?,
        Commands::Scope {
            zone_type,
            zone,
            month,
        } => emit(&reports.scope(zone_type, &zone, month)?, cli.json)?,
        Commands::Census { zone_type, zone } => {
            emit(&reports.census(zone_type, &zone)?, cli.json)?;
        }
        Commands::Predict {
            zone_type,
            zone,
            month,
            room_type,
            property_type,
            bedrooms,
            guests,
            amenities,
        } => {
            let features = PriceFeatures::new(
                zone_type,
                &zone,
                room_type,
                property_type,
                bedrooms,
                guests,
                amenities,
            )?;
            emit(&reports.predict(features, month)?, cli.json)?;
        }
        Commands::Months => {
            let months = dataset.available_months();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&months)?);
            } else {
                for month in months {
                    println!("{month}  {}", month.long_label());
                }
            }
        }
    }

    Ok(())
}
