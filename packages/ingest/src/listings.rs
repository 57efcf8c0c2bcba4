//! Listing CSV loader.
//!
//! One row per listing snapshot. Required columns: `id`, `latitude`,
//! `longitude`, `price`, `date`, `room_type`, `property_type`,
//! `minimum_nights`, `available`, `amenities`. Extra columns are ignored.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use rental_map_aggregate::progress::ProgressCallback;
use rental_map_listing_models::Listing;
use serde::Deserialize;

use crate::IngestError;

/// Rows between progress updates.
const PROGRESS_BATCH: u64 = 5_000;

/// A raw CSV row. Every field is parsed by hand so failures can name the
/// row and listing.
#[derive(Debug, Deserialize)]
struct ListingRow {
    id: String,
    latitude: String,
    longitude: String,
    price: String,
    date: String,
    room_type: String,
    property_type: String,
    minimum_nights: String,
    available: String,
    #[serde(default)]
    amenities: String,
}

/// Opens a listing file, decompressing it when the name ends in `.gz`.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or any row is
/// malformed. No rows are skipped.
pub fn load_listings(
    path: &Path,
    progress: &dyn ProgressCallback,
) -> Result<Vec<Listing>, IngestError> {
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    let label = path.display().to_string();

    let is_gzip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    let listings = if is_gzip {
        log::debug!("Reading gzip-compressed listings from {label}");
        read_listings(GzDecoder::new(BufReader::new(file)), &label, progress)?
    } else {
        read_listings(BufReader::new(file), &label, progress)?
    };

    log::info!("Loaded {} listing records from {label}", listings.len());
    Ok(listings)
}

/// Parses listing CSV from any reader. `source` labels error messages.
///
/// # Errors
///
/// Returns [`IngestError::DataFormat`] for the first malformed row.
pub fn read_listings<R: Read>(
    reader: R,
    source: &str,
    progress: &dyn ProgressCallback,
) -> Result<Vec<Listing>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    progress.set_message(format!("Reading listings from {source}"));

    let mut listings = Vec::new();
    for (i, result) in reader.deserialize::<ListingRow>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = result.map_err(|e| {
            IngestError::data_format(source, format!("row {line}"), e.to_string())
        })?;
        listings.push(parse_row(row, line, source)?);

        if (i as u64 + 1) % PROGRESS_BATCH == 0 {
            progress.inc(PROGRESS_BATCH);
        }
    }

    progress.finish(format!("Read {} listing records", listings.len()));
    Ok(listings)
}

fn parse_row(row: ListingRow, line: usize, source: &str) -> Result<Listing, IngestError> {
    let record = format!("row {line} (id={})", row.id);
    let fail = |field: &str, value: &str, expected: &str| {
        IngestError::data_format(
            source,
            record.clone(),
            format!("{field} '{value}' is not {expected}"),
        )
    };

    let id = row
        .id
        .parse::<u64>()
        .map_err(|_| fail("id", &row.id, "an unsigned integer"))?;
    let latitude = row
        .latitude
        .parse::<f64>()
        .map_err(|_| fail("latitude", &row.latitude, "a number"))?;
    let longitude = row
        .longitude
        .parse::<f64>()
        .map_err(|_| fail("longitude", &row.longitude, "a number"))?;
    let price = parse_price(&row.price).ok_or_else(|| fail("price", &row.price, "a price"))?;
    let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
        .map_err(|_| fail("date", &row.date, "a YYYY-MM-DD date"))?;
    let minimum_nights = parse_count(&row.minimum_nights)
        .ok_or_else(|| fail("minimum_nights", &row.minimum_nights, "a whole number"))?;
    let available = parse_flag(&row.available)
        .ok_or_else(|| fail("available", &row.available, "t/f, true/false or 1/0"))?;
    let amenities = parse_amenities(&row.amenities)
        .map_err(|message| IngestError::data_format(source, record.clone(), message))?;

    if row.room_type.is_empty() {
        return Err(IngestError::data_format(source, record, "room_type is empty"));
    }

    let listing = Listing {
        id,
        latitude,
        longitude,
        price,
        room_type: row.room_type,
        property_type: row.property_type,
        minimum_nights,
        available,
        date,
        amenities,
    };

    if !listing.has_valid_coordinates() {
        return Err(IngestError::data_format(
            source,
            record,
            format!("coordinates ({latitude}, {longitude}) are out of range"),
        ));
    }

    Ok(listing)
}

/// Parses `125`, `125.50` or `$1,234.00`.
fn parse_price(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Parses a non-negative whole number, accepting `30.0`.
fn parse_count(value: &str) -> Option<u32> {
    if let Ok(n) = value.parse::<u32>() {
        return Some(n);
    }
    let float = value.parse::<f64>().ok()?;
    if float.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&float) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(float as u32)
    } else {
        None
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" => Some(true),
        "f" | "false" | "0" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parses an amenity list written either as a JSON array or as a
/// Python-literal list (`['Wifi', "Chef's kitchen"]`).
fn parse_amenities(value: &str) -> Result<BTreeSet<String>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(BTreeSet::new());
    }

    if let Ok(items) = serde_json::from_str::<Vec<String>>(value) {
        return Ok(items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect());
    }

    parse_literal_list(value)
}

fn parse_literal_list(value: &str) -> Result<BTreeSet<String>, String> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| format!("amenities '{value}' is not a list"))?;

    let mut items = BTreeSet::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}

        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Err(format!("amenities '{value}' has an unquoted item"));
        }

        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        item.push(escaped);
                    }
                }
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return Err(format!("amenities '{value}' has an unterminated item"));
        }

        let item = item.trim();
        if !item.is_empty() {
            items.insert(item.to_string());
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use rental_map_aggregate::progress::NullProgress;

    use super::*;

    const HEADER: &str =
        "id,latitude,longitude,price,date,room_type,property_type,minimum_nights,available,amenities\n";

    fn read(body: &str) -> Result<Vec<Listing>, IngestError> {
        read_listings(format!("{HEADER}{body}").as_bytes(), "test.csv", &NullProgress)
    }

    #[test]
    fn parses_dashboard_style_rows() {
        let listings = read(concat!(
            "101,42.35,-71.06,\"$1,234.00\",2023-04-15,Entire home/apt,Entire rental unit,2,t,\"[\"\"Wifi\"\", \"\"Kitchen\"\"]\"\n",
            "102,42.36,-71.05,85,2023-05-01,Private room,Private room in home,30.0,f,\"['Wifi', \"\"Chef's kitchen\"\"]\"\n",
        ))
        .unwrap();

        assert_eq!(listings.len(), 2);
        let first = &listings[0];
        assert_eq!(first.id, 101);
        assert!((first.price - 1234.0).abs() < f64::EPSILON);
        assert!(first.available);
        assert_eq!(
            first.amenities,
            BTreeSet::from(["Kitchen".to_string(), "Wifi".to_string()])
        );

        let second = &listings[1];
        assert_eq!(second.minimum_nights, 30);
        assert!(!second.available);
        assert!(second.amenities.contains("Chef's kitchen"));
    }

    #[test]
    fn repeated_ids_are_separate_records() {
        let listings = read(concat!(
            "7,42.35,-71.06,100,2023-04-15,Entire home/apt,Entire home,2,t,[]\n",
            "7,42.35,-71.06,100,2023-04-16,Entire home/apt,Entire home,2,f,[]\n",
        ))
        .unwrap();
        assert_eq!(listings.len(), 2);
    }

    #[test]
    fn malformed_rows_name_row_and_listing() {
        let err = read("55,north,-71.06,100,2023-04-15,Entire home/apt,Entire home,2,t,[]\n")
            .unwrap_err();
        match err {
            IngestError::DataFormat { record, message, .. } => {
                assert_eq!(record, "row 2 (id=55)");
                assert!(message.contains("latitude"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let err = read("9,142.35,-71.06,100,2023-04-15,Entire home/apt,Entire home,2,t,[]\n")
            .unwrap_err();
        assert!(matches!(err, IngestError::DataFormat { .. }));
    }

    #[test]
    fn missing_column_is_a_data_format_error() {
        let err = read_listings("id,latitude\n1,42.0\n".as_bytes(), "short.csv", &NullProgress)
            .unwrap_err();
        assert!(matches!(err, IngestError::DataFormat { ref record, .. } if record == "row 2"));
    }

    #[test]
    fn price_formats() {
        assert_eq!(parse_price("$1,234.50"), Some(1234.5));
        assert_eq!(parse_price("99"), Some(99.0));
        assert_eq!(parse_price("-5"), None);
        assert_eq!(parse_price("free"), None);
    }

    #[test]
    fn flag_formats() {
        assert_eq!(parse_flag("t"), Some(true));
        assert_eq!(parse_flag("FALSE"), Some(false));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn literal_lists() {
        assert_eq!(parse_amenities("[]").unwrap(), BTreeSet::new());
        assert_eq!(
            parse_amenities(r"['a\'b', 'c']").unwrap(),
            BTreeSet::from(["a'b".to_string(), "c".to_string()])
        );
        assert!(parse_amenities("['open").is_err());
        assert!(parse_amenities("Wifi, Kitchen").is_err());
    }
}
