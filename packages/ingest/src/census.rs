//! Census CSV loader.
//!
//! Columns are interpreted by header name: a key column, a total
//! population column, household occupancy columns, and every other column
//! as a demographic category.

use std::fs::File;
use std::io::{BufReader, Read};

use rental_map_census::{CensusCount, CensusProfile, CensusTable};
use rental_map_zone_models::ZoneType;

use crate::IngestError;
use crate::config::CensusSourceConfig;

/// Role of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Key,
    Total,
    Household,
    Demographic,
    Skip,
}

/// Reads the census table described by `config`.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read, a required column
/// is missing, a count is not a whole number, or keys repeat.
pub fn load_census(
    zone_type: ZoneType,
    config: &CensusSourceConfig,
) -> Result<CensusTable, IngestError> {
    let file = File::open(&config.path).map_err(|e| IngestError::io(&config.path, e))?;
    let table = read_census(
        BufReader::new(file),
        zone_type,
        config,
        &config.path.display().to_string(),
    )?;
    log::info!(
        "Loaded {} {zone_type} census rows from {}",
        table.len(),
        config.path.display()
    );
    Ok(table)
}

/// Parses census CSV from any reader. `source` labels error messages.
///
/// # Errors
///
/// See [`load_census`].
pub fn read_census<R: Read>(
    reader: R,
    zone_type: ZoneType,
    config: &CensusSourceConfig,
    source: &str,
) -> Result<CensusTable, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::data_format(source, "header", e.to_string()))?
        .iter()
        .map(ToString::to_string)
        .collect();

    let roles: Vec<Column> = headers.iter().map(|h| role(h, config)).collect();
    for (required, column) in [
        (&config.key_column, Column::Key),
        (&config.total_column, Column::Total),
    ] {
        if !roles.contains(&column) {
            return Err(IngestError::data_format(
                source,
                "header",
                format!("missing column '{required}'"),
            ));
        }
    }
    if let Some(missing) = config
        .household_columns
        .iter()
        .find(|c| !headers.contains(c))
    {
        return Err(IngestError::data_format(
            source,
            "header",
            format!("missing household column '{missing}'"),
        ));
    }

    let mut profiles = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let line = i + 2;
        let record = result
            .map_err(|e| IngestError::data_format(source, format!("row {line}"), e.to_string()))?;

        let mut profile = CensusProfile {
            zone_id: String::new(),
            population_total: 0,
            demographics: Vec::new(),
            households: Vec::new(),
        };

        for ((header, role), value) in headers.iter().zip(&roles).zip(record.iter()) {
            if *role == Column::Key {
                profile.zone_id = value.to_string();
                continue;
            }
            if *role == Column::Skip {
                continue;
            }

            let count = parse_count(value).ok_or_else(|| {
                IngestError::data_format(
                    source,
                    format!("row {line}"),
                    format!("{header} '{value}' is not a whole number"),
                )
            })?;

            match role {
                Column::Total => profile.population_total = count,
                Column::Household => profile.households.push(CensusCount::new(header.clone(), count)),
                Column::Demographic => profile
                    .demographics
                    .push(CensusCount::new(header.clone(), count)),
                Column::Key | Column::Skip => {}
            }
        }

        if profile.zone_id.trim().is_empty() {
            return Err(IngestError::data_format(
                source,
                format!("row {line}"),
                format!("empty '{}'", config.key_column),
            ));
        }
        profiles.push(profile);
    }

    let table = CensusTable::new(zone_type, profiles)?;
    Ok(match &config.zone_property {
        Some(property) => table.with_key_property(property.clone()),
        None => table,
    })
}

fn role(header: &str, config: &CensusSourceConfig) -> Column {
    if header == config.key_column {
        Column::Key
    } else if header == config.total_column {
        Column::Total
    } else if config.household_columns.iter().any(|c| c == header) {
        Column::Household
    } else if header.is_empty() || config.skip_columns.iter().any(|c| c == header) {
        Column::Skip
    } else {
        Column::Demographic
    }
}

/// Parses `1234`, `1,234` or `1234.0`. Empty cells count as zero.
fn parse_count(value: &str) -> Option<u64> {
    let cleaned: String = value.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Some(0);
    }
    if let Ok(n) = cleaned.parse::<u64>() {
        return Some(n);
    }
    let float = cleaned.parse::<f64>().ok()?;
    #[allow(clippy::cast_precision_loss)]
    let in_range = (0.0..=u64::MAX as f64).contains(&float);
    if float.fract() == 0.0 && in_range {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(float as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn config() -> CensusSourceConfig {
        CensusSourceConfig {
            path: PathBuf::from("census.csv"),
            key_column: "field concept".to_string(),
            total_column: "Total:".to_string(),
            household_columns: vec!["Occupied".to_string(), "Vacant".to_string()],
            skip_columns: vec!["GEOID".to_string()],
            zone_property: None,
        }
    }

    const CSV: &str = "\
field concept,GEOID,Total:,White,Black,Asian,Occupied,Vacant
Back Bay,25025,\"1,000\",600,0,400,450,50
Harbor Islands,25026,0,0,0,0,0,0
";

    #[test]
    fn columns_are_assigned_by_header() {
        let table = read_census(CSV.as_bytes(), ZoneType::Neighborhood, &config(), "test").unwrap();
        assert_eq!(table.len(), 2);

        let back_bay = table.profile("Back Bay").unwrap();
        assert_eq!(back_bay.population_total, 1000);
        let labels: Vec<&str> = back_bay.demographics.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["White", "Black", "Asian"]);
        assert_eq!(back_bay.household_total(), 500);
        assert!((back_bay.vacancy_rate().unwrap() - 0.1).abs() < 1e-12);

        assert_eq!(table.profile("Harbor Islands").unwrap().vacancy_rate(), None);
    }

    #[test]
    fn citywide_from_loaded_rows() {
        let table = read_census(CSV.as_bytes(), ZoneType::Neighborhood, &config(), "test").unwrap();
        assert_eq!(table.citywide("Boston").population_total, 1000);
    }

    #[test]
    fn missing_key_column_is_reported() {
        let mut config = config();
        config.key_column = "Census Tract".to_string();
        let err = read_census(CSV.as_bytes(), ZoneType::Tract, &config, "test").unwrap_err();
        assert!(matches!(err, IngestError::DataFormat { ref message, .. } if message.contains("Census Tract")));
    }

    #[test]
    fn non_numeric_count_names_the_row() {
        let csv = "field concept,Total:,White,Occupied,Vacant\nA,ten,1,1,1\n";
        let err = read_census(csv.as_bytes(), ZoneType::Neighborhood, &config(), "test").unwrap_err();
        assert!(matches!(err, IngestError::DataFormat { ref record, .. } if record == "row 2"));
    }

    #[test]
    fn empty_zone_key_names_the_row() {
        let csv = "field concept,Total:,White,Occupied,Vacant\nA,10,1,1,1\n ,5,1,1,1\n";
        let err = read_census(csv.as_bytes(), ZoneType::Neighborhood, &config(), "test").unwrap_err();
        assert!(matches!(
            err,
            IngestError::DataFormat { ref record, ref message, .. }
                if record == "row 3" && message.contains("field concept")
        ));
    }

    #[test]
    fn key_property_is_carried_from_config() {
        let mut config = config();
        config.zone_property = Some("TRACTCE20".to_string());
        let csv = "field concept,Total:,White,Occupied,Vacant\n010103,5,5,2,1\n";
        let table = read_census(csv.as_bytes(), ZoneType::Tract, &config, "test").unwrap();

        let mut zone = rental_map_zone_models::Zone::new("101.03", geo::MultiPolygon(vec![]));
        zone.properties
            .insert("TRACTCE20".to_string(), "010103".to_string());
        assert_eq!(table.lookup(&zone).unwrap().population_total, 5);
    }

    #[test]
    fn count_formats() {
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count(""), Some(0));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("1.5"), None);
    }
}
