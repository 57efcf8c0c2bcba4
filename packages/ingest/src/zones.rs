//! Zone `GeoJSON` loader.

use std::collections::BTreeMap;
use std::path::Path;

use geo::{Geometry, MultiPolygon};
use geojson::{Feature, GeoJson, JsonValue};
use rental_map_spatial::crs::Crs;
use rental_map_zone_models::Zone;

use crate::IngestError;
use crate::config::ZoneSourceConfig;

/// Reads the zone collection described by `config`, converted to lon/lat.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read, the CRS is
/// unsupported, or any feature is malformed.
pub fn load_zones(config: &ZoneSourceConfig) -> Result<Vec<Zone>, IngestError> {
    let text = std::fs::read_to_string(&config.path).map_err(|e| IngestError::io(&config.path, e))?;
    let crs: Crs = config.native_crs.parse()?;
    let zones = parse_zones(&text, &config.id_field, crs, &config.path)?;
    log::info!(
        "Loaded {} {} zones from {} ({crs})",
        zones.len(),
        config.zone_type,
        config.path.display()
    );
    Ok(zones)
}

/// Parses a `FeatureCollection`. Each feature's id comes from property
/// `id_field`; geometry must be a `Polygon` or `MultiPolygon` in `crs`.
///
/// # Errors
///
/// Returns [`IngestError::DataFormat`] naming the feature for a missing id
/// or geometry, or a non-polygon geometry, and [`IngestError::Spatial`] for
/// coordinates that do not convert to valid lon/lat.
pub fn parse_zones(
    text: &str,
    id_field: &str,
    crs: Crs,
    path: &Path,
) -> Result<Vec<Zone>, IngestError> {
    let file = path.display().to_string();

    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| IngestError::data_format(&file, "document", e.to_string()))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(IngestError::data_format(
            &file,
            "document",
            "expected a FeatureCollection",
        ));
    };

    if let Some(declared) = declared_crs(collection.foreign_members.as_ref())
        && declared != crs
    {
        log::warn!("{file} declares {declared} but is configured as {crs}; using {crs}");
    }

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| parse_feature(feature, i, id_field, crs, &file))
        .collect()
}

fn parse_feature(
    feature: Feature,
    index: usize,
    id_field: &str,
    crs: Crs,
    file: &str,
) -> Result<Zone, IngestError> {
    let record = format!("feature {index}");

    let zone_id = feature
        .property(id_field)
        .and_then(property_text)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            IngestError::data_format(file, record.clone(), format!("missing '{id_field}' property"))
        })?;
    let record = format!("{record} ({zone_id})");

    let geometry = feature
        .geometry
        .ok_or_else(|| IngestError::data_format(file, record.clone(), "missing geometry"))?;

    let geometry: Geometry<f64> = geometry
        .try_into()
        .map_err(|e: geojson::Error| IngestError::data_format(file, record.clone(), e.to_string()))?;

    let multi = match geometry {
        Geometry::MultiPolygon(mp) => mp,
        Geometry::Polygon(p) => MultiPolygon(vec![p]),
        other => {
            return Err(IngestError::data_format(
                file,
                record,
                format!("expected Polygon or MultiPolygon, got {}", geometry_name(&other)),
            ));
        }
    };

    let properties: BTreeMap<String, String> = feature
        .properties
        .iter()
        .flatten()
        .filter(|(key, _)| key.as_str() != id_field)
        .filter_map(|(key, value)| property_text(value).map(|v| (key.clone(), v)))
        .collect();

    let geometry = crs.to_lon_lat(&zone_id, &multi)?;
    log::trace!("Parsed zone '{zone_id}' with {} polygons", geometry.0.len());

    Ok(Zone {
        zone_id,
        geometry,
        properties,
    })
}

/// Property value as text; strings verbatim, numbers and booleans
/// formatted, nulls and nested values dropped.
fn property_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The legacy `crs` member of a `GeoJSON` document, if it names a
/// supported CRS.
fn declared_crs(foreign: Option<&geojson::JsonObject>) -> Option<Crs> {
    foreign?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?
        .parse()
        .ok()
}

const fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use geo::CoordsIter as _;

    use super::*;

    fn parse(text: &str, crs: Crs) -> Result<Vec<Zone>, IngestError> {
        parse_zones(text, "name", crs, Path::new("zones.geojson"))
    }

    const SQUARE: &str = "[[[-71.1, 42.3], [-71.0, 42.3], [-71.0, 42.4], [-71.1, 42.4], [-71.1, 42.3]]]";

    #[test]
    fn parses_polygon_features_with_properties() {
        let text = format!(
            r#"{{
                "type": "FeatureCollection",
                "features": [
                    {{ "type": "Feature",
                       "properties": {{ "name": "Back Bay", "TRACTCE20": "010103", "OBJECTID": 4 }},
                       "geometry": {{ "type": "Polygon", "coordinates": {SQUARE} }} }}
                ]
            }}"#
        );
        let zones = parse(&text, Crs::Wgs84).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].zone_id, "Back Bay");
        assert_eq!(zones[0].property("TRACTCE20"), Some("010103"));
        assert_eq!(zones[0].property("OBJECTID"), Some("4"));
        assert_eq!(zones[0].property("name"), None);
        assert_eq!(zones[0].geometry.0.len(), 1);
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let text = format!(
            r#"{{ "type": "FeatureCollection", "features": [
                {{ "type": "Feature", "properties": {{ "name": 101 }},
                   "geometry": {{ "type": "MultiPolygon", "coordinates": [{SQUARE}] }} }}
            ] }}"#
        );
        assert_eq!(parse(&text, Crs::Wgs84).unwrap()[0].zone_id, "101");
    }

    #[test]
    fn web_mercator_input_is_converted() {
        let text = r#"{ "type": "FeatureCollection", "features": [
            { "type": "Feature", "properties": { "name": "m" },
              "geometry": { "type": "Polygon", "coordinates":
                [[[-7910240.0, 5215074.0], [-7900240.0, 5215074.0], [-7900240.0, 5225074.0], [-7910240.0, 5215074.0]]] } }
        ] }"#;
        let zones = parse(text, Crs::WebMercator).unwrap();
        let first = zones[0].geometry.coords_iter().next().unwrap();
        assert!((first.x - -71.0589).abs() < 1e-3);
        assert!((first.y - 42.3601).abs() < 1e-3);
    }

    #[test]
    fn projected_coordinates_read_as_lon_lat_are_rejected() {
        let text = r#"{ "type": "FeatureCollection", "features": [
            { "type": "Feature", "properties": { "name": "m" },
              "geometry": { "type": "Polygon", "coordinates":
                [[[-7910240.0, 5215074.0], [-7900240.0, 5215074.0], [-7900240.0, 5225074.0], [-7910240.0, 5215074.0]]] } }
        ] }"#;
        assert!(matches!(parse(text, Crs::Wgs84), Err(IngestError::Spatial(_))));
    }

    #[test]
    fn missing_geometry_and_id_name_the_feature() {
        let text = r#"{ "type": "FeatureCollection", "features": [
            { "type": "Feature", "properties": { "name": "Nowhere" }, "geometry": null }
        ] }"#;
        match parse(text, Crs::Wgs84).unwrap_err() {
            IngestError::DataFormat { record, message, .. } => {
                assert_eq!(record, "feature 0 (Nowhere)");
                assert_eq!(message, "missing geometry");
            }
            other => panic!("unexpected error: {other}"),
        }

        let text = format!(
            r#"{{ "type": "FeatureCollection", "features": [
                {{ "type": "Feature", "properties": {{ "other": "x" }},
                   "geometry": {{ "type": "Polygon", "coordinates": {SQUARE} }} }}
            ] }}"#
        );
        assert!(matches!(
            parse(&text, Crs::Wgs84),
            Err(IngestError::DataFormat { ref record, .. }) if record == "feature 0"
        ));
    }

    #[test]
    fn non_polygon_geometry_is_rejected() {
        let text = r#"{ "type": "FeatureCollection", "features": [
            { "type": "Feature", "properties": { "name": "pt" },
              "geometry": { "type": "Point", "coordinates": [-71.0, 42.3] } }
        ] }"#;
        match parse(text, Crs::Wgs84).unwrap_err() {
            IngestError::DataFormat { message, .. } => assert!(message.contains("Point")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bare_geometry_document_is_rejected() {
        let text = format!(r#"{{ "type": "Polygon", "coordinates": {SQUARE} }}"#);
        assert!(matches!(parse(&text, Crs::Wgs84), Err(IngestError::DataFormat { .. })));
    }
}
