//! Test fixtures: zones laid out in equal-area meters so their areas are
//! known exactly.
//!
//! Zone A spans `[0, 1000] x [0, 2000]` meters (2 km²) and zone B spans
//! `[1000, 2000] x [0, 1000]` meters (1 km²), relative to an origin in
//! Boston.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use rental_map_listing_models::Listing;
use rental_map_spatial::ZoneIndex;
use rental_map_spatial::projection::EqualAreaProjection;
use rental_map_zone_models::{OverlapPolicy, Zone, ZoneType};

pub const INSIDE_A: [(f64, f64); 2] = [(250.0, 500.0), (750.0, 1500.0)];
pub const INSIDE_B: (f64, f64) = (1500.0, 500.0);
pub const OUTSIDE: (f64, f64) = (5000.0, 5000.0);

fn origin() -> Coord<f64> {
    EqualAreaProjection::default().forward(Coord { x: -71.06, y: 42.35 })
}

fn to_lon_lat((x, y): (f64, f64)) -> Coord<f64> {
    let o = origin();
    EqualAreaProjection::default()
        .inverse(Coord { x: o.x + x, y: o.y + y })
        .unwrap()
}

pub fn rect_zone(id: &str, x0: f64, y0: f64, w: f64, h: f64) -> Zone {
    let ring: Vec<Coord<f64>> = [(x0, y0), (x0 + w, y0), (x0 + w, y0 + h), (x0, y0 + h), (x0, y0)]
        .into_iter()
        .map(to_lon_lat)
        .collect();
    Zone::new(id, MultiPolygon(vec![Polygon::new(LineString::from(ring), vec![])]))
}

pub fn scenario_zones() -> Vec<Zone> {
    vec![
        rect_zone("A", 0.0, 0.0, 1000.0, 2000.0),
        rect_zone("B", 1000.0, 0.0, 1000.0, 1000.0),
    ]
}

pub fn scenario_index() -> ZoneIndex {
    ZoneIndex::build(ZoneType::Neighborhood, scenario_zones(), OverlapPolicy::Reject).unwrap()
}

pub fn listing_at(id: u64, point: (f64, f64), date: &str) -> Listing {
    let coord = to_lon_lat(point);
    Listing {
        id,
        latitude: coord.y,
        longitude: coord.x,
        price: 100.0,
        room_type: "Entire home/apt".to_string(),
        property_type: "Entire rental unit".to_string(),
        minimum_nights: 2,
        available: true,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        amenities: BTreeSet::new(),
    }
}

/// P1 and P2 in zone A, P3 in zone B.
pub fn scenario_listings() -> Vec<Listing> {
    vec![
        listing_at(1, INSIDE_A[0], "2023-04-15"),
        listing_at(2, INSIDE_A[1], "2023-04-15"),
        listing_at(3, INSIDE_B, "2023-04-15"),
    ]
}
