//! Statistics over a scoped listing subset.

use std::collections::{BTreeMap, BTreeSet};

use rental_map_listing_models::Listing;
use serde::{Deserialize, Serialize};

/// Presentation thresholds for [`summarize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SummaryOptions {
    /// Records with at least this many minimum nights are left out of the
    /// short-term share.
    pub outlier_min_nights: u32,
    /// Most frequent amenities dropped from each ranking (near-universal
    /// tags such as wifi say nothing about price).
    pub amenity_skip: usize,
    /// Maximum amenities kept per ranking after the skip.
    pub amenity_take: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            outlier_min_nights: 200,
            amenity_skip: 5,
            amenity_take: 85,
        }
    }
}

/// A label with its number of occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    /// Category label.
    pub label: String,
    /// Occurrences.
    pub count: u64,
}

/// Summary statistics of one (zone-type, zone-or-all, month) scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSummary {
    /// Listing records in scope.
    pub total_records: u64,
    /// Distinct listing ids in scope.
    pub distinct_listings: u64,
    /// Highest nightly price.
    pub highest_price: Option<f64>,
    /// Mean nightly price.
    pub average_price: Option<f64>,
    /// Lowest strictly positive nightly price.
    pub lowest_price: Option<f64>,
    /// Records per room type, most common first.
    pub room_types: Vec<LabelCount>,
    /// Share of records open for booking.
    pub vacancy_rate: Option<f64>,
    /// Share of non-outlier records with a minimum stay under 28 nights.
    pub short_term_share: Option<f64>,
    /// Amenity ranking of listings priced below the mean, counting each
    /// listing once by its latest snapshot.
    pub low_price_amenities: Vec<LabelCount>,
    /// Amenity ranking of listings priced at or above the mean, counting
    /// each listing once by its latest snapshot.
    pub high_price_amenities: Vec<LabelCount>,
}

/// Summarizes a scoped listing subset.
///
/// Every statistic is `None` (or empty) when `listings` is empty.
#[must_use]
pub fn summarize(listings: &[&Listing], options: &SummaryOptions) -> ScopeSummary {
    let total_records = listings.len() as u64;
    let distinct_listings = listings.iter().map(|l| l.id).collect::<BTreeSet<_>>().len() as u64;

    let highest_price = listings.iter().map(|l| l.price).reduce(f64::max);
    let lowest_price = listings
        .iter()
        .map(|l| l.price)
        .filter(|p| *p > 0.0)
        .reduce(f64::min);
    let average_price = mean(listings.iter().map(|l| l.price));

    let room_types = ranked(count_labels(listings.iter().map(|l| l.room_type.as_str())));

    let vacancy_rate = ratio(
        listings.iter().filter(|l| l.available).count(),
        listings.len(),
    );

    let stays: Vec<&&Listing> = listings
        .iter()
        .filter(|l| l.minimum_nights < options.outlier_min_nights)
        .collect();
    let short_term_share = ratio(
        stays.iter().filter(|l| l.is_short_term()).count(),
        stays.len(),
    );

    let latest = latest_snapshots(listings);
    let (low_price_amenities, high_price_amenities) = mean(latest.iter().map(|l| l.price))
        .map_or_else(
            || (Vec::new(), Vec::new()),
            |threshold| {
                let (low, high): (Vec<&Listing>, Vec<&Listing>) =
                    latest.iter().copied().partition(|l| l.price < threshold);
                (
                    amenity_ranking(&low, options),
                    amenity_ranking(&high, options),
                )
            },
        );

    ScopeSummary {
        total_records,
        distinct_listings,
        highest_price,
        average_price,
        lowest_price,
        room_types,
        vacancy_rate,
        short_term_share,
        low_price_amenities,
        high_price_amenities,
    }
}

/// One record per listing id: the one with the latest snapshot date, the
/// later record on equal dates. Ordered by id.
fn latest_snapshots<'a>(listings: &[&'a Listing]) -> Vec<&'a Listing> {
    let mut latest: BTreeMap<u64, &'a Listing> = BTreeMap::new();
    for &listing in listings {
        latest
            .entry(listing.id)
            .and_modify(|kept| {
                if listing.date >= kept.date {
                    *kept = listing;
                }
            })
            .or_insert(listing);
    }
    latest.into_values().collect()
}

fn amenity_ranking(listings: &[&Listing], options: &SummaryOptions) -> Vec<LabelCount> {
    let counts = count_labels(
        listings
            .iter()
            .flat_map(|l| l.amenities.iter().map(String::as_str)),
    );
    ranked(counts)
        .into_iter()
        .skip(options.amenity_skip)
        .take(options.amenity_take)
        .collect()
}

fn count_labels<'a>(labels: impl Iterator<Item = &'a str>) -> BTreeMap<&'a str, u64> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Descending by count, ties by label.
fn ranked(counts: BTreeMap<&str, u64>) -> Vec<LabelCount> {
    let mut ranked: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    ranked
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{INSIDE_A, listing_at};

    fn listing(id: u64, price: f64, amenities: &[&str]) -> Listing {
        let mut listing = listing_at(id, INSIDE_A[0], "2023-04-15");
        listing.price = price;
        listing.amenities = amenities.iter().map(ToString::to_string).collect();
        listing
    }

    fn no_skip() -> SummaryOptions {
        SummaryOptions {
            amenity_skip: 0,
            ..SummaryOptions::default()
        }
    }

    #[test]
    fn empty_scope_has_no_statistics() {
        let summary = summarize(&[], &SummaryOptions::default());
        assert_eq!(summary.total_records, 0);
        assert_eq!(summary.distinct_listings, 0);
        assert_eq!(summary.highest_price, None);
        assert_eq!(summary.average_price, None);
        assert_eq!(summary.lowest_price, None);
        assert_eq!(summary.vacancy_rate, None);
        assert_eq!(summary.short_term_share, None);
        assert!(summary.room_types.is_empty());
        assert!(summary.low_price_amenities.is_empty());
    }

    #[test]
    fn price_statistics_ignore_zero_for_lowest() {
        let listings = [listing(1, 0.0, &[]), listing(2, 50.0, &[]), listing(3, 250.0, &[])];
        let refs: Vec<&Listing> = listings.iter().collect();
        let summary = summarize(&refs, &SummaryOptions::default());
        assert_eq!(summary.highest_price, Some(250.0));
        assert_eq!(summary.lowest_price, Some(50.0));
        let average = summary.average_price.unwrap();
        assert!((average - 100.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_snapshots_count_as_records_not_listings() {
        let mut later = listing(1, 100.0, &[]);
        later.date = chrono::NaiveDate::from_ymd_opt(2023, 4, 16).unwrap();
        later.available = false;
        let listings = [listing(1, 100.0, &[]), later, listing(2, 100.0, &[])];
        let refs: Vec<&Listing> = listings.iter().collect();
        let summary = summarize(&refs, &SummaryOptions::default());
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.distinct_listings, 2);
        let vacancy = summary.vacancy_rate.unwrap();
        assert!((vacancy - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn room_types_rank_by_count_then_name() {
        let mut listings = vec![listing(1, 1.0, &[]), listing(2, 1.0, &[]), listing(3, 1.0, &[])];
        listings[1].room_type = "Private room".to_string();
        listings[2].room_type = "Hotel room".to_string();
        listings.push(listing(4, 1.0, &[]));
        let refs: Vec<&Listing> = listings.iter().collect();
        let labels: Vec<(String, u64)> = summarize(&refs, &SummaryOptions::default())
            .room_types
            .into_iter()
            .map(|rc| (rc.label, rc.count))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Entire home/apt".to_string(), 2),
                ("Hotel room".to_string(), 1),
                ("Private room".to_string(), 1),
            ]
        );
    }

    #[test]
    fn short_term_share_excludes_outlier_stays() {
        let mut listings = vec![listing(1, 1.0, &[]), listing(2, 1.0, &[]), listing(3, 1.0, &[])];
        listings[1].minimum_nights = 30;
        listings[2].minimum_nights = 365;
        let refs: Vec<&Listing> = listings.iter().collect();
        let share = summarize(&refs, &SummaryOptions::default()).short_term_share.unwrap();
        assert!((share - 0.5).abs() < 1e-9);

        let keep_all = SummaryOptions {
            outlier_min_nights: u32::MAX,
            ..SummaryOptions::default()
        };
        let share = summarize(&refs, &keep_all).short_term_share.unwrap();
        assert!((share - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn amenities_split_at_mean_price() {
        let listings = [
            listing(1, 50.0, &["Wifi", "Kitchen"]),
            listing(2, 50.0, &["Wifi"]),
            listing(3, 200.0, &["Pool", "Wifi"]),
        ];
        let refs: Vec<&Listing> = listings.iter().collect();
        let summary = summarize(&refs, &no_skip());

        let low: Vec<(&str, u64)> = summary
            .low_price_amenities
            .iter()
            .map(|a| (a.label.as_str(), a.count))
            .collect();
        assert_eq!(low, vec![("Wifi", 2), ("Kitchen", 1)]);

        let high: Vec<&str> = summary
            .high_price_amenities
            .iter()
            .map(|a| a.label.as_str())
            .collect();
        assert_eq!(high, vec!["Pool", "Wifi"]);
    }

    #[test]
    fn amenities_count_each_listing_once() {
        let mut listings: Vec<Listing> = (1..=30)
            .map(|day| {
                let mut row = listing(1, 100.0, &["Pool"]);
                row.date = format!("2023-04-{day:02}").parse().unwrap();
                row
            })
            .collect();
        listings.push(listing(2, 100.0, &["Gym"]));
        let refs: Vec<&Listing> = listings.iter().collect();
        let summary = summarize(&refs, &no_skip());

        assert_eq!(summary.total_records, 31);
        assert_eq!(summary.distinct_listings, 2);
        let high: Vec<(&str, u64)> = summary
            .high_price_amenities
            .iter()
            .map(|a| (a.label.as_str(), a.count))
            .collect();
        assert_eq!(high, vec![("Gym", 1), ("Pool", 1)]);
        assert!(summary.low_price_amenities.is_empty());
    }

    #[test]
    fn latest_snapshot_decides_amenities_and_price_side() {
        let mut early = listing(1, 300.0, &["Pool"]);
        early.date = "2023-04-01".parse().unwrap();
        let mut late = listing(1, 40.0, &["Kitchen"]);
        late.date = "2023-04-20".parse().unwrap();
        let other = listing(2, 100.0, &["Gym"]);
        let refs = vec![&late, &early, &other];
        let summary = summarize(&refs, &no_skip());

        let low: Vec<&str> = summary.low_price_amenities.iter().map(|a| a.label.as_str()).collect();
        let high: Vec<&str> = summary.high_price_amenities.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(low, vec!["Kitchen"]);
        assert_eq!(high, vec!["Gym"]);
    }

    #[test]
    fn amenity_ranking_skips_and_truncates() {
        let tags: Vec<String> = (0..10).map(|i| format!("tag{i}")).collect();
        let listings: Vec<Listing> = (0..10u64)
            .map(|n| {
                let owned: Vec<&str> = tags[..=usize::try_from(n).unwrap()]
                    .iter()
                    .map(String::as_str)
                    .collect();
                listing(n, 100.0, &owned)
            })
            .collect();
        let refs: Vec<&Listing> = listings.iter().collect();
        let options = SummaryOptions {
            amenity_skip: 2,
            amenity_take: 3,
            ..SummaryOptions::default()
        };
        let summary = summarize(&refs, &options);
        let high: Vec<&str> = summary
            .high_price_amenities
            .iter()
            .map(|a| a.label.as_str())
            .collect();
        assert_eq!(high, vec!["tag2", "tag3", "tag4"]);
    }

    #[test]
    fn options_fill_missing_fields_with_defaults() {
        let options: SummaryOptions = serde_json::from_str(r#"{"amenity_take": 10}"#).unwrap();
        assert_eq!(options.amenity_take, 10);
        assert_eq!(options.amenity_skip, 5);
        assert_eq!(options.outlier_min_nights, 200);
    }
}
