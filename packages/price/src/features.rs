//! Typed feature vector for price suggestion.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use rental_map_zone_models::{ZoneSelect, ZoneType};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::PriceError;

/// Allowed bedroom counts.
pub const BEDROOMS: RangeInclusive<u32> = 1..=15;
/// Allowed guest counts.
pub const ACCOMMODATES: RangeInclusive<u32> = 1..=20;

/// Kind of space offered.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum RoomType {
    /// Whole home or apartment.
    #[serde(rename = "Entire home/apt")]
    #[strum(to_string = "Entire home/apt", serialize = "entire")]
    EntireHome,
    /// Private room in a shared home.
    #[serde(rename = "Private room")]
    #[strum(to_string = "Private room", serialize = "private")]
    PrivateRoom,
    /// Hotel room.
    #[serde(rename = "Hotel room")]
    #[strum(to_string = "Hotel room", serialize = "hotel")]
    HotelRoom,
    /// Shared room.
    #[serde(rename = "Shared room")]
    #[strum(to_string = "Shared room", serialize = "shared")]
    SharedRoom,
}

/// Property type as listed by the host.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum PropertyType {
    #[serde(rename = "Entire rental unit")]
    #[strum(to_string = "Entire rental unit")]
    EntireRentalUnit,
    #[serde(rename = "Private room in rental unit")]
    #[strum(to_string = "Private room in rental unit")]
    PrivateRoomInRentalUnit,
    #[serde(rename = "Entire condo")]
    #[strum(to_string = "Entire condo")]
    EntireCondo,
    #[serde(rename = "Private room in home")]
    #[strum(to_string = "Private room in home")]
    PrivateRoomInHome,
    #[serde(rename = "Entire serviced apartment")]
    #[strum(to_string = "Entire serviced apartment")]
    EntireServicedApartment,
    #[serde(rename = "Entire home")]
    #[strum(to_string = "Entire home")]
    EntireHome,
    #[serde(rename = "Private room in condo")]
    #[strum(to_string = "Private room in condo")]
    PrivateRoomInCondo,
    #[serde(rename = "Private room in townhouse")]
    #[strum(to_string = "Private room in townhouse")]
    PrivateRoomInTownhouse,
    #[serde(rename = "Entire townhouse")]
    #[strum(to_string = "Entire townhouse")]
    EntireTownhouse,
    #[serde(rename = "Entire guest suite")]
    #[strum(to_string = "Entire guest suite")]
    EntireGuestSuite,
    #[serde(rename = "Private room in bed and breakfast")]
    #[strum(to_string = "Private room in bed and breakfast")]
    PrivateRoomInBedAndBreakfast,
    #[serde(rename = "Room in boutique hotel")]
    #[strum(to_string = "Room in boutique hotel")]
    RoomInBoutiqueHotel,
    #[serde(rename = "Room in hotel")]
    #[strum(to_string = "Room in hotel")]
    RoomInHotel,
    /// Anything not listed above.
    #[serde(rename = "Other")]
    #[strum(to_string = "Other")]
    Other,
}

/// Amenity flags the price models were fitted on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Amenity {
    AirConditioning,
    HighEndElectronics,
    Bbq,
    Balcony,
    NatureAndViews,
    BedLinen,
    Breakfast,
    Tv,
    CoffeeMachine,
    CookingBasics,
    WhiteGoods,
    Elevator,
    Gym,
    ChildFriendly,
    Parking,
    OutdoorSpace,
    HostGreeting,
    HotTubSaunaOrPool,
    Internet,
    LongTermStays,
    PetsAllowed,
    PrivateEntrance,
    Secure,
    SelfCheckIn,
    SmokingAllowed,
}

/// A validated description of a prospective listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFeatures {
    zone_type: ZoneType,
    zone_id: String,
    room_type: RoomType,
    property_type: PropertyType,
    bedrooms: u32,
    accommodates: u32,
    amenities: BTreeSet<Amenity>,
}

impl PriceFeatures {
    /// Validates and builds a feature vector.
    ///
    /// # Errors
    ///
    /// * [`PriceError::ZoneRequired`] for [`ZoneSelect::All`] or an empty
    ///   zone id.
    /// * [`PriceError::OutOfRange`] if `bedrooms` is outside `1..=15` or
    ///   `accommodates` is outside `1..=20`.
    pub fn new(
        zone_type: ZoneType,
        zone: &ZoneSelect,
        room_type: RoomType,
        property_type: PropertyType,
        bedrooms: u32,
        accommodates: u32,
        amenities: impl IntoIterator<Item = Amenity>,
    ) -> Result<Self, PriceError> {
        let zone_id = match zone {
            ZoneSelect::Zone(id) if !id.trim().is_empty() => id.clone(),
            _ => return Err(PriceError::ZoneRequired),
        };
        check_range("bedrooms", bedrooms, &BEDROOMS)?;
        check_range("accommodates", accommodates, &ACCOMMODATES)?;

        Ok(Self {
            zone_type,
            zone_id,
            room_type,
            property_type,
            bedrooms,
            accommodates,
            amenities: amenities.into_iter().collect(),
        })
    }

    /// Zone namespace.
    #[must_use]
    pub const fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    /// Zone the listing is in.
    #[must_use]
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    #[must_use]
    pub const fn room_type(&self) -> RoomType {
        self.room_type
    }

    #[must_use]
    pub const fn property_type(&self) -> PropertyType {
        self.property_type
    }

    #[must_use]
    pub const fn bedrooms(&self) -> u32 {
        self.bedrooms
    }

    /// Number of guests allowed.
    #[must_use]
    pub const fn accommodates(&self) -> u32 {
        self.accommodates
    }

    /// Amenities offered.
    #[must_use]
    pub const fn amenities(&self) -> &BTreeSet<Amenity> {
        &self.amenities
    }
}

fn check_range(
    field: &'static str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), PriceError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(PriceError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
