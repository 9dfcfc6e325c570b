//! Typed interpretation of selected tags.
//!
//! Every accessor is best-effort: missing or malformed values produce a
//! sentinel (empty label, `None`, `0.0`) rather than an error, so display
//! code never has to handle failures per field.

use chrono::{Local, NaiveDateTime, TimeZone};
use serde::Serialize;

use crate::store::AttributeStore;

pub const TAG_ORIENTATION: &str = "Orientation";
pub const TAG_DATETIME: &str = "DateTime";
pub const TAG_MAKE: &str = "Make";
pub const TAG_MODEL: &str = "Model";
pub const TAG_FLASH: &str = "Flash";
pub const TAG_IMAGE_WIDTH: &str = "ImageWidth";
pub const TAG_IMAGE_LENGTH: &str = "ImageLength";
pub const TAG_GPS_LATITUDE: &str = "GPSLatitude";
pub const TAG_GPS_LONGITUDE: &str = "GPSLongitude";
pub const TAG_GPS_LATITUDE_REF: &str = "GPSLatitudeRef";
pub const TAG_GPS_LONGITUDE_REF: &str = "GPSLongitudeRef";
pub const TAG_WHITE_BALANCE: &str = "WhiteBalance";

/// EXIF date/time layout: `yyyy:MM:dd HH:mm:ss`, no zone.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Values of the `Orientation` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Undefined,
    Normal,
    /// Left-right mirrored.
    FlipHorizontal,
    Rotate180,
    /// Upside-down mirror.
    FlipVertical,
    /// Flipped about the top-left / bottom-right axis.
    Transpose,
    /// Needs a 90° clockwise rotation to display upright.
    Rotate90,
    /// Flipped about the top-right / bottom-left axis.
    Transverse,
    Rotate270,
}

impl Orientation {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Normal,
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::FlipVertical,
            5 => Self::Transpose,
            6 => Self::Rotate90,
            7 => Self::Transverse,
            8 => Self::Rotate270,
            _ => Self::Undefined,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::Normal => "Normal",
            Self::FlipHorizontal => "Flipped horizontal",
            Self::Rotate180 => "Rotated 180 degrees",
            Self::FlipVertical => "Upside down mirror",
            Self::Transpose => "Transposed",
            Self::Rotate90 => "Rotated 90 degrees",
            Self::Transverse => "Transversed",
            Self::Rotate270 => "Rotated 270 degrees",
        }
    }
}

/// Values of the `WhiteBalance` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteBalance {
    Auto,
    Manual,
}

impl WhiteBalance {
    /// Only codes 0 and 1 are known; anything else has no label.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Auto),
            1 => Some(Self::Manual),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Manual => "Manual",
        }
    }
}

/// Decimal-degree coordinates. South and west are negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLong {
    pub latitude: f64,
    pub longitude: f64,
}

/// Orientation as display text; `""` if the tag is missing or not an integer.
pub fn orientation_label(store: &AttributeStore) -> &'static str {
    match int_tag(store, TAG_ORIENTATION) {
        Some(code) => Orientation::from_code(code).label(),
        None => "",
    }
}

/// White balance as display text; `""` if missing, not an integer, or unknown.
pub fn white_balance_label(store: &AttributeStore) -> &'static str {
    int_tag(store, TAG_WHITE_BALANCE)
        .and_then(WhiteBalance::from_code)
        .map(WhiteBalance::label)
        .unwrap_or("")
}

/// GPS position, or `None` unless all four latitude/longitude tags are present.
///
/// A coordinate whose rationals cannot be parsed comes back as `0.0`.
pub fn lat_long(store: &AttributeStore) -> Option<LatLong> {
    let lat = store.get(TAG_GPS_LATITUDE)?;
    let lat_ref = store.get(TAG_GPS_LATITUDE_REF)?;
    let lon = store.get(TAG_GPS_LONGITUDE)?;
    let lon_ref = store.get(TAG_GPS_LONGITUDE_REF)?;

    Some(LatLong {
        latitude: rational_to_degrees(lat, lat_ref),
        longitude: rational_to_degrees(lon, lon_ref),
    })
}

/// `DateTime` as milliseconds since the Unix epoch, read as local time.
pub fn date_time(store: &AttributeStore) -> Option<i64> {
    date_time_in(store, &Local)
}

/// `DateTime` as milliseconds since the Unix epoch, read in `tz`.
pub fn date_time_in<Tz: TimeZone>(store: &AttributeStore, tz: &Tz) -> Option<i64> {
    let naive = parse_exif_datetime(store.get(TAG_DATETIME)?)?;
    // DST gaps have no instant; overlaps take the earlier one
    let instant = tz.from_local_datetime(&naive).earliest()?;
    Some(instant.timestamp_millis())
}

/// Parse `yyyy:MM:dd HH:mm:ss`. The whole string must match.
pub fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, EXIF_DATETIME_FORMAT).ok()
}

/// Convert `"d/1,m/1,s/100"` plus an `N`/`S`/`E`/`W` reference into decimal degrees.
pub fn rational_to_degrees(value: &str, reference: &str) -> f64 {
    let Some(degrees) = parse_sexagesimal(value) else {
        log::debug!("Unparseable GPS coordinate {value:?}");
        return 0.0;
    };

    if reference == "S" || reference == "W" {
        -degrees
    } else {
        degrees
    }
}

fn parse_sexagesimal(value: &str) -> Option<f64> {
    let mut parts = value.split(',');
    let degrees = parse_rational(parts.next()?)?;
    let minutes = parse_rational(parts.next()?)?;
    let seconds = parse_rational(parts.next()?)?;
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}

fn parse_rational(component: &str) -> Option<f64> {
    let (num, den) = component.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    let value = num / den;
    value.is_finite().then_some(value)
}

fn int_tag(store: &AttributeStore, tag: &str) -> Option<i32> {
    store.get(tag)?.parse().ok()
}
