//! Photo date and GPS extraction from embedded EXIF metadata, plus the
//! year-in-path fallback.

use chrono::{NaiveDate, NaiveDateTime};
use exif::{Field, In, Tag, Value};
use regex::Regex;
use std::io::Cursor;
use std::sync::LazyLock;

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(19|20)\d{2}").expect("valid year regex"));

/// Date the photo was taken, from `DateTimeOriginal` (falling back to
/// `DateTime`) in the embedded EXIF data.
#[must_use]
pub fn photo_date(bytes: &[u8]) -> Option<NaiveDateTime> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))?;
    let Value::Ascii(ref ascii) = field.value else {
        return None;
    };
    let parsed = exif::DateTime::from_ascii(ascii.first()?).ok()?;
    NaiveDate::from_ymd_opt(
        i32::from(parsed.year),
        u32::from(parsed.month),
        u32::from(parsed.day),
    )?
    .and_hms_opt(
        u32::from(parsed.hour),
        u32::from(parsed.minute),
        u32::from(parsed.second),
    )
}

/// GPS position as decimal degrees `"lat, lon"`, when the photo carries one.
#[must_use]
pub fn gps_location(bytes: &[u8]) -> Option<String> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    let lat = dms_to_decimal(exif.get_field(Tag::GPSLatitude, In::PRIMARY)?)?
        * hemisphere_sign(exif.get_field(Tag::GPSLatitudeRef, In::PRIMARY), b'S');
    let lon = dms_to_decimal(exif.get_field(Tag::GPSLongitude, In::PRIMARY)?)?
        * hemisphere_sign(exif.get_field(Tag::GPSLongitudeRef, In::PRIMARY), b'W');
    Some(format!("{lat:.6}, {lon:.6}"))
}

/// First plausible 4-digit year (1900–2099) in a collection path, mapped to
/// January 1st of that year.
#[must_use]
pub fn year_from_path(path: &str) -> Option<NaiveDateTime> {
    let year: i32 = YEAR_PATTERN.find(path)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)
}

/// Degrees/minutes/seconds rationals to decimal degrees.
fn dms_to_decimal(field: &Field) -> Option<f64> {
    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    if parts.len() < 3 {
        return None;
    }
    Some(parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0)
}

fn hemisphere_sign(field: Option<&Field>, negative: u8) -> f64 {
    let is_negative = field.is_some_and(|f| {
        matches!(f.value, Value::Ascii(ref ascii)
            if ascii.first().and_then(|s| s.first()) == Some(&negative))
    });
    if is_negative { -1.0 } else { 1.0 }
}
