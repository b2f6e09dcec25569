//! GPS coordinates from EXIF metadata.

use exif::{Exif, In, Tag, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;
use tracing::debug;

/// Signed decimal-degree coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude, negative south of the equator.
    pub latitude: f64,
    /// Longitude, negative west of Greenwich.
    pub longitude: f64,
}

impl Coordinates {
    /// Display text, e.g. `GPS: 39.907500, 116.397222`.
    pub fn info(&self) -> String {
        format!("GPS: {:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Read GPS coordinates from an image file.
///
/// Returns `None` when the file has no EXIF block or the GPS fields are
/// missing or malformed.
pub fn read_gps(path: &Path) -> Option<Coordinates> {
    let file = File::open(path).ok()?;
    read_gps_from(&mut BufReader::new(file))
}

/// Read GPS coordinates from any seekable image container.
pub fn read_gps_from<R: BufRead + Seek>(reader: &mut R) -> Option<Coordinates> {
    match exif::Reader::new().read_from_container(reader) {
        Ok(exif) => coordinates(&exif),
        Err(e) => {
            debug!("No EXIF data: {e}");
            None
        }
    }
}

fn coordinates(exif: &Exif) -> Option<Coordinates> {
    let latitude = signed_degrees(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
    let longitude = signed_degrees(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;
    Some(Coordinates {
        latitude,
        longitude,
    })
}

fn signed_degrees(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative: u8) -> Option<f64> {
    let Value::Rational(parts) = &exif.get_field(value_tag, In::PRIMARY)?.value else {
        return None;
    };
    let Value::Ascii(reference) = &exif.get_field(ref_tag, In::PRIMARY)?.value else {
        return None;
    };

    let [degrees, minutes, seconds] = parts.as_slice() else {
        return None;
    };
    let value = degrees.to_f64() + minutes.to_f64() / 60.0 + seconds.to_f64() / 3600.0;
    if !value.is_finite() {
        return None;
    }

    let is_negative = reference
        .first()
        .and_then(|r| r.first())
        .is_some_and(|c| c.eq_ignore_ascii_case(&negative));
    Some(if is_negative { -value } else { value })
}
