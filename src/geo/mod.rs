//! Geographic context: EXIF GPS, coarse regions and eBird species lists.

mod exif_gps;
mod region_filter;
mod regions;

pub use exif_gps::{Coordinates, read_gps, read_gps_from};
pub use region_filter::RegionFilter;
pub use regions::{Region, region_for};

#[cfg(test)]
pub(crate) use exif_gps::tests::tiff_with_gps;

use std::path::Path;

/// Location resolved for a photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoContext {
    /// Coordinates read from the file.
    pub coordinates: Coordinates,
    /// Region containing the coordinates, if any.
    pub region: Option<Region>,
}

impl GeoContext {
    /// Resolve the region for known coordinates.
    pub fn from_coordinates(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            region: region_for(coordinates.latitude, coordinates.longitude),
        }
    }
}

/// Read the file's GPS tags and map them to a region.
pub fn resolve(path: &Path) -> Option<GeoContext> {
    read_gps(path).map(GeoContext::from_coordinates)
}
