//! Coarse mapping from coordinates to a named region.

/// A named region with the eBird country used for its species list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Region name as stored in the knowledge base `regions` column.
    pub name: &'static str,
    /// ISO country code of the representative eBird species list.
    pub country: &'static str,
}

struct Bounds {
    region: Region,
    lat: (f64, f64),
    lon: (f64, f64),
}

/// Bounding boxes checked in order; the first containing box wins.
const REGIONS: [Bounds; 6] = [
    Bounds {
        region: Region {
            name: "Australia",
            country: "AU",
        },
        lat: (-50.0, -10.0),
        lon: (110.0, 180.0),
    },
    Bounds {
        region: Region {
            name: "Asia",
            country: "CN",
        },
        lat: (-10.0, 80.0),
        lon: (60.0, 180.0),
    },
    Bounds {
        region: Region {
            name: "Europe",
            country: "DE",
        },
        lat: (35.0, 80.0),
        lon: (-25.0, 60.0),
    },
    Bounds {
        region: Region {
            name: "North_America",
            country: "US",
        },
        lat: (15.0, 80.0),
        lon: (-170.0, -50.0),
    },
    Bounds {
        region: Region {
            name: "South_America",
            country: "BR",
        },
        lat: (-60.0, 15.0),
        lon: (-90.0, -30.0),
    },
    Bounds {
        region: Region {
            name: "Africa",
            country: "ZA",
        },
        lat: (-40.0, 40.0),
        lon: (-20.0, 55.0),
    },
];

/// Region containing the coordinates (bounds inclusive), if any.
pub fn region_for(latitude: f64, longitude: f64) -> Option<Region> {
    REGIONS
        .iter()
        .find(|b| {
            (b.lat.0..=b.lat.1).contains(&latitude) && (b.lon.0..=b.lon.1).contains(&longitude)
        })
        .map(|b| b.region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_cities() {
        assert_eq!(region_for(39.9, 116.4).map(|r| r.name), Some("Asia"));
        assert_eq!(region_for(-33.87, 151.21).map(|r| r.country), Some("AU"));
        assert_eq!(region_for(52.52, 13.40).map(|r| r.name), Some("Europe"));
        assert_eq!(region_for(40.71, -74.0).map(|r| r.name), Some("North_America"));
        assert_eq!(region_for(-23.55, -46.63).map(|r| r.country), Some("BR"));
        assert_eq!(region_for(-33.92, 18.42).map(|r| r.name), Some("Africa"));
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        // Inside both Australia and Asia boxes.
        assert_eq!(region_for(-10.0, 120.0).map(|r| r.name), Some("Australia"));
        // Istanbul lies inside Europe and Africa boxes.
        assert_eq!(region_for(39.0, 29.0).map(|r| r.name), Some("Europe"));
    }

    #[test]
    fn test_open_ocean_has_no_region() {
        assert_eq!(region_for(-60.0, -140.0), None);
        assert_eq!(region_for(85.0, 0.0), None);
    }
}
