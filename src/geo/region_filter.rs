//! Offline eBird country species lists.

use crate::constants::files::REGION_INDEX;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct OfflineIndex {
    #[serde(default)]
    countries: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SpeciesListFile {
    #[serde(default)]
    species: Vec<String>,
}

/// Species codes known to occur in each country.
#[derive(Debug, Clone, Default)]
pub struct RegionFilter {
    countries: HashMap<String, HashSet<String>>,
}

impl RegionFilter {
    /// Load every country listed in `offline_index.json` under `dir`.
    ///
    /// A country whose species list is missing or unreadable is skipped with
    /// a warning; a missing or malformed index is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let index_path = dir.join(REGION_INDEX);
        let index: OfflineIndex = read_json(&index_path)?;

        let mut countries = HashMap::new();
        for code in index.countries.keys() {
            let list_path = dir.join(format!("species_list_{code}.json"));
            match read_json::<SpeciesListFile>(&list_path) {
                Ok(list) => {
                    debug!("Loaded {} species for {code}", list.species.len());
                    countries.insert(code.to_uppercase(), list.species.into_iter().collect());
                }
                Err(e) => warn!("Skipping region {code}: {e}"),
            }
        }

        info!(
            "Loaded offline species lists for {} countries from {}",
            countries.len(),
            dir.display()
        );
        Ok(Self { countries })
    }

    /// Build a filter from in-memory lists.
    pub fn from_lists<I, S>(lists: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        Self {
            countries: lists
                .into_iter()
                .map(|(code, species)| (code.into().to_uppercase(), species.into_iter().collect()))
                .collect(),
        }
    }

    /// Membership of an eBird species code in a country's list.
    ///
    /// Returns `None` when no list is loaded for the country.
    pub fn contains(&self, country: &str, species_code: &str) -> Option<bool> {
        self.countries
            .get(&country.to_uppercase())
            .map(|species| species.contains(species_code))
    }

    /// Number of loaded countries.
    pub fn country_count(&self) -> usize {
        self.countries.len()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::RegionDataRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| Error::RegionDataParse {
        path: path.to_path_buf(),
        source,
    })
}
