//! Species knowledge base loaded from a CSV export.
//!
//! Columns: `model_class_id, english_name, chinese_simplified,
//! chinese_traditional, scientific_name, ebird_code, short_description_zh,
//! full_description_zh, regions`. The `regions` column holds region names
//! separated by `;`.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// One knowledge base row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpeciesRecord {
    /// Classifier class id, when the species is covered by the model.
    #[serde(default, deserialize_with = "optional_class_id")]
    pub model_class_id: Option<usize>,
    /// English common name.
    #[serde(default)]
    pub english_name: String,
    /// Simplified Chinese name.
    #[serde(default)]
    pub chinese_simplified: String,
    /// Traditional Chinese name.
    #[serde(default)]
    pub chinese_traditional: String,
    /// Scientific name.
    #[serde(default)]
    pub scientific_name: String,
    /// eBird species code.
    #[serde(default)]
    pub ebird_code: String,
    /// Short description (Chinese).
    #[serde(default)]
    pub short_description_zh: String,
    /// Full description (Chinese).
    #[serde(default)]
    pub full_description_zh: String,
    /// Regions where the species occurs.
    #[serde(default, deserialize_with = "region_list")]
    pub regions: Vec<String>,
}

impl SpeciesRecord {
    /// Short description, if non-empty.
    pub fn short_description(&self) -> Option<&str> {
        non_empty(&self.short_description_zh)
    }

    /// eBird code, if non-empty.
    pub fn ebird_code(&self) -> Option<&str> {
        non_empty(&self.ebird_code)
    }

    /// Whether the `regions` column lists `region` (case-insensitive).
    pub fn occurs_in(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r.eq_ignore_ascii_case(region))
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn optional_class_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<usize>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

fn region_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .split(';')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect())
}

/// Indexed species records.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    records: Vec<SpeciesRecord>,
    by_class_id: HashMap<usize, usize>,
    by_cn_name: HashMap<String, usize>,
    by_scientific_name: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// Load the CSV export at `path`.
    ///
    /// Rows that fail to parse are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(|source| Error::KnowledgeBaseRead {
                path: path.to_path_buf(),
                source,
            })?;

        let mut records = Vec::new();
        for (line_num, row) in reader.deserialize::<SpeciesRecord>().enumerate() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => warn!("{}: skipping line {}: {e}", path.display(), line_num + 2),
            }
        }

        let kb = Self::from_records(records);
        info!(
            "Loaded knowledge base with {} species from {}",
            kb.len(),
            path.display()
        );
        Ok(kb)
    }

    /// Build an index over in-memory records. The first record wins on
    /// duplicate keys.
    pub fn from_records(records: Vec<SpeciesRecord>) -> Self {
        let mut by_class_id = HashMap::new();
        let mut by_cn_name = HashMap::new();
        let mut by_scientific_name = HashMap::new();

        for (i, record) in records.iter().enumerate() {
            if let Some(id) = record.model_class_id {
                by_class_id.entry(id).or_insert(i);
            }
            for name in [&record.chinese_simplified, &record.chinese_traditional] {
                if !name.is_empty() {
                    by_cn_name.entry(name.clone()).or_insert(i);
                }
            }
            if !record.scientific_name.is_empty() {
                by_scientific_name
                    .entry(record.scientific_name.to_lowercase())
                    .or_insert(i);
            }
        }

        Self {
            records,
            by_class_id,
            by_cn_name,
            by_scientific_name,
        }
    }

    /// Record for a classifier class id.
    pub fn by_class_id(&self, class_id: usize) -> Option<&SpeciesRecord> {
        self.by_class_id.get(&class_id).map(|&i| &self.records[i])
    }

    /// Record for a simplified or traditional Chinese name.
    pub fn by_cn_name(&self, name: &str) -> Option<&SpeciesRecord> {
        self.by_cn_name.get(name.trim()).map(|&i| &self.records[i])
    }

    /// Record for a scientific name (case-insensitive).
    pub fn by_scientific_name(&self, name: &str) -> Option<&SpeciesRecord> {
        self.by_scientific_name
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.records[i])
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
