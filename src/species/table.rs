//! Species table indexed by classifier class id.

use crate::constants::species::{UNKNOWN_CN_NAME, UNKNOWN_EN_NAME};
use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Display names for one classifier class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesNames {
    /// Chinese common name.
    pub cn_name: String,
    /// English common name.
    pub en_name: String,
    /// Scientific (Latin) name; empty if unknown.
    pub scientific_name: String,
}

/// Names for every classifier output, in class order.
#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    entries: Vec<SpeciesNames>,
}

impl SpeciesTable {
    /// Load a JSON array of `[cn_name, en_name, scientific_name, ...]` rows.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::SpeciesTableRead {
            path: path.to_path_buf(),
            source,
        })?;
        let rows: Vec<Vec<Value>> =
            serde_json::from_str(&content).map_err(|source| Error::SpeciesTableParse {
                path: path.to_path_buf(),
                source,
            })?;

        let table = Self::from_rows(rows);
        info!(
            "Loaded {} species names from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        let field = |row: &[Value], i: usize, fallback: &str| {
            row.get(i)
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };

        Self {
            entries: rows
                .iter()
                .map(|row| SpeciesNames {
                    cn_name: field(row, 0, UNKNOWN_CN_NAME),
                    en_name: field(row, 1, UNKNOWN_EN_NAME),
                    scientific_name: field(row, 2, ""),
                })
                .collect(),
        }
    }

    /// Build a table from explicit entries.
    pub fn from_entries(entries: Vec<SpeciesNames>) -> Self {
        Self { entries }
    }

    /// Names for a class index; `None` if out of range.
    pub fn get(&self, class_index: usize) -> Option<&SpeciesNames> {
        self.entries.get(class_index)
    }

    /// First entry with the given Chinese name.
    pub fn find_by_cn_name(&self, cn_name: &str) -> Option<&SpeciesNames> {
        self.entries.iter().find(|e| e.cn_name == cn_name)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_rows_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[["白头鹎", "Light-vented Bulbul", "Pycnonotus sinensis", 42], ["麻雀"], []]"#
        )
        .unwrap();
        file.flush().unwrap();

        let table = SpeciesTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0).unwrap().scientific_name, "Pycnonotus sinensis");

        let partial = table.get(1).unwrap();
        assert_eq!(partial.cn_name, "麻雀");
        assert_eq!(partial.en_name, "Unknown");
        assert_eq!(partial.scientific_name, "");

        assert_eq!(table.get(2).unwrap().cn_name, "未知");
        assert!(table.get(3).is_none());
    }

    #[test]
    fn test_find_by_cn_name() {
        let table = SpeciesTable::from_rows(vec![vec![
            Value::from("白头鹎"),
            Value::from("Light-vented Bulbul"),
            Value::from("Pycnonotus sinensis"),
        ]]);
        assert!(table.find_by_cn_name("白头鹎").is_some());
        assert!(table.find_by_cn_name("不存在").is_none());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = SpeciesTable::load(Path::new("/nonexistent/birdinfo.json")).unwrap_err();
        assert!(matches!(err, Error::SpeciesTableRead { .. }));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"not": "an array"}}"#).unwrap();
        file.flush().unwrap();

        let err = SpeciesTable::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::SpeciesTableParse { .. }));
    }
}
