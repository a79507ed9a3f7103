//! Exclusion sets produced by validation and consumed by cleaning.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MenucleanConfig;
use crate::error::{MenucleanError, Result};
use crate::schema::EntityKind;
use crate::validate;

/// Suffix of the per-suite failure files written by validation.
pub const FAILED_ID_SUFFIX: &str = "_FailedID.json";

/// Identifiers known to be bad, named after the check suite that found them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExclusionSet {
    pub name: String,
    pub ids: BTreeSet<i64>,
}

impl ExclusionSet {
    pub fn new(name: impl Into<String>, ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            name: name.into(),
            ids: ids.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Read one suite file.
    ///
    /// The file holds either a bare array of ids or an object mapping check
    /// name to ids. For the object form, only checks that report on
    /// `entity` contribute; check names the catalog does not know always do.
    pub fn from_file(path: &Path, suite: &str, entity: Option<EntityKind>) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| MenucleanError::io(path, e))?;
        let parsed: FailedIdFile =
            serde_json::from_str(&content).map_err(|e| MenucleanError::ExclusionSet {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let ids = match parsed {
            FailedIdFile::Ids(ids) => ids.into_iter().collect(),
            FailedIdFile::ByCheck(checks) => checks
                .into_iter()
                .filter(|(check, _)| {
                    match (entity, validate::check_entity(suite, check)) {
                        (Some(wanted), Some(reported)) => wanted == reported,
                        _ => true,
                    }
                })
                .flat_map(|(_, ids)| ids)
                .collect(),
        };

        Ok(Self {
            name: suite.to_string(),
            ids,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FailedIdFile {
    Ids(Vec<i64>),
    ByCheck(IndexMap<String, Vec<i64>>),
}

/// Resolves which suite files apply to each entity and reads them.
#[derive(Debug, Clone)]
pub struct ExclusionLoader {
    suites: IndexMap<EntityKind, Vec<String>>,
}

impl Default for ExclusionLoader {
    fn default() -> Self {
        Self::from_config(&MenucleanConfig::default())
    }
}

impl ExclusionLoader {
    pub fn new(suites: IndexMap<EntityKind, Vec<String>>) -> Self {
        Self { suites }
    }

    pub fn from_config(config: &MenucleanConfig) -> Self {
        Self::new(config.exclusion_suites.clone())
    }

    /// Suite names consulted when cleaning `entity`.
    pub fn suites_for(&self, entity: EntityKind) -> &[String] {
        self.suites.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Path of a suite's failure file inside `dir`.
    pub fn suite_path(dir: &Path, suite: &str) -> PathBuf {
        dir.join(format!("{}{}", suite, FAILED_ID_SUFFIX))
    }

    /// Read every configured suite for `entity` from `dir`.
    ///
    /// A missing or unreadable file is an error.
    pub fn load_for(&self, entity: EntityKind, dir: &Path) -> Result<Vec<ExclusionSet>> {
        let mut sets = Vec::new();
        for suite in self.suites_for(entity) {
            let path = Self::suite_path(dir, suite);
            debug!(path = %path.display(), "Reading exclusion set");
            let set = ExclusionSet::from_file(&path, suite, Some(entity))?;
            info!(table = %entity, suite = %suite, ids = set.len(), "Loaded exclusion set");
            sets.push(set);
        }
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_array_form() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.json", "[5, 7, 5]");
        let set = ExclusionSet::from_file(&path, "TestDishYearValid", Some(EntityKind::Dish)).unwrap();
        assert_eq!(set.ids, BTreeSet::from([5, 7]));
    }

    #[test]
    fn test_object_form_filters_by_entity() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "TestTablesSchema_FailedID.json",
            r#"{"test_dish": [], "test_menu": [1], "test_menu_page_menu_id_fk": [2], "test_menu_item_dish_id_fk": [3], "test_custom": [4]}"#,
        );
        let set = ExclusionSet::from_file(&path, "TestTablesSchema", Some(EntityKind::Menu)).unwrap();
        assert_eq!(set.ids, BTreeSet::from([1, 4]));

        let all = ExclusionSet::from_file(&path, "TestTablesSchema", None).unwrap();
        assert_eq!(all.ids, BTreeSet::from([1, 2, 3, 4]));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "bad.json", r#"{"test_uuid": "oops"}"#);
        let err = ExclusionSet::from_file(&path, "TestMenuPageDuplicate", None).unwrap_err();
        assert!(matches!(err, MenucleanError::ExclusionSet { .. }));
    }

    #[test]
    fn test_load_for_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let loader = ExclusionLoader::default();
        write(dir.path(), "TestDishYearValid_FailedID.json", r#"{"test_first_appeared": [9]}"#);

        let err = loader.load_for(EntityKind::Dish, dir.path()).unwrap_err();
        assert!(matches!(err, MenucleanError::Io { .. }));
    }

    #[test]
    fn test_load_for_reads_configured_suites() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "TestDishYearValid_FailedID.json", r#"{"test_first_appeared": [9], "test_last_appeared": [9, 11]}"#);
        write(dir.path(), "TestDisPriceValid_FailedID.json", r#"{"test_lowest_price": [], "test_highest_price": [12]}"#);

        let sets = ExclusionLoader::default().load_for(EntityKind::Dish, dir.path()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].ids, BTreeSet::from([9, 11]));
        assert_eq!(sets[1].ids, BTreeSet::from([12]));
    }

    #[test]
    fn test_unconfigured_entity_loads_nothing() {
        let loader = ExclusionLoader::new(IndexMap::new());
        let dir = TempDir::new().unwrap();
        assert!(loader.load_for(EntityKind::Menu, dir.path()).unwrap().is_empty());
    }
}
