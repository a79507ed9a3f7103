//! Run configuration.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MenucleanError, Result};
use crate::input::ParserConfig;
use crate::schema::EntityKind;

/// Configuration shared by the clean, validate and load paths.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenucleanConfig {
    /// Validation suites whose failures are excluded when cleaning each entity.
    pub exclusion_suites: IndexMap<EntityKind, Vec<String>>,
    /// Row counts the schema suite expects in the store.
    pub expected_rows: IndexMap<EntityKind, u64>,
    /// Columns holding `... UTC` timestamps, normalised before loading.
    pub timestamp_columns: Vec<String>,
    /// Input parsing options.
    pub parser: ParserConfig,
}

impl Default for MenucleanConfig {
    fn default() -> Self {
        let suites = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut exclusion_suites = IndexMap::new();
        exclusion_suites.insert(
            EntityKind::Dish,
            suites(&["TestDishYearValid", "TestDisPriceValid"]),
        );
        exclusion_suites.insert(EntityKind::Menu, suites(&["TestTablesSchema"]));
        exclusion_suites.insert(
            EntityKind::MenuPage,
            suites(&["TestMenuPageDuplicate", "TestMenuPageNumberValid"]),
        );
        exclusion_suites.insert(
            EntityKind::MenuItem,
            suites(&["TestMenuItemNumberValid", "TestMenuItemDateValid"]),
        );

        let mut expected_rows = IndexMap::new();
        expected_rows.insert(EntityKind::Dish, 423_397);
        expected_rows.insert(EntityKind::Menu, 17_545);
        expected_rows.insert(EntityKind::MenuPage, 66_937);
        expected_rows.insert(EntityKind::MenuItem, 1_332_726);

        Self {
            exclusion_suites,
            expected_rows,
            timestamp_columns: vec!["created_at".to_string(), "updated_at".to_string()],
            parser: ParserConfig::default(),
        }
    }
}

impl MenucleanConfig {
    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| MenucleanError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| MenucleanError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| MenucleanError::io(path, e))
    }

    /// Replace the exclusion suites of one entity.
    pub fn with_exclusion_suites(mut self, entity: EntityKind, suites: Vec<String>) -> Self {
        self.exclusion_suites.insert(entity, suites);
        self
    }

    /// Set the expected row count of one entity.
    pub fn with_expected_rows(mut self, entity: EntityKind, rows: u64) -> Self {
        self.expected_rows.insert(entity, rows);
        self
    }

    pub fn with_timestamp_columns(mut self, columns: Vec<String>) -> Self {
        self.timestamp_columns = columns;
        self
    }

    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Expected row count for an entity, if one is configured.
    pub fn expected_rows_for(&self, entity: EntityKind) -> Option<u64> {
        self.expected_rows.get(&entity).copied()
    }
}
