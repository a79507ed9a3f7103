//! Core type definitions for the persisted schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MenucleanError;

/// Storage type of a persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Whole numbers.
    Integer,
    /// Floating-point numbers.
    Float,
    /// Unbounded text.
    Text,
    /// Timestamp stored as `YYYY-MM-DD HH:MM:SS`.
    DateTime,
    /// 36-character UUID string.
    Uuid,
}

impl ColumnType {
    /// SQL type used in table definitions.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Uuid => "VARCHAR(36)",
        }
    }

    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

/// The four record types of the menu dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Dish,
    Menu,
    MenuPage,
    MenuItem,
}

impl EntityKind {
    /// All entities in load order (parents before children).
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Dish,
        EntityKind::Menu,
        EntityKind::MenuPage,
        EntityKind::MenuItem,
    ];

    /// Table (and file stem) name.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Dish => "Dish",
            EntityKind::Menu => "Menu",
            EntityKind::MenuPage => "MenuPage",
            EntityKind::MenuItem => "MenuItem",
        }
    }

    /// Lower snake case name, as used in check names.
    pub fn snake_name(&self) -> &'static str {
        match self {
            EntityKind::Dish => "dish",
            EntityKind::Menu => "menu",
            EntityKind::MenuPage => "menu_page",
            EntityKind::MenuItem => "menu_item",
        }
    }

    /// Resolve the entity of a data file from the start of its stem.
    ///
    /// `MenuPage_2021` is a MenuPage file. A `cleaned_` prefix is ignored so
    /// cleaned exports map back to their entity.
    pub fn from_file_stem(stem: &str) -> Option<EntityKind> {
        let stem = stem.strip_prefix("cleaned_").unwrap_or(stem);
        // Longer names first so MenuPage does not resolve as Menu.
        [
            EntityKind::MenuPage,
            EntityKind::MenuItem,
            EntityKind::Dish,
            EntityKind::Menu,
        ]
        .into_iter()
        .find(|kind| stem.starts_with(kind.table_name()))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for EntityKind {
    type Err = MenucleanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.table_name() == s)
            .ok_or_else(|| MenucleanError::UnknownTable(s.to_string()))
    }
}
