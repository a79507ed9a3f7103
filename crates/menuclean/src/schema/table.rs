//! Table-level schema definition for each entity.

use once_cell::sync::Lazy;
use serde::Serialize;

use super::types::{ColumnType, EntityKind};

/// One persisted column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// Storage type.
    pub column_type: ColumnType,
    /// Inclusive range enforced by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<(i64, i64)>,
}

impl ColumnDef {
    const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            check: None,
        }
    }

    const fn with_check(mut self, min: i64, max: i64) -> Self {
        self.check = Some((min, max));
        self
    }
}

/// A reference from a child column to a parent table's `id`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ForeignKey {
    /// Referencing column in the child table.
    pub column: &'static str,
    /// Referenced table.
    pub parent: EntityKind,
}

/// Schema for an entire table.
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub entity: EntityKind,
    /// Columns in declaration order; `id` is first and the primary key.
    pub columns: Vec<ColumnDef>,
    /// References to parent tables. The store does not enforce them; the
    /// validation catalog checks each one for dangling ids.
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get all column names.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns carrying a range check.
    pub fn checked_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.check.is_some())
    }
}

static SCHEMAS: Lazy<Vec<TableSchema>> = Lazy::new(|| {
    use ColumnType::{DateTime, Float, Integer, Text, Uuid};

    vec![
        TableSchema {
            entity: EntityKind::Dish,
            columns: vec![
                ColumnDef::new("id", Integer),
                ColumnDef::new("name", Text),
                ColumnDef::new("description", Text),
                ColumnDef::new("menus_appeared", Integer),
                ColumnDef::new("times_appeared", Integer),
                ColumnDef::new("first_appeared", Integer).with_check(0, 9999),
                ColumnDef::new("last_appeared", Integer).with_check(0, 9999),
                ColumnDef::new("lowest_price", Float),
                ColumnDef::new("highest_price", Float),
            ],
            foreign_keys: Vec::new(),
        },
        TableSchema {
            entity: EntityKind::Menu,
            columns: vec![
                ColumnDef::new("id", Integer),
                ColumnDef::new("name", Text),
                ColumnDef::new("sponsor", Text),
                ColumnDef::new("event", Text),
                ColumnDef::new("venue", Text),
                ColumnDef::new("place", Text),
                ColumnDef::new("physical_description", Text),
                ColumnDef::new("occasion", Text),
                ColumnDef::new("notes", Text),
                ColumnDef::new("call_number", Text),
                ColumnDef::new("keywords", Text),
                ColumnDef::new("language", Text),
                ColumnDef::new("date", Text),
                ColumnDef::new("location", Text),
                ColumnDef::new("location_type", Text),
                ColumnDef::new("currency", Text),
                ColumnDef::new("currency_symbol", Text),
                ColumnDef::new("status", Text),
                ColumnDef::new("page_count", Integer),
                ColumnDef::new("dish_count", Integer),
            ],
            foreign_keys: Vec::new(),
        },
        TableSchema {
            entity: EntityKind::MenuPage,
            columns: vec![
                ColumnDef::new("id", Integer),
                ColumnDef::new("menu_id", Integer),
                ColumnDef::new("page_number", Integer),
                ColumnDef::new("image_id", Text),
                ColumnDef::new("full_height", Integer),
                ColumnDef::new("full_width", Integer),
                ColumnDef::new("uuid", Uuid),
            ],
            foreign_keys: vec![ForeignKey {
                column: "menu_id",
                parent: EntityKind::Menu,
            }],
        },
        TableSchema {
            entity: EntityKind::MenuItem,
            columns: vec![
                ColumnDef::new("id", Integer),
                ColumnDef::new("menu_page_id", Integer),
                ColumnDef::new("price", Float),
                ColumnDef::new("high_price", Float),
                ColumnDef::new("dish_id", Integer),
                ColumnDef::new("created_at", DateTime),
                ColumnDef::new("updated_at", DateTime),
                ColumnDef::new("xpos", Float),
                ColumnDef::new("ypos", Float),
            ],
            foreign_keys: vec![
                ForeignKey {
                    column: "dish_id",
                    parent: EntityKind::Dish,
                },
                ForeignKey {
                    column: "menu_page_id",
                    parent: EntityKind::MenuPage,
                },
            ],
        },
    ]
});

impl EntityKind {
    /// The persisted schema of this entity.
    pub fn schema(&self) -> &'static TableSchema {
        // SCHEMAS is declared in `EntityKind::ALL` order.
        let index = EntityKind::ALL
            .iter()
            .position(|kind| kind == self)
            .unwrap_or_default();
        &SCHEMAS[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup_matches_entity() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.schema().entity, kind);
            assert_eq!(kind.schema().columns[0].name, "id");
        }
    }

    #[test]
    fn test_dish_year_checks() {
        let dish = EntityKind::Dish.schema();
        let checked: Vec<_> = dish.checked_columns().map(|c| c.name).collect();
        assert_eq!(checked, vec!["first_appeared", "last_appeared"]);
        assert_eq!(dish.get_column("first_appeared").unwrap().check, Some((0, 9999)));
    }

    #[test]
    fn test_menu_item_foreign_keys() {
        let item = EntityKind::MenuItem.schema();
        let parents: Vec<_> = item.foreign_keys.iter().map(|fk| fk.parent).collect();
        assert_eq!(parents, vec![EntityKind::Dish, EntityKind::MenuPage]);
    }
}
