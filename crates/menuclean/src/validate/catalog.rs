//! The fixed catalog of validation suites.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::clean::{MAX_YEAR, MIN_YEAR};
use crate::config::MenucleanConfig;
use crate::error::MenucleanError;
use crate::rules::{Predicate, col, lit};
use crate::schema::EntityKind;
use crate::table::Value;

use super::check::{Assertion, Check, CheckKind};

/// A named group of checks whose failures are written to one file.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: &'static str,
    pub checks: Vec<Check>,
}

/// Selectable sets of suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestGroup {
    Schema,
    Dish,
    Menu,
    MenuPage,
    MenuItem,
    All,
}

impl TestGroup {
    /// Accepted group names.
    pub const NAMES: [&'static str; 6] = ["schema", "dish", "menu", "menupage", "menuitem", "all"];

    /// Suites run by this group, in run order.
    pub fn suites(&self) -> &'static [&'static str] {
        match self {
            TestGroup::Schema => &["TestTablesSchema"],
            TestGroup::Dish => &["TestDishYearValid", "TestDisPriceValid"],
            TestGroup::Menu => &["TestMenuNumberValid", "TestMenuDateValid"],
            TestGroup::MenuPage => &["TestMenuPageNumberValid", "TestMenuPageDuplicate"],
            TestGroup::MenuItem => &["TestMenuItemNumberValid", "TestMenuItemDateValid"],
            TestGroup::All => &[
                "TestTablesSchema",
                "TestDishYearValid",
                "TestDisPriceValid",
                "TestMenuNumberValid",
                "TestMenuDateValid",
                "TestMenuPageNumberValid",
                "TestMenuPageDuplicate",
                "TestMenuItemNumberValid",
                "TestMenuItemDateValid",
            ],
        }
    }
}

impl FromStr for TestGroup {
    type Err = MenucleanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "schema" => Ok(TestGroup::Schema),
            "dish" => Ok(TestGroup::Dish),
            "menu" => Ok(TestGroup::Menu),
            "menupage" => Ok(TestGroup::MenuPage),
            "menuitem" => Ok(TestGroup::MenuItem),
            "all" => Ok(TestGroup::All),
            other => Err(MenucleanError::Config(format!(
                "unknown test group '{}', expected one of {:?}",
                other,
                TestGroup::NAMES
            ))),
        }
    }
}

impl fmt::Display for TestGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestGroup::Schema => "schema",
            TestGroup::Dish => "dish",
            TestGroup::Menu => "menu",
            TestGroup::MenuPage => "menupage",
            TestGroup::MenuItem => "menuitem",
            TestGroup::All => "all",
        };
        f.write_str(name)
    }
}

fn assertions(suite: &'static str, name: &'static str, entity: EntityKind, parts: Vec<Assertion>) -> Check {
    Check {
        suite,
        name: name.to_string(),
        entity,
        kind: CheckKind::Assertions(parts),
    }
}

fn not_negative(suite: &'static str, name: &'static str, entity: EntityKind, column: &'static str) -> Check {
    assertions(
        suite,
        name,
        entity,
        vec![Assertion::new(
            Predicate::negative(column),
            format!("Found {} rows with {} less than 0", entity, column),
        )],
    )
}

fn within(
    suite: &'static str,
    name: &'static str,
    entity: EntityKind,
    column: &'static str,
    min: impl Into<Value> + Copy + fmt::Display,
    max: impl Into<Value> + Copy + fmt::Display,
) -> Check {
    assertions(
        suite,
        name,
        entity,
        vec![
            Assertion::new(
                Predicate::lt(col(column), lit(min)),
                format!("Found {} rows with {} less than {}", entity, column, min),
            ),
            Assertion::new(
                Predicate::gt(col(column), lit(max)),
                format!("Found {} rows with {} greater than {}", entity, column, max),
            ),
        ],
    )
}

/// One dangling-reference check per foreign key declared in the schema.
fn reference_checks() -> impl Iterator<Item = Check> {
    EntityKind::ALL.into_iter().flat_map(|child| {
        child.schema().foreign_keys.iter().map(move |fk| Check {
            suite: "TestTablesSchema",
            name: format!("test_{}_{}_fk", child.snake_name(), fk.column),
            entity: child,
            kind: CheckKind::Dangling {
                column: fk.column,
                parent: fk.parent,
                message: format!("Found {} rows with invalid {}", child, fk.column),
            },
        })
    })
}

/// Build the catalog, taking row-count baselines from `config`.
pub fn catalog(config: &MenucleanConfig) -> Vec<Suite> {
    use EntityKind::{Dish, Menu, MenuItem, MenuPage};

    let row_counts = EntityKind::ALL.into_iter().map(|entity| Check {
        suite: "TestTablesSchema",
        name: format!("test_{}", entity.snake_name()),
        entity,
        kind: CheckKind::RowCount {
            expected: config.expected_rows_for(entity),
        },
    });

    vec![
        Suite {
            name: "TestTablesSchema",
            checks: row_counts.chain(reference_checks()).collect(),
        },
        Suite {
            name: "TestDishYearValid",
            checks: vec![
                within("TestDishYearValid", "test_first_appeared", Dish, "first_appeared", MIN_YEAR, MAX_YEAR),
                within("TestDishYearValid", "test_last_appeared", Dish, "last_appeared", MIN_YEAR, MAX_YEAR),
            ],
        },
        Suite {
            name: "TestDisPriceValid",
            checks: vec![
                not_negative("TestDisPriceValid", "test_lowest_price", Dish, "lowest_price"),
                not_negative("TestDisPriceValid", "test_highest_price", Dish, "highest_price"),
            ],
        },
        Suite {
            name: "TestMenuNumberValid",
            checks: vec![
                not_negative("TestMenuNumberValid", "test_page_count", Menu, "page_count"),
                not_negative("TestMenuNumberValid", "test_dish_count", Menu, "dish_count"),
            ],
        },
        Suite {
            name: "TestMenuDateValid",
            checks: vec![
                assertions(
                    "TestMenuDateValid",
                    "test_date_parseable",
                    Menu,
                    vec![Assertion::new(
                        Predicate::unparseable_date("date"),
                        "Found Menu rows with non parseable date",
                    )],
                ),
                assertions(
                    "TestMenuDateValid",
                    "test_date_valid",
                    Menu,
                    vec![Assertion::new(
                        Predicate::year_after("date", MAX_YEAR as i32),
                        format!("Found Menu rows with year greater than {}", MAX_YEAR),
                    )],
                ),
            ],
        },
        Suite {
            name: "TestMenuPageNumberValid",
            checks: vec![
                not_negative("TestMenuPageNumberValid", "test_page_number", MenuPage, "page_number"),
                not_negative("TestMenuPageNumberValid", "test_full_height", MenuPage, "full_height"),
                not_negative("TestMenuPageNumberValid", "test_full_width", MenuPage, "full_width"),
            ],
        },
        Suite {
            name: "TestMenuPageDuplicate",
            checks: vec![
                Check {
                    suite: "TestMenuPageDuplicate",
                    name: "test_uuid".to_string(),
                    entity: MenuPage,
                    kind: CheckKind::Duplicate {
                        columns: vec!["uuid"],
                        message: "Found MenuPage rows with duplicated uuid".to_string(),
                    },
                },
                Check {
                    suite: "TestMenuPageDuplicate",
                    name: "test_menu_id_page_number".to_string(),
                    entity: MenuPage,
                    kind: CheckKind::Duplicate {
                        columns: vec!["menu_id", "page_number"],
                        message: "Found MenuPage rows with duplicated (menu_id, page_number)".to_string(),
                    },
                },
            ],
        },
        Suite {
            name: "TestMenuItemNumberValid",
            checks: vec![
                not_negative("TestMenuItemNumberValid", "test_price", MenuItem, "price"),
                not_negative("TestMenuItemNumberValid", "test_high_price", MenuItem, "high_price"),
                assertions(
                    "TestMenuItemNumberValid",
                    "test_price_high_price",
                    MenuItem,
                    vec![Assertion::new(
                        Predicate::lt(col("high_price"), col("price")),
                        "Found MenuItem rows with high_price less than price",
                    )],
                ),
                within("TestMenuItemNumberValid", "test_xpos", MenuItem, "xpos", 0, 1),
                within("TestMenuItemNumberValid", "test_ypos", MenuItem, "ypos", 0, 1),
            ],
        },
        Suite {
            name: "TestMenuItemDateValid",
            checks: vec![assertions(
                "TestMenuItemDateValid",
                "test_create_update",
                MenuItem,
                vec![Assertion::new(
                    Predicate::gt(col("created_at"), col("updated_at")),
                    "Found MenuItem rows with created_at later than updated_at",
                )],
            )],
        },
    ]
}

static DEFAULT_CATALOG: Lazy<Vec<Suite>> = Lazy::new(|| catalog(&MenucleanConfig::default()));

/// Entity a catalog check reports on, if the check is known.
pub fn check_entity(suite: &str, name: &str) -> Option<EntityKind> {
    DEFAULT_CATALOG
        .iter()
        .filter(|s| s.name == suite)
        .flat_map(|s| &s.checks)
        .find(|c| c.name == name)
        .map(|c| c.entity)
}
