//! Property-based tests for the cleaning pipeline.
//!
//! These tests use proptest to generate random tables and verify that the
//! pipeline keeps its invariants on any input.
//!
//! # Running Property Tests
//!
//! ```bash
//! # Run all property tests
//! cargo test -p menuclean --test property_tests
//!
//! # Run with more cases (slower but more thorough)
//! PROPTEST_CASES=10000 cargo test -p menuclean --test property_tests
//! ```

use std::collections::HashSet;

use chrono::Datelike;
use proptest::prelude::*;

use menuclean::clean::{MAX_YEAR, MIN_YEAR, normalize_date, parse_strict_ymd};
use menuclean::{CleaningPipeline, EntityKind, ExclusionSet, RecordTable, Value};

// =============================================================================
// Test Strategies
// =============================================================================

/// Optional cell drawn from `inner`, null about one time in five.
fn nullable(inner: impl Strategy<Value = Value>) -> impl Strategy<Value = Value> {
    prop_oneof![1 => Just(Value::Null), 4 => inner]
}

fn price() -> impl Strategy<Value = Value> {
    nullable((-500i64..5000).prop_map(|cents| Value::Float(cents as f64 / 100.0)))
}

fn year() -> impl Strategy<Value = Value> {
    nullable((-10i64..4000).prop_map(Value::Integer))
}

fn timestamp() -> impl Strategy<Value = Value> {
    nullable(
        (1990i32..2030, 1u32..13, 1u32..29, 0u32..24).prop_map(|(y, m, d, h)| {
            Value::Text(format!("{:04}-{:02}-{:02} {:02}:00:00", y, m, d, h))
        }),
    )
}

/// Free-text menu dates in the shapes found in the exports.
fn date_text() -> impl Strategy<Value = Value> {
    nullable(prop_oneof![
        (1000i32..2100, 1u32..13, 1u32..29).prop_map(|(y, m, d)| Value::Text(format!("{}-{:02}-{:02}", y, m, d))),
        (1000i32..2100, 1u32..13, 1u32..29).prop_map(|(y, m, d)| Value::Text(format!("{}/{}/{}", y, m, d))),
        (1000i32..2100, 1u32..13).prop_map(|(y, m)| Value::Text(format!("{}-{:02}", y, m))),
        (1000i64..2100).prop_map(Value::Integer),
        "[a-z ]{1,12}".prop_map(Value::Text),
    ])
}

type Row = (i64, Value, Value, Value, Value, Value, Value);

fn row() -> impl Strategy<Value = Row> {
    (0i64..30, price(), price(), timestamp(), timestamp(), date_text(), year())
}

fn table() -> impl Strategy<Value = RecordTable> {
    prop::collection::vec(row(), 0..40).prop_map(|rows| {
        let headers = ["id", "price", "high_price", "created_at", "updated_at", "date", "first_appeared"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = rows
            .into_iter()
            .map(|(id, p, hp, c, u, d, y)| vec![Value::Integer(id), p, hp, c, u, d, y])
            .collect();
        RecordTable::new("Mixed", headers, rows)
    })
}

fn clean(table: &RecordTable, exclusions: &[ExclusionSet]) -> RecordTable {
    CleaningPipeline::standard()
        .run(table, None, exclusions)
        .expect("pipeline failed")
        .table
}

fn column<'a>(table: &'a RecordTable, name: &str) -> Vec<&'a Value> {
    table.column_values(name).expect("missing column").collect()
}

// =============================================================================
// Pipeline Invariants
// =============================================================================

proptest! {
    #[test]
    fn prop_clean_is_idempotent(t in table()) {
        let once = clean(&t, &[]);
        let twice = clean(&once, &[]);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_ids_unique_and_nonzero(t in table()) {
        let cleaned = clean(&t, &[]);
        let ids = cleaned.ids();
        let distinct: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(distinct.len(), ids.len());
        prop_assert!(!ids.contains(&0));
    }

    #[test]
    fn prop_high_price_at_least_price(t in table()) {
        let cleaned = clean(&t, &[]);
        for (p, hp) in column(&cleaned, "price").into_iter().zip(column(&cleaned, "high_price")) {
            if let (Some(p), Some(hp)) = (p.as_f64(), hp.as_f64()) {
                prop_assert!(hp >= p);
            }
        }
    }

    #[test]
    fn prop_updated_not_before_created(t in table()) {
        let cleaned = clean(&t, &[]);
        for (c, u) in column(&cleaned, "created_at").into_iter().zip(column(&cleaned, "updated_at")) {
            if let Some(order) = c.compare(u) {
                prop_assert!(order.is_le());
            }
        }
    }

    #[test]
    fn prop_years_within_range(t in table()) {
        let cleaned = clean(&t, &[]);
        for value in column(&cleaned, "first_appeared") {
            if let Some(y) = value.as_i64() {
                prop_assert!((MIN_YEAR..=MAX_YEAR).contains(&y));
            }
        }
        for value in column(&cleaned, "date") {
            match value {
                Value::Null => {}
                Value::Date(d) => prop_assert!((MIN_YEAR..=MAX_YEAR).contains(&(d.year() as i64))),
                other => prop_assert!(false, "unexpected date cell {:?}", other),
            }
        }
    }

    #[test]
    fn prop_exclusions_removed(t in table(), excluded in prop::collection::btree_set(1i64..30, 0..10)) {
        let set = ExclusionSet::new("TestMenuItemNumberValid", excluded.iter().copied());
        let cleaned = clean(&t, &[set]);
        let expected: HashSet<i64> = t.ids().into_iter().filter(|id| *id != 0 && !excluded.contains(id)).collect();
        let actual: HashSet<i64> = cleaned.ids().into_iter().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_input_untouched(t in table()) {
        let before = t.clone();
        let _ = CleaningPipeline::standard().run(&t, Some(EntityKind::MenuItem), &[]);
        prop_assert_eq!(t, before);
    }
}

// =============================================================================
// Date Normalizer
// =============================================================================

proptest! {
    #[test]
    fn prop_normalize_never_panics(s in "\\PC{0,20}") {
        let normalized = normalize_date(&s);
        if !normalized.is_empty() {
            let date = parse_strict_ymd(&normalized);
            prop_assert!(date.is_some());
            let year = date.map(|d| d.year() as i64).unwrap_or_default();
            prop_assert!((MIN_YEAR..=MAX_YEAR).contains(&year));
        }
    }

    #[test]
    fn prop_normalize_is_stable(y in 1500i32..=2025, m in 1u32..13, d in 1u32..29) {
        let canonical = format!("{:04}-{:02}-{:02}", y, m, d);
        prop_assert_eq!(normalize_date(&canonical), canonical.clone());
        prop_assert_eq!(normalize_date(&format!("{}/{}/{}", y, m, d)), canonical);
    }
}
