//! Row predicates shared by the cleaning pipeline and the validation checks.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::Datelike;

use crate::clean::parse_strict_ymd;
use crate::table::{RecordTable, Value};

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The row's value in the named column.
    Column(String),
    /// A constant.
    Literal(Value),
}

impl Operand {
    fn resolve<'a>(&'a self, table: &'a RecordTable, row: usize) -> &'a Value {
        static NULL: Value = Value::Null;
        match self {
            Operand::Column(name) => table.value(row, name).unwrap_or(&NULL),
            Operand::Literal(value) => value,
        }
    }

    fn column(&self) -> Option<&str> {
        match self {
            Operand::Column(name) => Some(name),
            Operand::Literal(_) => None,
        }
    }

    fn to_sql(&self) -> Option<String> {
        match self {
            Operand::Column(name) => Some(quote_ident(name)),
            Operand::Literal(Value::Null) => Some("NULL".to_string()),
            Operand::Literal(Value::Integer(i)) => Some(i.to_string()),
            Operand::Literal(Value::Float(f)) if f.is_finite() => Some(format!("{:?}", f)),
            Operand::Literal(Value::Float(_)) => None,
            Operand::Literal(Value::Text(s)) => Some(quote_literal(s)),
            Operand::Literal(Value::Date(d)) => Some(quote_literal(&d.format("%Y-%m-%d").to_string())),
        }
    }
}

/// Shorthand for a column operand.
pub fn col(name: impl Into<String>) -> Operand {
    Operand::Column(name.into())
}

/// Shorthand for a literal operand.
pub fn lit(value: impl Into<Value>) -> Operand {
    Operand::Literal(value.into())
}

/// A boolean condition over one row of a [`RecordTable`].
///
/// Comparisons never match a null operand, so a predicate built from them
/// is false for rows with missing data.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The column is missing or empty.
    IsNull(String),
    Lt(Operand, Operand),
    Gt(Operand, Operand),
    Eq(Operand, Operand),
    /// Numeric value strictly below `min` or strictly above `max`.
    Outside { column: String, min: f64, max: f64 },
    /// Integer value is a member of `ids`.
    InSet { column: String, ids: BTreeSet<i64> },
    /// Value does not read as a `YYYY-MM-DD` date (nulls included).
    UnparseableDate(String),
    /// Value reads as a `YYYY-MM-DD` date whose year is after `year`.
    YearAfter { column: String, year: i32 },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull(column.into())
    }

    pub fn lt(left: Operand, right: Operand) -> Self {
        Predicate::Lt(left, right)
    }

    pub fn gt(left: Operand, right: Operand) -> Self {
        Predicate::Gt(left, right)
    }

    pub fn eq(left: Operand, right: Operand) -> Self {
        Predicate::Eq(left, right)
    }

    /// `column < 0`.
    pub fn negative(column: impl Into<String>) -> Self {
        Predicate::Lt(col(column), lit(0))
    }

    pub fn outside(column: impl Into<String>, min: f64, max: f64) -> Self {
        Predicate::Outside {
            column: column.into(),
            min,
            max,
        }
    }

    pub fn in_set(column: impl Into<String>, ids: BTreeSet<i64>) -> Self {
        Predicate::InSet {
            column: column.into(),
            ids,
        }
    }

    pub fn unparseable_date(column: impl Into<String>) -> Self {
        Predicate::UnparseableDate(column.into())
    }

    pub fn year_after(column: impl Into<String>, year: i32) -> Self {
        Predicate::YearAfter {
            column: column.into(),
            year,
        }
    }

    /// Columns the predicate reads, in first-mention order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        let mut push = |name: &'a str| {
            if !out.contains(&name) {
                out.push(name);
            }
        };
        match self {
            Predicate::IsNull(c)
            | Predicate::UnparseableDate(c)
            | Predicate::Outside { column: c, .. }
            | Predicate::InSet { column: c, .. }
            | Predicate::YearAfter { column: c, .. } => push(c),
            Predicate::Lt(a, b) | Predicate::Gt(a, b) | Predicate::Eq(a, b) => {
                for name in [a.column(), b.column()].into_iter().flatten() {
                    push(name);
                }
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                for part in parts {
                    part.collect_columns(out);
                }
            }
        }
    }

    /// Whether every column the predicate reads exists in `table`.
    pub fn applies_to(&self, table: &RecordTable) -> bool {
        table.has_columns(&self.columns())
    }

    /// Evaluate against one row.
    pub fn evaluate(&self, table: &RecordTable, row: usize) -> bool {
        match self {
            Predicate::IsNull(c) => table.value(row, c).is_none_or(Value::is_null),
            Predicate::Lt(a, b) => ordering(table, row, a, b) == Some(Ordering::Less),
            Predicate::Gt(a, b) => ordering(table, row, a, b) == Some(Ordering::Greater),
            Predicate::Eq(a, b) => ordering(table, row, a, b) == Some(Ordering::Equal),
            Predicate::Outside { column, min, max } => table
                .value(row, column)
                .and_then(Value::as_f64)
                .is_some_and(|v| v < *min || v > *max),
            Predicate::InSet { column, ids } => table
                .value(row, column)
                .and_then(Value::as_i64)
                .is_some_and(|id| ids.contains(&id)),
            Predicate::UnparseableDate(column) => {
                date_of(table.value(row, column)).is_none()
            }
            Predicate::YearAfter { column, year } => {
                date_of(table.value(row, column)).is_some_and(|d| d.year() > *year)
            }
            Predicate::And(parts) => parts.iter().all(|p| p.evaluate(table, row)),
            Predicate::Or(parts) => parts.iter().any(|p| p.evaluate(table, row)),
        }
    }

    /// Row indices of `table` matching the predicate.
    pub fn matching_rows(&self, table: &RecordTable) -> Vec<usize> {
        (0..table.row_count())
            .filter(|&row| self.evaluate(table, row))
            .collect()
    }

    /// Render as a SQL `WHERE` fragment.
    ///
    /// Returns `None` when part of the predicate has no faithful SQL form;
    /// callers then fall back to evaluating rows in memory.
    pub fn to_sql(&self) -> Option<String> {
        match self {
            Predicate::IsNull(c) => Some(format!("{} IS NULL", quote_ident(c))),
            Predicate::Lt(a, b) => binary_sql(a, "<", b),
            Predicate::Gt(a, b) => binary_sql(a, ">", b),
            Predicate::Eq(a, b) => binary_sql(a, "=", b),
            Predicate::Outside { column, min, max } => {
                let c = quote_ident(column);
                Some(format!("({c} < {min:?} OR {c} > {max:?})"))
            }
            Predicate::InSet { .. } | Predicate::UnparseableDate(_) | Predicate::YearAfter { .. } => None,
            Predicate::And(parts) => join_sql(parts, " AND "),
            Predicate::Or(parts) => join_sql(parts, " OR "),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_sql() {
            Some(sql) => f.write_str(&sql),
            None => write!(f, "{:?}", self),
        }
    }
}

fn ordering(table: &RecordTable, row: usize, a: &Operand, b: &Operand) -> Option<Ordering> {
    a.resolve(table, row).compare(b.resolve(table, row))
}

fn date_of(value: Option<&Value>) -> Option<chrono::NaiveDate> {
    match value? {
        Value::Date(d) => Some(*d),
        Value::Text(s) => parse_strict_ymd(s),
        _ => None,
    }
}

fn binary_sql(a: &Operand, op: &str, b: &Operand) -> Option<String> {
    Some(format!("{} {} {}", a.to_sql()?, op, b.to_sql()?))
}

fn join_sql(parts: &[Predicate], sep: &str) -> Option<String> {
    if parts.is_empty() {
        return Some(if sep.trim() == "AND" { "1" } else { "0" }.to_string());
    }
    let rendered = parts
        .iter()
        .map(|p| p.to_sql().map(|s| format!("({s})")))
        .collect::<Option<Vec<_>>>()?;
    Some(rendered.join(sep))
}

/// Quote an identifier for SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table(headers: Vec<&str>, rows: Vec<Vec<&str>>) -> RecordTable {
        RecordTable::from_strings(
            "test",
            headers.into_iter().map(String::from).collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
    }

    #[test]
    fn test_comparisons_skip_nulls() {
        let table = make_table(
            vec!["id", "price", "high_price"],
            vec![vec!["1", "2.0", "1.0"], vec!["2", "", "1.0"], vec!["3", "1.0", "3.0"]],
        );
        let p = Predicate::lt(col("high_price"), col("price"));
        assert_eq!(p.matching_rows(&table), vec![0]);
        assert!(!Predicate::gt(col("high_price"), col("price")).evaluate(&table, 1));
    }

    #[test]
    fn test_is_null() {
        let table = make_table(vec!["id", "name"], vec![vec!["1", "Soup"], vec!["2", ""], vec!["3", "  "]]);
        let p = Predicate::is_null("name");
        assert_eq!(p.matching_rows(&table), vec![1]);
        assert_eq!(p.to_sql().unwrap(), "\"name\" IS NULL");

        // A column the table lacks reads as null.
        assert!(Predicate::is_null("dish_id").evaluate(&table, 0));
        assert!(!Predicate::is_null("dish_id").applies_to(&table));
    }

    #[test]
    fn test_columns_and_applies_to() {
        let p = Predicate::Or(vec![
            Predicate::negative("price"),
            Predicate::lt(col("high_price"), col("price")),
        ]);
        assert_eq!(p.columns(), vec!["price", "high_price"]);

        let partial = make_table(vec!["id", "price"], vec![]);
        assert!(!p.applies_to(&partial));
        assert!(Predicate::negative("price").applies_to(&partial));
    }

    #[test]
    fn test_outside_is_exclusive_of_bounds() {
        let table = make_table(vec!["xpos"], vec![vec!["0"], vec!["1"], vec!["1.2"], vec!["-0.1"], vec![""]]);
        let p = Predicate::outside("xpos", 0.0, 1.0);
        assert_eq!(p.matching_rows(&table), vec![2, 3]);
    }

    #[test]
    fn test_date_predicates() {
        let table = make_table(
            vec!["date"],
            vec![vec!["1900-04-15"], vec!["2030-01-01"], vec!["c. 1900"], vec![""], vec!["1899-2-3"]],
        );
        assert_eq!(Predicate::unparseable_date("date").matching_rows(&table), vec![2, 3]);
        assert_eq!(Predicate::year_after("date", 2025).matching_rows(&table), vec![1]);
    }

    #[test]
    fn test_in_set() {
        let table = make_table(vec!["id"], vec![vec!["1"], vec!["5"], vec!["7"], vec!["9"]]);
        let p = Predicate::in_set("id", [5, 7].into_iter().collect());
        assert_eq!(p.matching_rows(&table), vec![1, 2]);
        assert!(p.to_sql().is_none());
    }

    #[test]
    fn test_to_sql() {
        assert_eq!(Predicate::negative("price").to_sql().unwrap(), "\"price\" < 0");
        assert_eq!(
            Predicate::outside("first_appeared", 1500.0, 2025.0).to_sql().unwrap(),
            "(\"first_appeared\" < 1500.0 OR \"first_appeared\" > 2025.0)"
        );
        assert_eq!(
            Predicate::eq(col("name"), lit("O'Brien")).to_sql().unwrap(),
            "\"name\" = 'O''Brien'"
        );
        assert!(Predicate::And(vec![Predicate::negative("a"), Predicate::unparseable_date("d")])
            .to_sql()
            .is_none());
    }
}
