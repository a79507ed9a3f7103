//! Validation checks and their outcomes.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::Result;
use crate::rules::Predicate;
use crate::schema::EntityKind;
use crate::store::RecordStore;

/// One condition that must match no rows.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub predicate: Predicate,
    /// Reported when rows match.
    pub message: String,
}

impl Assertion {
    pub fn new(predicate: Predicate, message: impl Into<String>) -> Self {
        Self {
            predicate,
            message: message.into(),
        }
    }
}

/// What a check evaluates.
#[derive(Debug, Clone)]
pub enum CheckKind {
    /// Every assertion must match no rows.
    Assertions(Vec<Assertion>),
    /// No two rows may share a value over `columns`.
    Duplicate {
        columns: Vec<&'static str>,
        message: String,
    },
    /// Every `column` value must be an existing `parent` id.
    Dangling {
        column: &'static str,
        parent: EntityKind,
        message: String,
    },
    /// The table exists and holds `expected` rows (when set).
    RowCount { expected: Option<u64> },
}

/// A named validation check over one entity.
#[derive(Debug, Clone)]
pub struct Check {
    /// Suite the check belongs to; names the failure file.
    pub suite: &'static str,
    /// Check name; keys the ids in the failure file.
    pub name: String,
    pub entity: EntityKind,
    pub kind: CheckKind,
}

/// Rows found by one part of a check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub message: String,
    pub ids: Vec<i64>,
}

/// Final state of a check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    /// The check ran and found violations.
    Failed,
    /// The check could not run.
    Errored(String),
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "PASS"),
            CheckStatus::Failed => write!(f, "FAIL"),
            CheckStatus::Errored(_) => write!(f, "ERROR"),
        }
    }
}

/// Outcome of running one check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub suite: String,
    pub name: String,
    pub status: CheckStatus,
    pub violations: Vec<Violation>,
    /// Union of the violating ids across all parts of the check.
    pub failed_ids: BTreeSet<i64>,
    pub elapsed: Duration,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }
}

impl Check {
    /// Run the check against `store`.
    ///
    /// Every part of the check is evaluated before the status is decided;
    /// a store error marks the check as errored instead of failing the run.
    pub fn run(&self, store: &dyn RecordStore) -> CheckOutcome {
        let started = Instant::now();
        let (status, violations) = match self.collect(store) {
            Ok(violations) if violations.is_empty() => (CheckStatus::Passed, violations),
            Ok(violations) => (CheckStatus::Failed, violations),
            Err(e) => (CheckStatus::Errored(e.to_string()), Vec::new()),
        };
        let failed_ids = violations
            .iter()
            .flat_map(|v| v.ids.iter().copied())
            .collect();

        CheckOutcome {
            suite: self.suite.to_string(),
            name: self.name.clone(),
            status,
            violations,
            failed_ids,
            elapsed: started.elapsed(),
        }
    }

    fn collect(&self, store: &dyn RecordStore) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        match &self.kind {
            CheckKind::Assertions(assertions) => {
                for assertion in assertions {
                    let ids = store.ids_where(self.entity, &assertion.predicate)?;
                    push_if_any(&mut violations, &assertion.message, ids);
                }
            }
            CheckKind::Duplicate { columns, message } => {
                let ids = store.duplicate_ids(self.entity, columns)?;
                push_if_any(&mut violations, message, ids);
            }
            CheckKind::Dangling {
                column,
                parent,
                message,
            } => {
                let ids = store.dangling_references(self.entity, column, *parent)?;
                push_if_any(&mut violations, message, ids);
            }
            CheckKind::RowCount { expected } => {
                if !store.has_table(self.entity)? {
                    violations.push(Violation {
                        message: format!("Table \"{}\" does not exist", self.entity),
                        ids: Vec::new(),
                    });
                } else if let Some(expected) = expected {
                    let rows = store.count_rows(self.entity)?;
                    if rows != *expected {
                        violations.push(Violation {
                            message: format!(
                                "{} rows missing: expected {}, found {}",
                                self.entity, expected, rows
                            ),
                            ids: Vec::new(),
                        });
                    }
                }
            }
        }
        Ok(violations)
    }
}

fn push_if_any(violations: &mut Vec<Violation>, message: &str, ids: Vec<i64>) {
    if !ids.is_empty() {
        violations.push(Violation {
            message: message.to_string(),
            ids,
        });
    }
}
