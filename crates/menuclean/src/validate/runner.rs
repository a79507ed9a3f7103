//! Running suites and persisting their failure sets.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::clean::FAILED_ID_SUFFIX;
use crate::config::MenucleanConfig;
use crate::error::{MenucleanError, Result};
use crate::store::RecordStore;

use super::catalog::{Suite, TestGroup, catalog};
use super::check::{CheckOutcome, CheckStatus};

/// Aggregate result of a validation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub outcomes: Vec<CheckOutcome>,
}

impl RunSummary {
    fn record(&mut self, outcome: CheckOutcome) {
        self.run += 1;
        match outcome.status {
            CheckStatus::Passed => self.passed += 1,
            CheckStatus::Failed => self.failed += 1,
            CheckStatus::Errored(_) => self.errored += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Every id reported by a failed check.
    pub fn failed_ids(&self) -> BTreeSet<i64> {
        self.outcomes
            .iter()
            .flat_map(|o| o.failed_ids.iter().copied())
            .collect()
    }
}

/// Runs catalog suites against a store.
pub struct ValidationRunner {
    suites: Vec<Suite>,
    output_dir: PathBuf,
}

impl ValidationRunner {
    pub fn new(config: &MenucleanConfig) -> Self {
        Self {
            suites: catalog(config),
            output_dir: PathBuf::from("."),
        }
    }

    /// Directory receiving `<Suite>_FailedID.json` files.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Suites selected by `groups`, each at most once, in group order.
    pub fn select(&self, groups: &[TestGroup]) -> Vec<&Suite> {
        let mut selected: Vec<&Suite> = Vec::new();
        for group in groups {
            for name in group.suites() {
                if selected.iter().any(|s| s.name == *name) {
                    continue;
                }
                if let Some(suite) = self.suites.iter().find(|s| s.name == *name) {
                    selected.push(suite);
                }
            }
        }
        selected
    }

    /// Run the selected groups.
    ///
    /// Check failures and errors are recorded, never returned. The failure
    /// file of each suite is written as soon as the suite completes.
    pub fn run(
        &self,
        store: &dyn RecordStore,
        groups: &[TestGroup],
        interrupt: &AtomicBool,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for suite in self.select(groups) {
            info!("===> {} <===", suite.name);
            let started = Instant::now();
            let mut failed_ids: IndexMap<&str, BTreeSet<i64>> = IndexMap::new();

            for check in &suite.checks {
                if interrupt.load(Ordering::SeqCst) {
                    warn!(suite = suite.name, "Validation run interrupted");
                    return Err(MenucleanError::Interrupted(format!(
                        "validation stopped during {}",
                        suite.name
                    )));
                }

                info!("START => {}", check.name);
                let outcome = check.run(store);
                log_outcome(&outcome);
                failed_ids.insert(check.name.as_str(), outcome.failed_ids.clone());
                summary.record(outcome);
            }

            info!(
                "{} Finish: {:.4}s",
                suite.name,
                started.elapsed().as_secs_f64()
            );
            self.write_failed_ids(suite.name, &failed_ids)?;
        }

        info!(
            run = summary.run,
            failures = summary.failed,
            errors = summary.errored,
            "Validation finished"
        );
        Ok(summary)
    }

    fn write_failed_ids(&self, suite: &str, ids: &IndexMap<&str, BTreeSet<i64>>) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| MenucleanError::io(&self.output_dir, e))?;
        let path = self.output_dir.join(format!("{}{}", suite, FAILED_ID_SUFFIX));
        let json = serde_json::to_string(ids)?;
        fs::write(&path, json).map_err(|e| MenucleanError::io(&path, e))
    }
}

fn log_outcome(outcome: &CheckOutcome) {
    let secs = outcome.elapsed.as_secs_f64();
    match &outcome.status {
        CheckStatus::Passed => info!(check = %outcome.name, "Result: PASS ({:.4}s)", secs),
        CheckStatus::Failed => {
            for violation in &outcome.violations {
                warn!(
                    check = %outcome.name,
                    rows = violation.ids.len(),
                    "{}",
                    violation.message
                );
            }
            warn!(check = %outcome.name, ids = outcome.failed_ids.len(), "Result: FAIL ({:.4}s)", secs);
        }
        CheckStatus::Errored(message) => {
            error!(check = %outcome.name, "ERROR: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityKind;
    use crate::store::MemoryStore;
    use crate::table::RecordTable;
    use tempfile::TempDir;

    fn page_store() -> MemoryStore {
        let table = RecordTable::from_strings(
            "MenuPage",
            vec!["id".into(), "menu_id".into(), "page_number".into(), "uuid".into()],
            vec![
                vec!["1".into(), "10".into(), "1".into(), "abc".into()],
                vec!["2".into(), "10".into(), "2".into(), "abc".into()],
                vec!["3".into(), "10".into(), "-1".into(), "def".into()],
            ],
        );
        let mut store = MemoryStore::new();
        store
            .bulk_insert(EntityKind::MenuPage, &table, &AtomicBool::new(false))
            .unwrap();
        store
    }

    #[test]
    fn test_select_dedups_groups() {
        let runner = ValidationRunner::new(&MenucleanConfig::default());
        let names: Vec<_> = runner
            .select(&[TestGroup::Dish, TestGroup::All])
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names.len(), 9);
        assert_eq!(names[0], "TestDishYearValid");
        assert!(runner.select(&[]).is_empty());
    }

    #[test]
    fn test_run_writes_failure_files() {
        let dir = TempDir::new().unwrap();
        let runner = ValidationRunner::new(&MenucleanConfig::default()).with_output_dir(dir.path());
        let summary = runner
            .run(&page_store(), &[TestGroup::MenuPage], &AtomicBool::new(false))
            .unwrap();

        assert_eq!(summary.run, 5);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.errored, 0);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed_ids(), BTreeSet::from([1, 2, 3]));

        let content = fs::read_to_string(dir.path().join("TestMenuPageDuplicate_FailedID.json")).unwrap();
        let parsed: IndexMap<String, Vec<i64>> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["test_uuid"], vec![1, 2]);
        assert!(parsed["test_menu_id_page_number"].is_empty());

        let numbers = fs::read_to_string(dir.path().join("TestMenuPageNumberValid_FailedID.json")).unwrap();
        assert!(numbers.contains("\"test_page_number\":[3]"));
    }

    #[test]
    fn test_interrupt_stops_run() {
        let dir = TempDir::new().unwrap();
        let runner = ValidationRunner::new(&MenucleanConfig::default()).with_output_dir(dir.path());
        let err = runner
            .run(&page_store(), &[TestGroup::All], &AtomicBool::new(true))
            .unwrap_err();
        assert!(matches!(err, MenucleanError::Interrupted(_)));
    }
}
