//! Individual repair stages.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::{Predicate, col, lit};
use crate::schema::EntityKind;
use crate::table::{ID_COLUMN, RecordTable};

use super::date::{clamp_year_value, normalize_date_value};
use super::exclusion::ExclusionSet;

/// A single transformation applied by the cleaning pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Stage {
    /// Drop rows with `id == 0`, then keep the first row of each `id`.
    DropInvalidIds,

    /// Drop rows whose reference column is `0`.
    DropZeroReference { column: String },

    /// Drop rows whose `id` appears in any supplied exclusion set.
    DropExcluded,

    /// Where `target < floor`, set `target := floor`.
    RaiseToFloor { target: String, floor: String },

    /// Rewrite a free-text date column as clamped `YYYY-MM-DD`.
    NormalizeDates { column: String },

    /// Clamp a year column into the accepted range.
    ClampYears { column: String },
}

impl Stage {
    /// Short label used in logs and reports.
    pub fn name(&self) -> String {
        match self {
            Stage::DropInvalidIds => "drop_invalid_ids".to_string(),
            Stage::DropZeroReference { column } => format!("drop_zero_{}", column),
            Stage::DropExcluded => "drop_excluded".to_string(),
            Stage::RaiseToFloor { target, floor } => format!("raise_{}_to_{}", target, floor),
            Stage::NormalizeDates { column } => format!("normalize_{}", column),
            Stage::ClampYears { column } => format!("clamp_{}", column),
        }
    }

    /// Columns that must exist for the stage to run.
    pub fn required_columns(&self) -> Vec<String> {
        match self {
            Stage::DropInvalidIds | Stage::DropExcluded => vec![ID_COLUMN.to_string()],
            Stage::DropZeroReference { column }
            | Stage::NormalizeDates { column }
            | Stage::ClampYears { column } => vec![column.clone()],
            Stage::RaiseToFloor { target, floor } => vec![target.clone(), floor.clone()],
        }
    }

    /// Apply the stage, returning the new table.
    pub fn apply(&self, table: &RecordTable, exclusions: &[ExclusionSet]) -> Result<RecordTable> {
        match self {
            Stage::DropInvalidIds => {
                let zero = Predicate::eq(col(ID_COLUMN), lit(0));
                table
                    .filter(|row, _| !zero.evaluate(table, row))
                    .dedup_by(ID_COLUMN)
            }
            Stage::DropZeroReference { column } => {
                let zero = Predicate::eq(col(column.as_str()), lit(0));
                Ok(table.filter(|row, _| !zero.evaluate(table, row)))
            }
            Stage::DropExcluded => {
                let mut current = table.clone();
                for set in exclusions.iter().filter(|s| !s.is_empty()) {
                    let excluded = Predicate::in_set(ID_COLUMN, set.ids.clone());
                    let next = current.filter(|row, _| !excluded.evaluate(&current, row));
                    tracing::debug!(
                        set = %set.name,
                        removed = current.row_count() - next.row_count(),
                        "Applied exclusion set"
                    );
                    current = next;
                }
                Ok(current)
            }
            Stage::RaiseToFloor { target, floor } => {
                let below = Predicate::lt(col(target.as_str()), col(floor.as_str()));
                let floor_idx = table.column_index(floor);
                table.replace_where(
                    target,
                    |row, _| below.evaluate(table, row),
                    |_, cells| {
                        floor_idx
                            .and_then(|idx| cells.get(idx))
                            .cloned()
                            .unwrap_or_default()
                    },
                )
            }
            Stage::NormalizeDates { column } => table.map_column(column, normalize_date_value),
            Stage::ClampYears { column } => table.map_column(column, clamp_year_value),
        }
    }
}

/// A stage together with the conditions under which it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub stage: Stage,
    /// Columns that must all be present.
    pub required: Vec<String>,
    /// Restrict the stage to one entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityKind>,
}

impl StageSpec {
    /// A stage that runs whenever its own columns are present.
    pub fn new(stage: Stage) -> Self {
        let required = stage.required_columns();
        Self {
            stage,
            required,
            entity: None,
        }
    }

    /// Restrict the stage to one entity.
    pub fn for_entity(mut self, entity: EntityKind) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Whether the stage runs on `table` cleaned as `entity`.
    pub fn is_applicable(&self, table: &RecordTable, entity: Option<EntityKind>) -> bool {
        let entity_matches = match self.entity {
            Some(required) => entity == Some(required),
            None => true,
        };
        entity_matches && table.has_columns(&self.required)
    }
}

/// What a stage did to the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub applied: bool,
    pub rows_removed: usize,
    pub cells_changed: usize,
}

impl StageReport {
    pub(crate) fn skipped(stage: &Stage) -> Self {
        Self {
            stage: stage.name(),
            applied: false,
            rows_removed: 0,
            cells_changed: 0,
        }
    }

    pub(crate) fn applied(stage: &Stage, before: &RecordTable, after: &RecordTable) -> Self {
        Self {
            stage: stage.name(),
            applied: true,
            rows_removed: before.row_count().saturating_sub(after.row_count()),
            cells_changed: before.changed_cells(after).unwrap_or(0),
        }
    }
}
