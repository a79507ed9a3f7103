//! Ordered cleaning pipeline.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::schema::EntityKind;
use crate::table::RecordTable;

use super::exclusion::ExclusionSet;
use super::stage::{Stage, StageReport, StageSpec};

/// Result of cleaning one table.
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutcome {
    /// The cleaned table.
    #[serde(skip)]
    pub table: RecordTable,
    /// One report per configured stage, in execution order.
    pub stages: Vec<StageReport>,
}

impl CleanOutcome {
    /// Rows removed across all stages.
    pub fn rows_removed(&self) -> usize {
        self.stages.iter().map(|s| s.rows_removed).sum()
    }

    /// Cells rewritten across all stages.
    pub fn cells_changed(&self) -> usize {
        self.stages.iter().map(|s| s.cells_changed).sum()
    }
}

/// A fixed sequence of stages run by a generic executor.
///
/// Each spec is skipped unless its entity filter matches and all of its
/// required columns are present, so the same pipeline serves every table.
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    specs: Vec<StageSpec>,
}

impl Default for CleaningPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl CleaningPipeline {
    /// Create a pipeline from explicit specs.
    pub fn new(specs: Vec<StageSpec>) -> Self {
        Self { specs }
    }

    /// The standard menu-data pipeline.
    ///
    /// Row removal runs before any value repair; the repairs that follow
    /// touch disjoint columns and commute.
    pub fn standard() -> Self {
        let column = |name: &str| name.to_string();
        Self::new(vec![
            StageSpec::new(Stage::DropInvalidIds),
            StageSpec::new(Stage::DropZeroReference {
                column: column("menu_id"),
            })
            .for_entity(EntityKind::MenuPage),
            StageSpec::new(Stage::DropZeroReference {
                column: column("menu_page_id"),
            })
            .for_entity(EntityKind::MenuItem),
            StageSpec::new(Stage::DropZeroReference {
                column: column("dish_id"),
            })
            .for_entity(EntityKind::MenuItem),
            StageSpec::new(Stage::DropExcluded),
            StageSpec::new(Stage::RaiseToFloor {
                target: column("high_price"),
                floor: column("price"),
            }),
            StageSpec::new(Stage::RaiseToFloor {
                target: column("updated_at"),
                floor: column("created_at"),
            }),
            StageSpec::new(Stage::NormalizeDates {
                column: column("date"),
            }),
            StageSpec::new(Stage::ClampYears {
                column: column("first_appeared"),
            }),
            StageSpec::new(Stage::ClampYears {
                column: column("last_appeared"),
            }),
        ])
    }

    /// The configured specs in execution order.
    pub fn specs(&self) -> &[StageSpec] {
        &self.specs
    }

    /// Clean `table`, leaving the input untouched.
    pub fn run(
        &self,
        table: &RecordTable,
        entity: Option<EntityKind>,
        exclusions: &[ExclusionSet],
    ) -> Result<CleanOutcome> {
        let mut current = table.clone();
        let mut stages = Vec::with_capacity(self.specs.len());

        for spec in &self.specs {
            if !spec.is_applicable(&current, entity) {
                debug!(table = %table.name, stage = %spec.stage.name(), "Stage skipped");
                stages.push(StageReport::skipped(&spec.stage));
                continue;
            }

            let next = spec.stage.apply(&current, exclusions)?;
            let report = StageReport::applied(&spec.stage, &current, &next);
            if report.rows_removed > 0 || report.cells_changed > 0 {
                info!(
                    table = %table.name,
                    stage = %report.stage,
                    rows_removed = report.rows_removed,
                    cells_changed = report.cells_changed,
                    "Stage applied"
                );
            }
            stages.push(report);
            current = next;
        }

        Ok(CleanOutcome {
            table: current,
            stages,
        })
    }
}
