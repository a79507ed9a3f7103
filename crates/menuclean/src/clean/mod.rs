//! The cleaning engine: date coercion, repair stages, the pipeline that
//! runs them and the exclusion sets it consumes.

mod date;
mod exclusion;
mod pipeline;
mod stage;

pub use date::{MAX_YEAR, MIN_YEAR, clamp_year, normalize_date, parse_strict_ymd};
pub use exclusion::{ExclusionLoader, ExclusionSet, FAILED_ID_SUFFIX};
pub use pipeline::{CleanOutcome, CleaningPipeline};
pub use stage::{Stage, StageReport, StageSpec};
