//! Reporting what cleaning changed.

mod change;

pub use change::{
    CHANGED_COUNT_PREFIX, CLEANED_PREFIX, ChangeReport, ChangeReporter, DirectoryReport,
    ReportFailure,
};
