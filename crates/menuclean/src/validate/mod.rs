//! Validation of persisted records against the check catalog.
//!
//! Each [`Check`] collects every violating id instead of stopping at the
//! first failure. The [`ValidationRunner`] groups checks into suites and
//! writes one `<Suite>_FailedID.json` per suite, which the cleaning stage
//! reads back as exclusion sets.

mod catalog;
mod check;
mod runner;

pub use catalog::{Suite, TestGroup, catalog, check_entity};
pub use check::{Assertion, Check, CheckKind, CheckOutcome, CheckStatus, Violation};
pub use runner::{RunSummary, ValidationRunner};
