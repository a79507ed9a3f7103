//! Reusable row predicates.

mod predicate;

pub(crate) use predicate::quote_ident;
pub use predicate::{Operand, Predicate, col, lit};
