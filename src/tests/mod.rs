//! Crate-level tests: placement scenarios, invariants under random operation
//! sequences, and concurrent use from several processors.

mod helpers;
mod property;
