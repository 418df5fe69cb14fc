//! Integration test utilities for lexborrow
//!
//! Fixture programs live in `fixtures/`, numbered in the order of the
//! scenarios they cover.

use anyhow::Result;
use lb_borrow_check::{CheckerConfig, ViolationKind};
use lb_driver::{CheckOutcome, Session, load_program};
use lb_program::Program;
use std::path::PathBuf;

/// Directory holding the fixture programs
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Loads a fixture by file name
///
/// # Errors
///
/// Returns an error if the fixture is missing or does not parse
pub fn load_fixture(name: &str) -> Result<Program> {
    load_program(&fixtures_dir().join(name))
}

/// Checks a fixture in lexical mode, evaluating it when clean
///
/// # Errors
///
/// Returns an error if the fixture cannot be loaded
pub fn check_fixture(name: &str) -> Result<(Program, CheckOutcome)> {
    let program = load_fixture(name)?;
    let outcome = Session::new(CheckerConfig::default())
        .with_evaluation(true)
        .check(&program);
    Ok((program, outcome))
}

/// Violation kinds of an outcome, in order
pub fn kinds(outcome: &CheckOutcome) -> Vec<ViolationKind> {
    outcome
        .diagnostics
        .iter()
        .map(lb_borrow_check::BorrowError::kind)
        .collect()
}
