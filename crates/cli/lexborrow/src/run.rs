//! Run command implementation

use anyhow::Result;
use colored::Colorize;
use lb_borrow_check::CheckerConfig;
use lb_driver::{Session, load_program};
use std::path::Path;

use crate::check::{print_evaluation, report_violations};

pub fn run(path: &Path) -> Result<()> {
    let program = load_program(path)?;
    println!("{} {}", "Running".green().bold(), program.display_name());

    let outcome = Session::new(CheckerConfig::default())
        .with_evaluation(true)
        .check(&program);

    if !outcome.is_clean() {
        report_violations(&program, &outcome);
        anyhow::bail!(
            "{} has {} borrow violations; not evaluating",
            outcome.name,
            outcome.diagnostics.len()
        );
    }

    print_evaluation(&outcome);
    if let Some(Err(error)) = outcome.evaluation {
        anyhow::bail!("Evaluation failed: {error}");
    }

    Ok(())
}
