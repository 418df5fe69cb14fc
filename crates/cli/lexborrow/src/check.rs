//! Check command implementation

use anyhow::Result;
use colored::Colorize;
use lb_borrow_check::{BorrowMode, CheckerConfig, render_graphical, render_text};
use lb_driver::{CheckOutcome, Session, find_program_files, load_program};
use lb_program::Program;
use serde_json::json;
use std::path::PathBuf;

use crate::config::{Config, OutputFormat};

pub struct CheckOptions {
    pub path: PathBuf,
    pub format: Option<OutputFormat>,
    pub mode: Option<BorrowMode>,
    pub config: Option<PathBuf>,
    pub eval: bool,
}

pub fn check(options: &CheckOptions) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::discover(options.config.as_deref(), &cwd)?;
    let format = options.format.unwrap_or(config.output.format);
    let mode = options.mode.unwrap_or(config.check.mode);

    let files = find_program_files(&options.path)?;
    if files.is_empty() {
        anyhow::bail!("No program files found in {}", options.path.display());
    }

    let programs = files
        .iter()
        .map(|file| load_program(file))
        .collect::<Result<Vec<_>>>()?;

    let session = Session::new(CheckerConfig::with_mode(mode)).with_evaluation(options.eval);
    let outcomes = session.check_batch(&programs);
    let total_errors: usize = outcomes.iter().map(|outcome| outcome.diagnostics.len()).sum();

    match format {
        OutputFormat::Text => print_text(&programs, &outcomes, mode),
        OutputFormat::Json => print_json(&files, &outcomes)?,
    }

    if total_errors > 0 {
        anyhow::bail!("Check failed with {} borrow violations", total_errors);
    }

    Ok(())
}

fn print_text(programs: &[Program], outcomes: &[CheckOutcome], mode: BorrowMode) {
    println!(
        "{} {} programs ({mode} mode)",
        "Checking".green().bold(),
        programs.len()
    );

    for (program, outcome) in programs.iter().zip(outcomes) {
        println!("\n  {} {}", "Checking:".bold(), outcome.name);
        if outcome.is_clean() {
            println!("    {} No borrow violations", "✓".green());
        } else {
            report_violations(program, outcome);
        }
        print_evaluation(outcome);
    }

    println!();
    let failed = outcomes.iter().filter(|outcome| !outcome.is_clean()).count();
    if failed == 0 {
        println!("{} No errors found", "Success:".green().bold());
    } else {
        eprintln!(
            "{} {} of {} programs have violations",
            "Failed:".red().bold(),
            failed,
            outcomes.len()
        );
    }
}

/// Prints an outcome's diagnostics, with source snippets when possible
pub fn report_violations(program: &Program, outcome: &CheckOutcome) {
    for error in &outcome.diagnostics {
        match render_graphical(program, error) {
            Some(rendered) => eprintln!("{rendered}"),
            None => eprint!("{}", render_text(program, std::slice::from_ref(error))),
        }
    }
}

pub fn print_evaluation(outcome: &CheckOutcome) {
    match &outcome.evaluation {
        Some(Ok(trace)) => {
            for observation in trace {
                println!("    {} {observation}", "read".cyan());
            }
        }
        Some(Err(error)) => eprintln!("    {} {error}", "✗".red()),
        None => {}
    }
}

fn print_json(files: &[PathBuf], outcomes: &[CheckOutcome]) -> Result<()> {
    let report: Vec<_> = files
        .iter()
        .zip(outcomes)
        .map(|(file, outcome)| {
            let (observations, evaluation_error) = match &outcome.evaluation {
                Some(Ok(trace)) => (Some(trace), None),
                Some(Err(error)) => (None, Some(error.to_string())),
                None => (None, None),
            };
            json!({
                "program": outcome.name,
                "path": file.display().to_string(),
                "diagnostics": outcome.diagnostics,
                "observations": observations,
                "evaluation_error": evaluation_error,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
