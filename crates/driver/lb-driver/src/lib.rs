//! Checking pipeline and high-level APIs
//!
//! Loads serialized programs, runs the borrow checker over them and,
//! on request, evaluates the ones that pass.

use anyhow::{Context, Result, bail};
use lb_borrow_check::{BorrowChecker, BorrowError, CheckerConfig};
use lb_interpreter::{Interpreter, InterpreterError, Trace};
use lb_program::Program;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk program encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramFormat {
    Json,
    Toml,
}

impl ProgramFormat {
    /// Picks the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Deserializes a program from text
pub fn parse_program(text: &str, format: ProgramFormat) -> Result<Program> {
    let program = match format {
        ProgramFormat::Json => serde_json::from_str(text)?,
        ProgramFormat::Toml => toml::from_str(text)?,
    };
    Ok(program)
}

/// Reads a program file, naming the program after the file when it has no
/// name of its own
pub fn load_program(path: &Path) -> Result<Program> {
    let Some(format) = ProgramFormat::from_path(path) else {
        bail!(
            "{}: unsupported program format (expected .json or .toml)",
            path.display()
        );
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut program = parse_program(&text, format)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if program.name.is_none() {
        program.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }
    debug!(path = %path.display(), statements = program.len(), "loaded program");
    Ok(program)
}

/// Finds program files under `path`.
///
/// A file is returned as is. A directory is searched recursively for `.json`
/// and `.toml` files, returned in sorted order.
pub fn find_program_files(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        files.push(path.to_path_buf());
    } else if path.is_dir() {
        collect_program_files(path, &mut files)?;
        files.sort();
    } else {
        bail!("{} does not exist", path.display());
    }

    Ok(files)
}

fn collect_program_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_program_files(&path, files)?;
        } else if ProgramFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    Ok(())
}

/// Result of checking one program
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// Program name used in reports
    pub name: String,
    /// Violations in program order
    pub diagnostics: Vec<BorrowError>,
    /// Evaluation result, present only for clean programs when requested
    pub evaluation: Option<Result<Trace, InterpreterError>>,
}

impl CheckOutcome {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Settings shared by every program checked in one invocation
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub config: CheckerConfig,
    /// Evaluate programs that pass the checker
    pub evaluate: bool,
}

impl Session {
    pub fn new(config: CheckerConfig) -> Self {
        Self {
            config,
            evaluate: false,
        }
    }

    #[must_use]
    pub fn with_evaluation(mut self, evaluate: bool) -> Self {
        self.evaluate = evaluate;
        self
    }

    pub fn check(&self, program: &Program) -> CheckOutcome {
        let diagnostics = BorrowChecker::analyze(program, &self.config);
        let evaluation = (self.evaluate && diagnostics.is_empty()).then(|| Interpreter::run(program));
        debug!(
            program = program.display_name(),
            violations = diagnostics.len(),
            "checked"
        );
        CheckOutcome {
            name: program.display_name().to_string(),
            diagnostics,
            evaluation,
        }
    }

    /// Checks independent programs on scoped worker threads.
    ///
    /// Outcomes come back in input order.
    pub fn check_batch(&self, programs: &[Program]) -> Vec<CheckOutcome> {
        if programs.is_empty() {
            return Vec::new();
        }
        let workers = std::thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(programs.len());
        let chunk_size = programs.len().div_ceil(workers);
        info!(programs = programs.len(), workers, "checking batch");

        std::thread::scope(|scope| {
            let handles: Vec<_> = programs
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|program| self.check(program))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }
}

/// Checks one program without evaluating it
pub fn check_program(program: &Program, config: &CheckerConfig) -> CheckOutcome {
    Session::new(config.clone()).check(program)
}

/// Checks many programs in parallel without evaluating them
pub fn check_batch(programs: &[Program], config: &CheckerConfig) -> Vec<CheckOutcome> {
    Session::new(config.clone()).check_batch(programs)
}
