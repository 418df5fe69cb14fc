//! Reference evaluator for checked programs
//!
//! Runs a program statement by statement, keeping one integer slot per
//! binding and one target per reference, and records the value seen by every
//! read. It trusts the borrow checker: aliasing is not re-checked here, only
//! conditions that make evaluation itself impossible.

mod interpreter;
mod trace;

pub use interpreter::{Interpreter, InterpreterError};
pub use trace::{Observation, Trace};
