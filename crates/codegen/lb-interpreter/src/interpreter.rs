//! Statement interpreter

use lb_program::{AccessPath, BinOp, Expr, Program, StmtKind};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::trace::Trace;

/// Interpreter error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    /// Name not visible, or not the kind of entity required
    #[error("statement {index}: cannot resolve `{name}`")]
    UnknownName {
        /// Statement index
        index: usize,
        /// Offending name
        name: String,
    },
    /// Read of a binding declared without a value and never assigned
    #[error("statement {index}: `{name}` is read before it is assigned")]
    UninitializedRead {
        /// Statement index
        index: usize,
        /// Binding name
        name: String,
    },
    /// Arithmetic overflow
    #[error("statement {index}: arithmetic overflow")]
    Overflow {
        /// Statement index
        index: usize,
    },
    /// Access through a reference whose referent is gone
    #[error("statement {index}: `{name}` refers to a destroyed binding")]
    DanglingReference {
        /// Statement index
        index: usize,
        /// Reference name
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Name {
    Binding(usize),
    Reference(usize),
}

#[derive(Debug)]
struct Slot {
    name: String,
    value: Option<i64>,
    alive: bool,
}

#[derive(Debug, Default)]
struct Frame {
    names: FxHashMap<String, Name>,
    slots: Vec<usize>,
}

/// Interpreter state
#[derive(Debug)]
pub struct Interpreter {
    slots: Vec<Slot>,
    /// Target slot of each reference
    targets: Vec<usize>,
    frames: Vec<Frame>,
    trace: Trace,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create a new interpreter
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            targets: Vec::new(),
            frames: vec![Frame::default()],
            trace: Trace::default(),
        }
    }

    /// Runs `program` and returns what its reads observed
    ///
    /// # Errors
    /// Returns `InterpreterError` at the first statement that cannot be evaluated
    pub fn run(program: &Program) -> Result<Trace, InterpreterError> {
        let mut interpreter = Self::new();
        for (index, stmt) in program.statements.iter().enumerate() {
            interpreter.execute(index, &stmt.kind)?;
        }
        Ok(interpreter.trace)
    }

    fn execute(&mut self, index: usize, stmt: &StmtKind) -> Result<(), InterpreterError> {
        match stmt {
            StmtKind::DeclareBinding { name, init, .. } => {
                let value = init
                    .as_ref()
                    .map(|init| self.eval(index, init))
                    .transpose()?;
                let slot = self.slots.len();
                self.slots.push(Slot {
                    name: name.clone(),
                    value,
                    alive: true,
                });
                self.declare(name, Name::Binding(slot));
                if let Some(frame) = self.frames.last_mut() {
                    frame.slots.push(slot);
                }
            }
            StmtKind::DeclareReference { name, target, .. } => {
                let slot = self.binding(index, target)?;
                let reference = self.targets.len();
                self.targets.push(slot);
                self.declare(name, Name::Reference(reference));
            }
            StmtKind::RebindReference { name, target } => {
                let reference = self.reference(index, name)?;
                let slot = self.binding(index, target)?;
                self.targets[reference] = slot;
            }
            StmtKind::AssignBinding { name, value } => {
                let value = self.eval(index, value)?;
                let slot = self.binding(index, name)?;
                self.slots[slot].value = Some(value);
            }
            StmtKind::AssignThroughReference { reference, value } => {
                let value = self.eval(index, value)?;
                let slot = self.deref(index, reference)?;
                self.slots[slot].value = Some(value);
            }
            StmtKind::ReadBinding { name }
            | StmtKind::ReadThroughReference {
                path: AccessPath::Borrow(name),
            } => {
                let value = self.eval(index, &Expr::Var(name.clone()))?;
                self.trace.record(index, name.clone(), value);
            }
            StmtKind::ReadThroughReference {
                path: AccessPath::Deref(name),
            } => {
                let value = self.eval(index, &Expr::Deref(name.clone()))?;
                self.trace.record(index, format!("*{name}"), value);
            }
            StmtKind::EnterScope => self.frames.push(Frame::default()),
            StmtKind::ExitScope => {
                if self.frames.len() > 1 {
                    if let Some(frame) = self.frames.pop() {
                        for slot in frame.slots {
                            self.slots[slot].alive = false;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn declare(&mut self, name: &str, entity: Name) {
        if let Some(frame) = self.frames.last_mut() {
            frame.names.insert(name.to_string(), entity);
        }
    }

    fn lookup(&self, name: &str) -> Option<Name> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.names.get(name).copied())
    }

    fn binding(&self, index: usize, name: &str) -> Result<usize, InterpreterError> {
        match self.lookup(name) {
            Some(Name::Binding(slot)) => Ok(slot),
            _ => Err(InterpreterError::UnknownName {
                index,
                name: name.to_string(),
            }),
        }
    }

    fn reference(&self, index: usize, name: &str) -> Result<usize, InterpreterError> {
        match self.lookup(name) {
            Some(Name::Reference(reference)) => Ok(reference),
            _ => Err(InterpreterError::UnknownName {
                index,
                name: name.to_string(),
            }),
        }
    }

    /// Slot a reference currently points at
    fn deref(&self, index: usize, name: &str) -> Result<usize, InterpreterError> {
        let slot = self.targets[self.reference(index, name)?];
        if self.slots[slot].alive {
            Ok(slot)
        } else {
            Err(InterpreterError::DanglingReference {
                index,
                name: name.to_string(),
            })
        }
    }

    fn load(&self, index: usize, slot: usize) -> Result<i64, InterpreterError> {
        let slot = &self.slots[slot];
        slot.value.ok_or_else(|| InterpreterError::UninitializedRead {
            index,
            name: slot.name.clone(),
        })
    }

    fn eval(&self, index: usize, expr: &Expr) -> Result<i64, InterpreterError> {
        match expr {
            Expr::Int(value) => Ok(*value),
            Expr::Var(name) => self.load(index, self.binding(index, name)?),
            Expr::Deref(name) => self.load(index, self.deref(index, name)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(index, lhs)?;
                let rhs = self.eval(index, rhs)?;
                let result = match op {
                    BinOp::Add => lhs.checked_add(rhs),
                    BinOp::Sub => lhs.checked_sub(rhs),
                    BinOp::Mul => lhs.checked_mul(rhs),
                };
                result.ok_or(InterpreterError::Overflow { index })
            }
        }
    }
}
