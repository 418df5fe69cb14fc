//! Static well-formedness of programs
//!
//! Validation resolves every identifier lexically and checks that it names
//! the right kind of entity. It does not look at borrow state; that is the
//! borrow checker's job. A program that fails validation is not analysed.

use crate::{AccessPath, Expr, Program, RefKind, StmtKind};
use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;

/// A violation of the program model's static rules
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ProgramError {
    /// Identifier not declared in any enclosing scope
    #[error("cannot find `{name}` in this scope")]
    UnknownName {
        /// Statement index
        index: usize,
        /// The unresolved identifier
        name: String,
        /// Visible names within a small edit distance
        suggestions: Vec<String>,
    },

    /// A reference was required but the name resolves to a binding
    #[error("`{name}` is a binding, not a reference")]
    NotAReference {
        /// Statement index
        index: usize,
        /// The offending identifier
        name: String,
    },

    /// A binding was required but the name resolves to a reference
    #[error("`{name}` is a reference; only bindings can be used here")]
    NotABinding {
        /// Statement index
        index: usize,
        /// The offending identifier
        name: String,
    },

    /// `*r = ...` where `r` is a shared reference
    #[error("cannot assign through `{name}`, which is a shared reference")]
    WriteThroughShared {
        /// Statement index
        index: usize,
        /// The shared reference
        name: String,
    },

    /// `ExitScope` with no open scope to close
    #[error("scope exit without a matching scope entry")]
    UnbalancedScope {
        /// Statement index
        index: usize,
    },

    /// Blank identifier
    #[error("identifiers must not be empty")]
    EmptyIdentifier {
        /// Statement index
        index: usize,
    },
}

impl ProgramError {
    /// Statement index the error refers to
    pub fn index(&self) -> usize {
        match self {
            Self::UnknownName { index, .. }
            | Self::NotAReference { index, .. }
            | Self::NotABinding { index, .. }
            | Self::WriteThroughShared { index, .. }
            | Self::UnbalancedScope { index }
            | Self::EmptyIdentifier { index } => *index,
        }
    }

    /// Identifier the error is about, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::UnknownName { name, .. }
            | Self::NotAReference { name, .. }
            | Self::NotABinding { name, .. }
            | Self::WriteThroughShared { name, .. } => Some(name),
            Self::UnbalancedScope { .. } | Self::EmptyIdentifier { .. } => None,
        }
    }
}

/// What a name resolves to during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declared {
    Binding,
    Reference(RefKind),
}

/// What a use site needs the name to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Binding,
    Reference,
}

struct Validator {
    frames: Vec<FxHashMap<String, Declared>>,
    errors: Vec<ProgramError>,
}

impl Validator {
    fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
            errors: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<Declared> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    fn declare(&mut self, index: usize, name: &str, declared: Declared) {
        if name.trim().is_empty() {
            self.errors.push(ProgramError::EmptyIdentifier { index });
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), declared);
        }
    }

    /// Resolves `name` and checks it has the expected kind
    fn resolve(&mut self, index: usize, name: &str, expect: Expect) -> Option<Declared> {
        if name.trim().is_empty() {
            self.errors.push(ProgramError::EmptyIdentifier { index });
            return None;
        }
        let Some(declared) = self.lookup(name) else {
            let suggestions = self.suggestions(name);
            self.errors.push(ProgramError::UnknownName {
                index,
                name: name.to_string(),
                suggestions,
            });
            return None;
        };
        match (expect, declared) {
            (Expect::Binding, Declared::Reference(_)) => {
                self.errors.push(ProgramError::NotABinding {
                    index,
                    name: name.to_string(),
                });
                None
            }
            (Expect::Reference, Declared::Binding) => {
                self.errors.push(ProgramError::NotAReference {
                    index,
                    name: name.to_string(),
                });
                None
            }
            _ => Some(declared),
        }
    }

    fn expr(&mut self, index: usize, expr: &Expr) {
        let mut uses = Vec::new();
        expr.for_each_name(&mut |name, deref| uses.push((name.to_string(), deref)));
        for (name, deref) in uses {
            let expect = if deref {
                Expect::Reference
            } else {
                Expect::Binding
            };
            self.resolve(index, &name, expect);
        }
    }

    fn suggestions(&self, name: &str) -> Vec<String> {
        let mut candidates: Vec<(&String, usize)> = self
            .frames
            .iter()
            .flat_map(FxHashMap::keys)
            .map(|candidate| (candidate, edit_distance(name, candidate)))
            .filter(|(_, distance)| *distance <= 2)
            .collect();
        candidates.sort_by(|left, right| left.1.cmp(&right.1).then_with(|| left.0.cmp(right.0)));
        candidates.dedup_by(|left, right| left.0 == right.0);
        candidates
            .into_iter()
            .take(3)
            .map(|(candidate, _)| candidate.clone())
            .collect()
    }

    fn statement(&mut self, index: usize, kind: &StmtKind) {
        match kind {
            StmtKind::DeclareBinding { name, init, .. } => {
                if let Some(init) = init {
                    self.expr(index, init);
                }
                self.declare(index, name, Declared::Binding);
            }
            StmtKind::DeclareReference {
                name, kind, target, ..
            } => {
                self.resolve(index, target, Expect::Binding);
                self.declare(index, name, Declared::Reference(*kind));
            }
            StmtKind::RebindReference { name, target } => {
                self.resolve(index, name, Expect::Reference);
                self.resolve(index, target, Expect::Binding);
            }
            StmtKind::AssignBinding { name, value } => {
                self.expr(index, value);
                self.resolve(index, name, Expect::Binding);
            }
            StmtKind::AssignThroughReference { reference, value } => {
                self.expr(index, value);
                if let Some(Declared::Reference(RefKind::Shared)) =
                    self.resolve(index, reference, Expect::Reference)
                {
                    self.errors.push(ProgramError::WriteThroughShared {
                        index,
                        name: reference.clone(),
                    });
                }
            }
            StmtKind::ReadBinding { name } => {
                self.resolve(index, name, Expect::Binding);
            }
            StmtKind::ReadThroughReference { path } => match path {
                AccessPath::Deref(name) => {
                    self.resolve(index, name, Expect::Reference);
                }
                AccessPath::Borrow(name) => {
                    self.resolve(index, name, Expect::Binding);
                }
            },
            StmtKind::EnterScope => self.frames.push(FxHashMap::default()),
            StmtKind::ExitScope => {
                if self.frames.len() > 1 {
                    self.frames.pop();
                } else {
                    self.errors.push(ProgramError::UnbalancedScope { index });
                }
            }
        }
    }
}

impl Program {
    /// Checks the program against the model's static rules.
    ///
    /// Returns every problem found, in statement order.
    pub fn validate(&self) -> Result<(), Vec<ProgramError>> {
        let mut validator = Validator::new();
        for (index, stmt) in self.statements.iter().enumerate() {
            validator.statement(index, &stmt.kind);
        }
        if validator.errors.is_empty() {
            Ok(())
        } else {
            Err(validator.errors)
        }
    }
}

/// Levenshtein distance over chars
fn edit_distance(source: &str, target: &str) -> usize {
    let target: Vec<char> = target.chars().collect();
    let mut previous: Vec<usize> = (0..=target.len()).collect();
    let mut current = vec![0; target.len() + 1];

    for (row, source_char) in source.chars().enumerate() {
        current[0] = row + 1;
        for (col, target_char) in target.iter().enumerate() {
            let cost = usize::from(source_char != *target_char);
            current[col + 1] = (previous[col + 1] + 1)
                .min(current[col] + 1)
                .min(previous[col] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[target.len()]
}
