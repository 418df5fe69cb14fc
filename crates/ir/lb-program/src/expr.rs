//! Value expressions
//!
//! Every `Var` in an expression is an owner read of that binding and every
//! `Deref` a read through that reference.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
        }
    }
}

/// A value expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Integer literal
    Int(i64),
    /// Read of a binding by name
    Var(String),
    /// Read through a reference (`*name`)
    Deref(String),
    /// Binary arithmetic
    Binary {
        /// Operator
        op: BinOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn deref(reference: impl Into<String>) -> Self {
        Self::Deref(reference.into())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `lhs + rhs`
    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Add, lhs, rhs)
    }

    /// Calls `visit` for every name the expression mentions, tagging whether
    /// the name is dereferenced.
    pub fn for_each_name(&self, visit: &mut impl FnMut(&str, bool)) {
        match self {
            Self::Int(_) => {}
            Self::Var(name) => visit(name, false),
            Self::Deref(name) => visit(name, true),
            Self::Binary { lhs, rhs, .. } => {
                lhs.for_each_name(visit);
                rhs.for_each_name(visit);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Var(name) => write!(f, "{name}"),
            Self::Deref(name) => write!(f, "*{name}"),
            Self::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
        }
    }
}
