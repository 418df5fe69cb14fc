//! Bindings and references tracked during a single analysis.

use la_arena::Idx;
use lb_intern::Symbol;

use crate::loans::BorrowKind;

/// ID of a binding within one analysis
pub type BindingId = Idx<Binding>;

/// ID of a reference within one analysis
pub type ReferenceId = Idx<Reference>;

/// A named storage location
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: Symbol,
    /// Whether the owner may reassign it
    pub mutable: bool,
}

/// Where a reference is in its liveness window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefStatus {
    /// Holds a borrow of its target
    Live,
    /// Its last acquisition was rejected; holds nothing
    Rejected,
    /// Its target was destroyed underneath it; holds nothing
    Dangling,
    /// Destroyed or shadowed
    Ended,
}

/// A named alias of exactly one binding
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: Symbol,
    pub kind: BorrowKind,
    /// Whether the reference variable may be rebound
    pub mutable: bool,
    pub target: BindingId,
    pub status: RefStatus,
}

impl Reference {
    /// Whether the reference currently holds a borrow in the table
    pub fn holds_loan(&self) -> bool {
        self.status == RefStatus::Live
    }
}
