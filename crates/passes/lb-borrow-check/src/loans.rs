//! Borrow state tracking for bindings.

use derive_more::Display;
use lb_program::RefKind;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::trace;

use crate::entity::{BindingId, ReferenceId};

/// Kind of borrow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum BorrowKind {
    /// Shared borrow (`&T`).
    ///
    /// Any number of shared borrows can coexist. The owner can still read
    /// the binding but not write it.
    #[display("shared")]
    Shared,

    /// Exclusive borrow (`&mut T`).
    ///
    /// Only one exclusive borrow can exist at a time, and the owner cannot
    /// access the binding at all while it is active.
    #[display("exclusive")]
    Exclusive,
}

impl BorrowKind {
    /// Returns `true` if this is an exclusive borrow.
    #[must_use]
    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::Exclusive)
    }

    /// Phrase describing a binding currently held under this kind
    pub fn held_phrase(self) -> &'static str {
        match self {
            Self::Shared => "borrowed as shared",
            Self::Exclusive => "exclusively borrowed",
        }
    }
}

impl From<RefKind> for BorrowKind {
    fn from(kind: RefKind) -> Self {
        match kind {
            RefKind::Shared => Self::Shared,
            RefKind::Exclusive => Self::Exclusive,
        }
    }
}

/// Who holds a borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holder {
    /// A named reference
    Reference(ReferenceId),
    /// The anonymous borrow a read takes for the duration of one statement
    Transient,
}

impl Holder {
    pub fn reference(self) -> Option<ReferenceId> {
        match self {
            Self::Reference(id) => Some(id),
            Self::Transient => None,
        }
    }
}

/// Borrow state of a single binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BorrowState {
    /// No live borrows
    #[default]
    Free,
    /// One or more shared borrows, in acquisition order
    SharedBy(Vec<Holder>),
    /// A single exclusive borrow
    ExclusiveBy(Holder),
}

static FREE: BorrowState = BorrowState::Free;

impl BorrowState {
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }

    /// Kind of the outstanding borrows, `None` when free
    pub fn kind(&self) -> Option<BorrowKind> {
        match self {
            Self::Free => None,
            Self::SharedBy(_) => Some(BorrowKind::Shared),
            Self::ExclusiveBy(_) => Some(BorrowKind::Exclusive),
        }
    }

    /// Current holders in acquisition order
    pub fn holders(&self) -> Vec<Holder> {
        match self {
            Self::Free => Vec::new(),
            Self::SharedBy(holders) => holders.clone(),
            Self::ExclusiveBy(holder) => vec![*holder],
        }
    }
}

/// A rejected acquisition.
///
/// The table is left exactly as it was before the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// What was asked for
    pub requested: BorrowKind,
    /// What is currently held
    pub held: BorrowKind,
    /// Who holds it
    pub holders: Vec<Holder>,
}

impl Conflict {
    fn against(requested: BorrowKind, state: &BorrowState) -> Self {
        Self {
            requested,
            held: state.kind().unwrap_or(BorrowKind::Shared),
            holders: state.holders(),
        }
    }
}

/// Per-binding borrow states.
///
/// Transitions:
///
/// | state          | `acquire_shared` | `acquire_exclusive` |
/// |----------------|------------------|---------------------|
/// | `Free`         | `SharedBy`       | `ExclusiveBy`       |
/// | `SharedBy`     | `SharedBy`       | conflict            |
/// | `ExclusiveBy`  | conflict         | conflict            |
///
/// Releasing the last holder returns a binding to `Free`.
#[derive(Debug, Clone, Default)]
pub struct BorrowTable {
    states: FxHashMap<BindingId, BorrowState>,
}

impl BorrowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a binding in the `Free` state
    pub fn register(&mut self, binding: BindingId) {
        self.states.insert(binding, BorrowState::Free);
    }

    /// Stops tracking a binding, returning its final state
    pub fn remove(&mut self, binding: BindingId) -> Option<BorrowState> {
        self.states.remove(&binding)
    }

    /// Current state; untracked bindings are `Free`
    pub fn current_state(&self, binding: BindingId) -> &BorrowState {
        self.states.get(&binding).unwrap_or(&FREE)
    }

    pub fn acquire_shared(&mut self, binding: BindingId, holder: Holder) -> Result<(), Conflict> {
        let state = self.states.entry(binding).or_default();
        match state {
            BorrowState::Free => *state = BorrowState::SharedBy(vec![holder]),
            BorrowState::SharedBy(holders) => {
                if !holders.contains(&holder) {
                    holders.push(holder);
                }
            }
            BorrowState::ExclusiveBy(_) => {
                return Err(Conflict::against(BorrowKind::Shared, state));
            }
        }
        trace!(?binding, ?holder, state = ?self.current_state(binding), "acquired shared");
        Ok(())
    }

    pub fn acquire_exclusive(
        &mut self,
        binding: BindingId,
        holder: Holder,
    ) -> Result<(), Conflict> {
        let state = self.states.entry(binding).or_default();
        if !state.is_free() {
            return Err(Conflict::against(BorrowKind::Exclusive, state));
        }
        *state = BorrowState::ExclusiveBy(holder);
        trace!(?binding, ?holder, "acquired exclusive");
        Ok(())
    }

    /// Acquires a borrow of the given kind
    pub fn acquire(
        &mut self,
        binding: BindingId,
        holder: Holder,
        kind: BorrowKind,
    ) -> Result<(), Conflict> {
        match kind {
            BorrowKind::Shared => self.acquire_shared(binding, holder),
            BorrowKind::Exclusive => self.acquire_exclusive(binding, holder),
        }
    }

    /// Removes `holder` from the binding's borrows.
    ///
    /// Returns `false` if it held nothing.
    pub fn release(&mut self, binding: BindingId, holder: Holder) -> bool {
        let Some(state) = self.states.get_mut(&binding) else {
            return false;
        };
        let released = match state {
            BorrowState::Free => false,
            BorrowState::SharedBy(holders) => {
                let before = holders.len();
                holders.retain(|held| *held != holder);
                let released = holders.len() != before;
                if holders.is_empty() {
                    *state = BorrowState::Free;
                }
                released
            }
            BorrowState::ExclusiveBy(held) => {
                if *held == holder {
                    *state = BorrowState::Free;
                    true
                } else {
                    false
                }
            }
        };
        if released {
            trace!(?binding, ?holder, state = ?state, "released");
        }
        released
    }

    /// References currently borrowing `binding`
    pub fn live_references(&self, binding: BindingId) -> Vec<ReferenceId> {
        self.current_state(binding)
            .holders()
            .into_iter()
            .filter_map(Holder::reference)
            .collect()
    }
}
