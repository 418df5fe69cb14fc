//! Lexical borrow checker.
//!
//! This crate decides whether every reference in a [`Program`] respects
//! three rules:
//!
//! 1. A live shared reference makes its referent read-only for everyone,
//!    the owner included
//! 2. A live exclusive reference makes its referent inaccessible to
//!    everyone else, the owner included
//! 3. No reference may be live after its referent is destroyed
//!
//! # Architecture
//!
//! - [`BorrowChecker`]: single forward pass over the statements
//! - [`ScopeTracker`]: stack of lexical frames, fixes drop order
//! - [`BorrowTable`]: per-binding [`BorrowState`] machine
//! - [`DiagnosticReporter`]: collects [`BorrowError`]s in program order
//!
//! # Limitations
//!
//! Lifetimes are strictly lexical: a reference is live from its
//! declaration to the end of its scope, whether or not it is used again.
//! [`BorrowMode::NonLexical`] is recognised but rejected.
//!
//! # Examples
//!
//! ```rust
//! use lb_borrow_check::{BorrowChecker, CheckerConfig};
//! use lb_program::{Expr, ProgramBuilder};
//!
//! let program = ProgramBuilder::new()
//!     .binding_mut("a", 5)
//!     .enter()
//!     .shared_ref("foo", "a")
//!     .exit()
//!     .assign("a", Expr::add(Expr::var("a"), Expr::int(1)))
//!     .build();
//!
//! assert!(BorrowChecker::check(&program, &CheckerConfig::default()).is_ok());
//! ```
//!
//! [`Program`]: lb_program::Program

mod checker;
mod config;
mod entity;
mod error;
mod loans;
mod report;
mod scope;

pub use checker::BorrowChecker;
pub use config::{BorrowMode, CheckerConfig};
pub use entity::{Binding, BindingId, RefStatus, Reference, ReferenceId};
pub use error::{AccessKind, BorrowError, BorrowResult, ViolationKind};
pub use loans::{BorrowKind, BorrowState, BorrowTable, Conflict, Holder};
pub use report::{DiagnosticReporter, render_graphical, render_text};
pub use scope::{Entity, ScopeTracker};
