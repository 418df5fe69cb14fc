//! Main borrow checking implementation.

use la_arena::Arena;
use lb_intern::Interner;
use lb_program::{AccessPath, Expr, Program, StmtKind};
use lb_span::Position;
use tracing::{debug, trace};

use crate::{
    config::{BorrowMode, CheckerConfig},
    entity::{Binding, BindingId, RefStatus, Reference, ReferenceId},
    error::{AccessKind, BorrowError, BorrowResult},
    loans::{BorrowKind, BorrowTable, Conflict, Holder},
    report::DiagnosticReporter,
    scope::{Entity, ScopeTracker},
};

/// Main borrow checker.
///
/// Walks the statements once, front to back. Each analysis owns its scope
/// tracker and borrow table, so checkers for different programs never share
/// state.
pub struct BorrowChecker<'p> {
    /// The program being checked
    program: &'p Program,

    interner: Interner,
    scopes: ScopeTracker,
    loans: BorrowTable,
    bindings: Arena<Binding>,
    references: Arena<Reference>,

    /// Accumulated errors
    reporter: DiagnosticReporter,
}

impl<'p> BorrowChecker<'p> {
    fn new(program: &'p Program) -> Self {
        Self {
            program,
            interner: Interner::new(),
            scopes: ScopeTracker::new(),
            loans: BorrowTable::new(),
            bindings: Arena::default(),
            references: Arena::default(),
            reporter: DiagnosticReporter::new(),
        }
    }

    /// Runs borrow checking on a program.
    ///
    /// # Errors
    ///
    /// Returns every violation found, in program order. If there are none,
    /// returns `Ok(())`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lb_borrow_check::{BorrowChecker, CheckerConfig, ViolationKind};
    /// use lb_program::{Expr, ProgramBuilder};
    ///
    /// let program = ProgramBuilder::new()
    ///     .binding_mut("a", 5)
    ///     .exclusive_ref("foo", "a")
    ///     .assign("a", Expr::add(Expr::var("a"), Expr::int(1)))
    ///     .build();
    ///
    /// let errors = BorrowChecker::check(&program, &CheckerConfig::default()).unwrap_err();
    /// assert_eq!(errors.len(), 1);
    /// assert_eq!(errors[0].kind(), ViolationKind::OwnerAccessWhileBorrowed);
    /// ```
    pub fn check(program: &'p Program, config: &CheckerConfig) -> BorrowResult<()> {
        let errors = Self::analyze(program, config);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Like [`BorrowChecker::check`], returning the diagnostics directly.
    pub fn analyze(program: &'p Program, config: &CheckerConfig) -> Vec<BorrowError> {
        if config.mode != BorrowMode::Lexical {
            debug!(mode = %config.mode, "rejecting unsupported borrow mode");
            return vec![BorrowError::UnsupportedMode { mode: config.mode }];
        }

        if let Err(errors) = program.validate() {
            debug!(count = errors.len(), "program failed validation");
            return errors
                .into_iter()
                .map(|error| BorrowError::MalformedProgram {
                    position: program.position(error.index()),
                    error,
                })
                .collect();
        }

        let mut checker = Self::new(program);
        checker.check_program();
        checker.reporter.finish()
    }

    fn check_program(&mut self) {
        let program = self.program;
        debug!(
            program = program.display_name(),
            statements = program.len(),
            "borrow checking"
        );

        for (index, stmt) in program.statements.iter().enumerate() {
            let position = Position::statement(index, stmt.span);
            debug!(index, statement = %stmt.kind, depth = self.scopes.depth(), "statement");
            self.check_statement(&stmt.kind, position);
        }

        // The implicit root scope, and anything left open, closes here
        let end = Position::end_of_program(program.len());
        for entity in self.scopes.finish() {
            self.destroy(entity, end);
        }
    }

    fn check_statement(&mut self, stmt: &StmtKind, position: Position) {
        match stmt {
            StmtKind::DeclareBinding {
                name,
                mutable,
                init,
                ..
            } => {
                // The initializer reads the names visible before this one
                if let Some(init) = init {
                    self.check_expr_reads(init, None, position);
                }
                let binding = Binding {
                    name: self.interner.intern(name),
                    mutable: *mutable,
                };
                let id = self.bindings.alloc(binding);
                self.loans.register(id);
                self.declare(name, Entity::Binding(id));
            }

            StmtKind::DeclareReference {
                name,
                kind,
                mutable,
                target,
            } => {
                // The target resolves before the new name is visible
                let Some(target) = self.lookup_binding(target) else {
                    return;
                };
                let reference = Reference {
                    name: self.interner.intern(name),
                    kind: BorrowKind::from(*kind),
                    mutable: *mutable,
                    target,
                    status: RefStatus::Live,
                };
                let id = self.references.alloc(reference);
                self.acquire(id, position);
                self.declare(name, Entity::Reference(id));
            }

            StmtKind::RebindReference { name, target } => {
                let (Some(reference), Some(target)) =
                    (self.lookup_reference(name), self.lookup_binding(target))
                else {
                    return;
                };
                self.rebind(reference, target, position);
            }

            StmtKind::AssignBinding { name, value } => {
                let Some(binding) = self.lookup_binding(name) else {
                    return;
                };
                // The write check below covers reads of the target itself
                self.check_expr_reads(value, Some(binding), position);
                self.check_owner_access(binding, AccessKind::Write, position);
                if !self.bindings[binding].mutable {
                    self.reporter.report(BorrowError::ImmutableOwnerAssignment {
                        name: name.clone(),
                        position,
                    });
                }
            }

            StmtKind::ReadBinding { name } => {
                if let Some(binding) = self.lookup_binding(name) {
                    self.check_owner_access(binding, AccessKind::Read, position);
                }
            }

            StmtKind::AssignThroughReference { reference, value } => {
                self.check_expr_reads(value, None, position);
                if let Some(reference) = self.lookup_reference(reference) {
                    self.write_through(reference);
                }
            }

            StmtKind::ReadThroughReference { path } => match path {
                AccessPath::Deref(name) => self.deref_read(name),
                AccessPath::Borrow(name) => {
                    if let Some(binding) = self.lookup_binding(name) {
                        self.transient_read(binding, position);
                    }
                }
            },

            StmtKind::EnterScope => self.scopes.enter(),

            StmtKind::ExitScope => {
                if let Some(entities) = self.scopes.exit() {
                    for entity in entities {
                        self.destroy(entity, position);
                    }
                }
            }
        }
    }

    fn declare(&mut self, name: &str, entity: Entity) {
        let symbol = self.interner.intern(name);
        if let Some(Entity::Reference(shadowed)) = self.scopes.declare(symbol, entity) {
            // Shadowing in the same frame ends the old reference's window
            trace!(reference = name, "shadowed reference ends");
            self.end_reference(shadowed);
        }
    }

    fn lookup(&self, name: &str) -> Option<Entity> {
        self.scopes.lookup(self.interner.get(name)?)
    }

    fn lookup_binding(&self, name: &str) -> Option<BindingId> {
        match self.lookup(name)? {
            Entity::Binding(id) => Some(id),
            Entity::Reference(_) => None,
        }
    }

    fn lookup_reference(&self, name: &str) -> Option<ReferenceId> {
        match self.lookup(name)? {
            Entity::Reference(id) => Some(id),
            Entity::Binding(_) => None,
        }
    }

    fn binding_name(&self, binding: BindingId) -> String {
        self.interner.resolve(&self.bindings[binding].name)
    }

    fn reference_name(&self, reference: ReferenceId) -> String {
        self.interner.resolve(&self.references[reference].name)
    }

    fn holder_names(&self, holders: &[Holder]) -> Vec<String> {
        holders
            .iter()
            .filter_map(|holder| holder.reference())
            .map(|reference| self.reference_name(reference))
            .collect()
    }

    /// Acquires the borrow a reference's declaration or rebind asks for
    fn acquire(&mut self, reference: ReferenceId, position: Position) {
        let Reference { kind, target, .. } = self.references[reference];
        match self.loans.acquire(target, Holder::Reference(reference), kind) {
            Ok(()) => {
                self.references[reference].status = RefStatus::Live;
            }
            Err(conflict) => {
                self.references[reference].status = RefStatus::Rejected;
                self.report_conflict(target, Some(reference), &conflict, position);
            }
        }
    }

    fn rebind(&mut self, reference: ReferenceId, target: BindingId, position: Position) {
        if !self.references[reference].mutable {
            self.reporter.report(BorrowError::ImmutableOwnerAssignment {
                name: self.reference_name(reference),
                position,
            });
            return;
        }

        // Release the old window before opening the new one
        let old = self.references[reference].target;
        if self.references[reference].holds_loan() {
            self.loans.release(old, Holder::Reference(reference));
        }
        self.references[reference].target = target;
        trace!(from = ?old, to = ?target, "rebind");
        self.acquire(reference, position);
    }

    fn check_owner_access(&mut self, binding: BindingId, access: AccessKind, position: Position) {
        let state = self.loans.current_state(binding);
        let Some(held) = state.kind() else {
            return;
        };
        if access == AccessKind::Read && held == BorrowKind::Shared {
            return;
        }
        let holders = self.holder_names(&state.holders());
        self.reporter.report(BorrowError::OwnerAccessWhileBorrowed {
            binding: self.binding_name(binding),
            access,
            held,
            holders,
            position,
        });
    }

    /// Every name an expression reads, checked as an owner read or a deref
    fn check_expr_reads(&mut self, expr: &Expr, target: Option<BindingId>, position: Position) {
        let mut names = Vec::new();
        expr.for_each_name(&mut |name, deref| names.push((name.to_string(), deref)));
        for (name, deref) in names {
            if deref {
                self.deref_read(&name);
            } else if let Some(binding) = self
                .lookup_binding(&name)
                .filter(|binding| Some(*binding) != target)
            {
                self.check_owner_access(binding, AccessKind::Read, position);
            }
        }
    }

    /// Any reference may be read through; rejected and dangling ones were
    /// reported when they lost their loan
    fn deref_read(&self, name: &str) {
        if let Some(reference) = self.lookup_reference(name) {
            trace!(reference = name, status = ?self.references[reference].status, "deref read");
        }
    }

    /// A live reference that can be written through always holds the sole
    /// exclusive loan of its target. Validation rejects shared writers.
    fn write_through(&self, reference: ReferenceId) {
        let Reference {
            kind, status, target, ..
        } = self.references[reference];
        trace!(reference = %self.reference_name(reference), ?status, "write through");
        if status == RefStatus::Live {
            debug_assert_eq!(kind, BorrowKind::Exclusive);
            debug_assert_eq!(
                self.loans.current_state(target).holders(),
                [Holder::Reference(reference)]
            );
        }
    }

    /// A read through `&binding`: acquire shared, then release at once
    fn transient_read(&mut self, binding: BindingId, position: Position) {
        match self.loans.acquire_shared(binding, Holder::Transient) {
            Ok(()) => {
                self.loans.release(binding, Holder::Transient);
            }
            Err(conflict) => self.report_conflict(binding, None, &conflict, position),
        }
    }

    fn report_conflict(
        &mut self,
        binding: BindingId,
        reference: Option<ReferenceId>,
        conflict: &Conflict,
        position: Position,
    ) {
        self.reporter.report(BorrowError::ExclusivityViolation {
            binding: self.binding_name(binding),
            requested: conflict.requested,
            reference: reference.map(|reference| self.reference_name(reference)),
            held: conflict.held,
            holders: self.holder_names(&conflict.holders),
            position,
        });
    }

    /// Ends a reference's liveness window, releasing any borrow it holds
    fn end_reference(&mut self, reference: ReferenceId) {
        let Reference { status, target, .. } = self.references[reference];
        if status == RefStatus::Live {
            self.loans.release(target, Holder::Reference(reference));
        }
        self.references[reference].status = RefStatus::Ended;
    }

    fn destroy(&mut self, entity: Entity, position: Position) {
        match entity {
            Entity::Reference(reference) => {
                debug!(reference = %self.reference_name(reference), %position, "drop reference");
                self.end_reference(reference);
            }
            Entity::Binding(binding) => {
                debug!(binding = %self.binding_name(binding), %position, "drop binding");
                let live = self.loans.live_references(binding);
                if !live.is_empty() {
                    let references = live
                        .iter()
                        .map(|reference| self.reference_name(*reference))
                        .collect();
                    self.reporter.report(BorrowError::DanglingReferentViolation {
                        binding: self.binding_name(binding),
                        references,
                        position,
                    });
                    for reference in live {
                        self.references[reference].status = RefStatus::Dangling;
                    }
                }
                self.loans.remove(binding);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;
    use lb_program::{Expr, ProgramBuilder};

    fn kinds(program: &Program) -> Vec<ViolationKind> {
        BorrowChecker::analyze(program, &CheckerConfig::default())
            .iter()
            .map(BorrowError::kind)
            .collect()
    }

    fn bump(name: &str) -> Expr {
        Expr::add(Expr::var(name), Expr::int(1))
    }

    #[test]
    fn empty_program_is_clean() {
        assert_eq!(BorrowChecker::check(&Program::default(), &CheckerConfig::default()), Ok(()));
    }

    #[test]
    fn owner_write_blocked_by_exclusive_reference() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 5)
            .exclusive_ref("foo", "a")
            .assign("a", bump("a"))
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(
            errors,
            vec![BorrowError::OwnerAccessWhileBorrowed {
                binding: "a".to_string(),
                access: AccessKind::Write,
                held: BorrowKind::Exclusive,
                holders: vec!["foo".to_string()],
                position: Position::statement(2, None),
            }]
        );
    }

    #[test]
    fn owner_write_allowed_after_scope_ends() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 5)
            .enter()
            .shared_ref("foo", "a")
            .exit()
            .assign("a", bump("a"))
            .build();
        assert!(kinds(&program).is_empty());
    }

    #[test]
    fn shared_reference_permits_reads_not_writes() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .shared_ref("r", "a")
            .shared_ref("s", "a")
            .read("a")
            .read_borrowed("a")
            .read_deref("r")
            .assign("a", Expr::int(2))
            .exclusive_ref("w", "a")
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            &errors[0],
            BorrowError::OwnerAccessWhileBorrowed { access: AccessKind::Write, held: BorrowKind::Shared, holders, .. }
                if holders == &["r".to_string(), "s".to_string()]
        ));
        assert!(matches!(
            &errors[1],
            BorrowError::ExclusivityViolation { requested: BorrowKind::Exclusive, reference: Some(name), .. }
                if name == "w"
        ));
    }

    #[test]
    fn exclusive_reference_blocks_everything_else() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .exclusive_ref("foo", "a")
            .shared_ref("r", "a")
            .exclusive_ref("w", "a")
            .read("a")
            .read_borrowed("a")
            .read_deref("foo")
            .build();
        assert_eq!(
            kinds(&program),
            vec![
                ViolationKind::ExclusivityViolation,
                ViolationKind::ExclusivityViolation,
                ViolationKind::OwnerAccessWhileBorrowed,
                ViolationKind::ExclusivityViolation,
            ]
        );
    }

    #[test]
    fn rejected_reference_is_not_reported_again() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .shared_ref("r", "a")
            .exclusive_ref("w", "a")
            .assign_through("w", Expr::int(5))
            .build();
        assert_eq!(kinds(&program), vec![ViolationKind::ExclusivityViolation]);
    }

    #[test]
    fn immutable_owner_assignment_is_independent_of_borrows() {
        let program = ProgramBuilder::new()
            .binding("a", 1)
            .assign("a", Expr::int(2))
            .shared_ref("r", "a")
            .assign("a", Expr::int(3))
            .build();
        assert_eq!(
            kinds(&program),
            vec![
                ViolationKind::ImmutableOwnerAssignment,
                ViolationKind::OwnerAccessWhileBorrowed,
                ViolationKind::ImmutableOwnerAssignment,
            ]
        );
    }

    #[test]
    fn rebinding_immutable_reference_keeps_old_borrow() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .binding_mut("b", 2)
            .exclusive_ref("foo", "a")
            .rebind("foo", "b")
            .assign("b", Expr::int(3))
            .assign("a", Expr::int(4))
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], BorrowError::ImmutableOwnerAssignment { name, .. } if name == "foo"));
        assert!(matches!(&errors[1], BorrowError::OwnerAccessWhileBorrowed { binding, .. } if binding == "a"));
    }

    #[test]
    fn rebind_moves_the_borrow() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .binding_mut("b", 2)
            .reference("foo", lb_program::RefKind::Exclusive, true, "a")
            .rebind("foo", "b")
            .assign("a", Expr::int(3))
            .assign_through("foo", Expr::int(4))
            .build();
        assert!(kinds(&program).is_empty());
    }

    #[test]
    fn conflicting_rebind_is_reported_at_the_rebind() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .binding_mut("b", 2)
            .shared_ref("r", "b")
            .reference("foo", lb_program::RefKind::Exclusive, true, "a")
            .rebind("foo", "b")
            .assign("a", Expr::int(3))
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ViolationKind::ExclusivityViolation);
        assert_eq!(errors[0].position().map(|p| p.index), Some(4));
    }

    #[test]
    fn binding_destroyed_before_its_reference_dangles_once() {
        let program = ProgramBuilder::new()
            .enter()
            .binding_mut("a", 1)
            .reference("r", lb_program::RefKind::Shared, true, "a")
            .reference("s", lb_program::RefKind::Shared, true, "a")
            .binding("b", 2)
            .rebind("r", "b")
            .rebind("s", "b")
            .exit()
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(
            errors,
            vec![BorrowError::DanglingReferentViolation {
                binding: "b".to_string(),
                references: vec!["r".to_string(), "s".to_string()],
                position: Position::statement(7, None),
            }]
        );
    }

    #[test]
    fn open_scopes_close_at_end_of_program() {
        // `r` is declared before the binding it ends up pointing at, and the
        // inner scope is never closed explicitly
        let program = ProgramBuilder::new()
            .binding("a", 1)
            .reference("r", lb_program::RefKind::Shared, true, "a")
            .enter()
            .binding("b", 2)
            .rebind("r", "b")
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].position(),
            Some(&Position::end_of_program(program.len()))
        );
    }

    #[test]
    fn same_frame_shadowing_releases_reference() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .binding_mut("b", 1)
            .exclusive_ref("foo", "a")
            .exclusive_ref("foo", "b")
            .assign("a", Expr::int(2))
            .build();
        assert!(kinds(&program).is_empty());
    }

    #[test]
    fn inner_frame_shadowing_keeps_outer_reference() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .binding_mut("b", 1)
            .exclusive_ref("foo", "a")
            .enter()
            .exclusive_ref("foo", "b")
            .exit()
            .assign("a", Expr::int(2))
            .build();
        assert_eq!(kinds(&program), vec![ViolationKind::OwnerAccessWhileBorrowed]);
    }

    #[test]
    fn expression_reads_are_owner_reads() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .binding_mut("c", 0)
            .exclusive_ref("foo", "a")
            .binding_with("b", false, Expr::var("a"))
            .assign("c", bump("a"))
            .assign_through("foo", Expr::add(Expr::deref("foo"), Expr::var("c")))
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(
            errors,
            vec![
                BorrowError::OwnerAccessWhileBorrowed {
                    binding: "a".to_string(),
                    access: AccessKind::Read,
                    held: BorrowKind::Exclusive,
                    holders: vec!["foo".to_string()],
                    position: Position::statement(3, None),
                },
                BorrowError::OwnerAccessWhileBorrowed {
                    binding: "a".to_string(),
                    access: AccessKind::Read,
                    held: BorrowKind::Exclusive,
                    holders: vec!["foo".to_string()],
                    position: Position::statement(4, None),
                },
            ]
        );
    }

    #[test]
    fn expression_reads_under_shared_borrow_are_clean() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .binding_mut("c", 0)
            .shared_ref("r", "a")
            .binding_with("b", false, Expr::add(Expr::var("a"), Expr::deref("r")))
            .assign("c", bump("a"))
            .build();
        assert!(kinds(&program).is_empty());
    }

    #[test]
    fn initializer_reads_the_shadowed_binding() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .exclusive_ref("foo", "a")
            .binding_with("a", true, bump("a"))
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ViolationKind::OwnerAccessWhileBorrowed);
        assert_eq!(errors[0].position().map(|p| p.index), Some(2));
    }

    #[test]
    fn writes_through_dangling_reference_are_not_reported_again() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .reference("r", lb_program::RefKind::Exclusive, true, "a")
            .enter()
            .binding_mut("b", 2)
            .rebind("r", "b")
            .assign_through("r", Expr::int(3))
            .exit()
            .assign_through("r", Expr::int(4))
            .build();
        assert_eq!(kinds(&program), vec![ViolationKind::DanglingReferentViolation]);
    }

    #[test]
    fn non_lexical_mode_fails_fast() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .exclusive_ref("foo", "a")
            .assign("a", Expr::int(2))
            .build();
        let errors =
            BorrowChecker::analyze(&program, &CheckerConfig::with_mode(BorrowMode::NonLexical));
        assert_eq!(
            errors,
            vec![BorrowError::UnsupportedMode {
                mode: BorrowMode::NonLexical
            }]
        );
    }

    #[test]
    fn malformed_programs_are_not_analysed() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 1)
            .exclusive_ref("foo", "a")
            .read("missing")
            .assign("a", Expr::int(2))
            .build();
        let errors = BorrowChecker::analyze(&program, &CheckerConfig::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ViolationKind::MalformedProgram);
        assert_eq!(errors[0].position().map(|p| p.index), Some(2));
    }
}
