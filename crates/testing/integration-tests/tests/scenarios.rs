//! End-to-end checks of the fixture programs through the driver

use integration_tests::{check_fixture, kinds};
use lb_borrow_check::{AccessKind, BorrowError, BorrowKind, CheckerConfig, ViolationKind};
use lb_driver::Session;
use lb_program::{Expr, ProgramBuilder, RefKind};
use lb_span::Position;

#[test]
fn test_owner_write_while_exclusively_borrowed() {
    let (_, outcome) = check_fixture("01-owner-write-while-exclusive.json").unwrap();

    assert_eq!(kinds(&outcome), vec![ViolationKind::OwnerAccessWhileBorrowed]);
    let BorrowError::OwnerAccessWhileBorrowed {
        binding,
        access,
        held,
        holders,
        position,
    } = &outcome.diagnostics[0]
    else {
        panic!("unexpected diagnostic {:?}", outcome.diagnostics[0]);
    };
    assert_eq!(binding, "a");
    assert_eq!(*access, AccessKind::Write);
    assert_eq!(*held, BorrowKind::Exclusive);
    assert_eq!(holders, &["foo".to_string()]);
    assert_eq!(position.index, 2);
    assert!(outcome.evaluation.is_none());
}

#[test]
fn test_shared_borrow_ends_with_its_scope() {
    let (_, outcome) = check_fixture("02-shared-borrow-scoped.json").unwrap();

    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    let trace = outcome.evaluation.unwrap().unwrap();
    assert_eq!(trace.last_observed("*foo"), Some(5));
    assert_eq!(trace.last_observed("a"), Some(6));
}

#[test]
fn test_referent_declared_after_reference_dangles() {
    let (_, outcome) = check_fixture("03-referent-declared-after-reference.json").unwrap();

    // The owner read of `b` meets the still-live `foo`, and `b` is then
    // destroyed before `foo` when the root scope closes
    assert_eq!(
        kinds(&outcome),
        vec![
            ViolationKind::OwnerAccessWhileBorrowed,
            ViolationKind::DanglingReferentViolation,
        ]
    );
    let dangling = &outcome.diagnostics[1];
    assert_eq!(dangling.identifiers(), vec!["b", "foo"]);
    assert!(dangling.position().unwrap().end_of_program);
}

#[test]
fn test_referent_declared_before_reference_is_clean() {
    let (_, outcome) = check_fixture("04-referent-declared-before-reference.toml").unwrap();

    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    let trace = outcome.evaluation.unwrap().unwrap();
    assert_eq!(trace.last_observed("b"), Some(100));
}

#[test]
fn test_referent_declared_before_reference_without_block() {
    // Same program with `foo` in the root scope, read through `foo` instead
    // of by the owner: `foo` is destroyed before `b`, so nothing dangles
    let program = ProgramBuilder::new()
        .binding("a", 5)
        .binding_mut("b", 6)
        .reference("foo", RefKind::Exclusive, true, "a")
        .rebind("foo", "b")
        .assign_through("foo", Expr::int(100))
        .read_deref("foo")
        .build();
    let outcome = Session::new(CheckerConfig::default())
        .with_evaluation(true)
        .check(&program);

    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    let trace = outcome.evaluation.unwrap().unwrap();
    assert_eq!(trace.last_observed("*foo"), Some(100));
}

#[test]
fn test_shared_read_while_exclusively_borrowed() {
    let (_, outcome) = check_fixture("05-shared-read-while-exclusive.json").unwrap();

    assert_eq!(
        outcome.diagnostics,
        vec![BorrowError::ExclusivityViolation {
            binding: "a".to_string(),
            requested: BorrowKind::Shared,
            reference: None,
            held: BorrowKind::Exclusive,
            holders: vec!["foo".to_string()],
            position: statement(3),
        }]
    );
}

#[test]
fn test_independent_problems_are_all_reported() {
    let program = ProgramBuilder::new()
        .binding("a", 1)
        .binding_mut("b", 2)
        .shared_ref("r", "b")
        .assign("a", Expr::int(3))
        .exclusive_ref("w", "b")
        .assign("b", Expr::int(4))
        .build();
    let outcome = Session::default().check(&program);

    assert_eq!(
        kinds(&outcome),
        vec![
            ViolationKind::ImmutableOwnerAssignment,
            ViolationKind::ExclusivityViolation,
            ViolationKind::OwnerAccessWhileBorrowed,
        ]
    );
    let indexes: Vec<_> = outcome
        .diagnostics
        .iter()
        .map(|error| error.position().unwrap().index)
        .collect();
    assert_eq!(indexes, vec![3, 4, 5]);
}

fn statement(index: usize) -> Position {
    Position::statement(index, None)
}
