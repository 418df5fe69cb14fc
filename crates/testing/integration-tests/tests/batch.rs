//! Directory loading and batch checking

use integration_tests::fixtures_dir;
use lb_borrow_check::{BorrowMode, CheckerConfig, ViolationKind};
use lb_driver::{Session, check_batch, find_program_files, load_program};
use std::fs;

#[test]
fn test_fixture_directory_checks_in_file_order() {
    let files = find_program_files(&fixtures_dir()).unwrap();
    assert_eq!(files.len(), 6);

    let programs: Vec<_> = files.iter().map(|file| load_program(file).unwrap()).collect();
    let outcomes = check_batch(&programs, &CheckerConfig::default());

    let summary: Vec<(&str, usize)> = outcomes
        .iter()
        .map(|outcome| (outcome.name.as_str(), outcome.diagnostics.len()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("owner-write-while-exclusive", 1),
            ("shared-borrow-scoped", 0),
            ("referent-declared-after-reference", 2),
            ("referent-declared-before-reference", 0),
            ("shared-read-while-exclusive", 1),
            ("with-source", 1),
        ]
    );
}

#[test]
fn test_nested_directories_are_searched() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("suite").join("deep");
    fs::create_dir_all(&nested).unwrap();
    fs::copy(
        fixtures_dir().join("01-owner-write-while-exclusive.json"),
        nested.join("unnamed.json"),
    )
    .unwrap();
    fs::write(dir.path().join("README.md"), "not a program").unwrap();

    let files = find_program_files(dir.path()).unwrap();
    assert_eq!(files, vec![nested.join("unnamed.json")]);

    let program = load_program(&files[0]).unwrap();
    assert_eq!(program.display_name(), "owner-write-while-exclusive");
}

#[test]
fn test_unsupported_mode_applies_to_every_program() {
    let files = find_program_files(&fixtures_dir()).unwrap();
    let programs: Vec<_> = files.iter().map(|file| load_program(file).unwrap()).collect();

    let session = Session::new(CheckerConfig::with_mode(BorrowMode::NonLexical)).with_evaluation(true);
    for outcome in session.check_batch(&programs) {
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind(), ViolationKind::UnsupportedMode);
        assert!(outcome.evaluation.is_none());
    }
}
