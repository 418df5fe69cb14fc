//! Borrow checking error types.

use derive_more::Display;
use lb_program::ProgramError;
use lb_span::Position;
use miette::Diagnostic;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::BorrowMode;
use crate::loans::BorrowKind;

/// Result type for borrow checking operations.
///
/// Borrow checking can produce multiple errors, so we collect them all.
pub type BorrowResult<T> = Result<T, Vec<BorrowError>>;

/// How the owner touched a borrowed binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    #[display("read")]
    Read,
    #[display("assign to")]
    Write,
}

/// Errors that can occur during borrow checking.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BorrowError {
    /// A borrow conflicts with the binding's current borrows.
    ///
    /// Raised for declarations and rebinds of references, and for the
    /// transient shared borrow a read through `&binding` takes.
    #[error(
        "cannot borrow `{binding}` as {requested}{} because it is {} by {}",
        for_reference(.reference),
        .held.held_phrase(),
        quoted(.holders)
    )]
    #[diagnostic(
        code(borrowck::exclusivity),
        help("a borrow lasts until the end of the scope that declared it; close that scope before borrowing `{binding}` again")
    )]
    ExclusivityViolation {
        /// The borrowed binding
        binding: String,
        /// Kind of the rejected borrow
        requested: BorrowKind,
        /// Reference that asked for it, `None` for a transient read borrow
        #[serde(skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
        /// Kind of the borrows already held
        held: BorrowKind,
        /// References holding them
        holders: Vec<String>,
        /// Statement that asked for the borrow
        position: Position,
    },

    /// The owner read or wrote a binding it has lent out.
    #[error(
        "cannot {access} `{binding}` because it is {} by {}",
        .held.held_phrase(),
        quoted(.holders)
    )]
    #[diagnostic(
        code(borrowck::owner_access),
        help("`{binding}` is unavailable to its owner until every conflicting reference goes out of scope")
    )]
    OwnerAccessWhileBorrowed {
        /// The borrowed binding
        binding: String,
        /// What the owner tried to do
        access: AccessKind,
        /// Kind of the outstanding borrows
        held: BorrowKind,
        /// References holding them
        holders: Vec<String>,
        /// Statement performing the access
        position: Position,
    },

    /// Assignment to a binding or rebind of a reference not declared mutable.
    #[error("cannot assign to `{name}` because it is not declared mutable")]
    #[diagnostic(
        code(borrowck::immutable_assignment),
        help("declare `{name}` as mutable to allow reassigning it")
    )]
    ImmutableOwnerAssignment {
        /// The immutable binding or reference
        name: String,
        /// Statement performing the assignment
        position: Position,
    },

    /// A binding was destroyed while references to it were still live.
    #[error("`{binding}` is destroyed while still borrowed by {}", quoted(.references))]
    #[diagnostic(
        code(borrowck::dangling_referent),
        help("declare `{binding}` before the references that borrow it, or end their scope earlier")
    )]
    DanglingReferentViolation {
        /// The destroyed binding
        binding: String,
        /// Live references left dangling
        references: Vec<String>,
        /// Scope exit that destroyed the binding
        position: Position,
    },

    /// A borrow mode other than lexical was requested.
    #[error("borrow mode `{mode}` is not supported")]
    #[diagnostic(
        code(borrowck::unsupported_mode),
        help("only `lexical` borrow checking is implemented")
    )]
    UnsupportedMode {
        /// The requested mode
        mode: BorrowMode,
    },

    /// The program failed model validation and was not analysed.
    #[error("malformed program: {error}")]
    #[diagnostic(
        code(borrowck::malformed_program),
        help("fix the program's structure; borrow analysis only runs on well-formed programs")
    )]
    MalformedProgram {
        /// The validation failure
        error: ProgramError,
        /// Offending statement
        position: Position,
    },
}

fn quoted(names: &[String]) -> String {
    if names.is_empty() {
        return "a temporary borrow".to_string();
    }
    names
        .iter()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn for_reference(reference: &Option<String>) -> String {
    reference
        .as_ref()
        .map(|name| format!(" for `{name}`"))
        .unwrap_or_default()
}

impl BorrowError {
    /// Category of this error
    pub fn kind(&self) -> ViolationKind {
        match self {
            Self::ExclusivityViolation { .. } => ViolationKind::ExclusivityViolation,
            Self::OwnerAccessWhileBorrowed { .. } => ViolationKind::OwnerAccessWhileBorrowed,
            Self::ImmutableOwnerAssignment { .. } => ViolationKind::ImmutableOwnerAssignment,
            Self::DanglingReferentViolation { .. } => ViolationKind::DanglingReferentViolation,
            Self::UnsupportedMode { .. } => ViolationKind::UnsupportedMode,
            Self::MalformedProgram { .. } => ViolationKind::MalformedProgram,
        }
    }

    /// Where the error was raised; `None` for configuration errors.
    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::ExclusivityViolation { position, .. }
            | Self::OwnerAccessWhileBorrowed { position, .. }
            | Self::ImmutableOwnerAssignment { position, .. }
            | Self::DanglingReferentViolation { position, .. }
            | Self::MalformedProgram { position, .. } => Some(position),
            Self::UnsupportedMode { .. } => None,
        }
    }

    /// Identifiers involved, the primary one first
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            Self::ExclusivityViolation {
                binding,
                reference,
                holders,
                ..
            } => std::iter::once(binding.as_str())
                .chain(reference.as_deref())
                .chain(holders.iter().map(String::as_str))
                .collect(),
            Self::OwnerAccessWhileBorrowed {
                binding, holders, ..
            } => std::iter::once(binding.as_str())
                .chain(holders.iter().map(String::as_str))
                .collect(),
            Self::ImmutableOwnerAssignment { name, .. } => vec![name.as_str()],
            Self::DanglingReferentViolation {
                binding,
                references,
                ..
            } => std::iter::once(binding.as_str())
                .chain(references.iter().map(String::as_str))
                .collect(),
            Self::UnsupportedMode { .. } => Vec::new(),
            Self::MalformedProgram { error, .. } => error.name().into_iter().collect(),
        }
    }

    /// Short label for the offending statement in source snippets
    pub fn label(&self) -> String {
        match self {
            Self::ExclusivityViolation { requested, .. } => format!("{requested} borrow rejected here"),
            Self::OwnerAccessWhileBorrowed { access, .. } => format!("{access} while borrowed"),
            Self::ImmutableOwnerAssignment { .. } => "assignment to immutable owner".to_string(),
            Self::DanglingReferentViolation { binding, .. } => format!("`{binding}` destroyed here"),
            Self::UnsupportedMode { .. } => "unsupported mode".to_string(),
            Self::MalformedProgram { .. } => "malformed statement".to_string(),
        }
    }
}

/// Violation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    ExclusivityViolation,
    OwnerAccessWhileBorrowed,
    ImmutableOwnerAssignment,
    DanglingReferentViolation,
    UnsupportedMode,
    MalformedProgram,
}

impl ViolationKind {
    pub const ALL: [Self; 6] = [
        Self::ExclusivityViolation,
        Self::OwnerAccessWhileBorrowed,
        Self::ImmutableOwnerAssignment,
        Self::DanglingReferentViolation,
        Self::UnsupportedMode,
        Self::MalformedProgram,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ExclusivityViolation => "ExclusivityViolation",
            Self::OwnerAccessWhileBorrowed => "OwnerAccessWhileBorrowed",
            Self::ImmutableOwnerAssignment => "ImmutableOwnerAssignment",
            Self::DanglingReferentViolation => "DanglingReferentViolation",
            Self::UnsupportedMode => "UnsupportedMode",
            Self::MalformedProgram => "MalformedProgram",
        }
    }

    /// Stable diagnostic code
    pub fn code(self) -> &'static str {
        match self {
            Self::ExclusivityViolation => "borrowck::exclusivity",
            Self::OwnerAccessWhileBorrowed => "borrowck::owner_access",
            Self::ImmutableOwnerAssignment => "borrowck::immutable_assignment",
            Self::DanglingReferentViolation => "borrowck::dangling_referent",
            Self::UnsupportedMode => "borrowck::unsupported_mode",
            Self::MalformedProgram => "borrowck::malformed_program",
        }
    }

    /// Long-form description of the rule, shown by `lexborrow explain`
    pub fn explanation(self) -> &'static str {
        match self {
            Self::ExclusivityViolation => {
                "A binding may be borrowed by any number of shared references or by exactly one \
                 exclusive reference, never both. Declaring or rebinding a reference, or reading \
                 a binding through a temporary shared borrow, fails when the new borrow conflicts \
                 with one that is still live. Borrows last until the end of the declaring scope."
            }
            Self::OwnerAccessWhileBorrowed => {
                "While a binding is lent out its owner is restricted too. A live shared reference \
                 makes the binding read-only, so the owner cannot assign to it. A live exclusive \
                 reference makes it inaccessible, so the owner can neither read nor assign it."
            }
            Self::ImmutableOwnerAssignment => {
                "Only bindings declared mutable can be reassigned, and only reference variables \
                 declared mutable can be rebound to a new target. This holds whether or not the \
                 binding is borrowed."
            }
            Self::DanglingReferentViolation => {
                "A reference must not outlive its referent. Leaving a scope destroys its entities \
                 in reverse declaration order, so a reference declared before the binding it \
                 points to is still live when that binding is destroyed."
            }
            Self::UnsupportedMode => {
                "Only lexical borrow checking is implemented. Non-lexical lifetimes, where a \
                 borrow ends at its last use, are rejected before analysis starts."
            }
            Self::MalformedProgram => {
                "The program breaks the model's static rules: an unknown name, a binding used \
                 where a reference is required or the reverse, a write through a shared \
                 reference, or an unmatched scope exit. Borrow analysis does not run."
            }
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViolationKind {
    type Err = String;

    /// Accepts the kind name in any case or separator style, or its code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalize = |text: &str| {
            text.chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        };
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|kind| normalize(kind.name()) == wanted || normalize(kind.code()) == wanted)
            .ok_or_else(|| format!("unknown violation kind `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_every_identifier() {
        let error = BorrowError::ExclusivityViolation {
            binding: "a".to_string(),
            requested: BorrowKind::Shared,
            reference: None,
            held: BorrowKind::Exclusive,
            holders: vec!["foo".to_string()],
            position: Position::statement(3, None),
        };
        assert_eq!(
            error.to_string(),
            "cannot borrow `a` as shared because it is exclusively borrowed by `foo`"
        );
        assert_eq!(error.identifiers(), vec!["a", "foo"]);

        let error = BorrowError::DanglingReferentViolation {
            binding: "b".to_string(),
            references: vec!["foo".to_string(), "bar".to_string()],
            position: Position::end_of_program(6),
        };
        assert_eq!(
            error.to_string(),
            "`b` is destroyed while still borrowed by `foo`, `bar`"
        );
    }

    #[test]
    fn diagnostic_codes_match_kinds() {
        let error = BorrowError::ImmutableOwnerAssignment {
            name: "x".to_string(),
            position: Position::statement(0, None),
        };
        let code = error.code().map(|code| code.to_string());
        assert_eq!(code.as_deref(), Some(error.kind().code()));
        assert!(error.help().is_some());
    }

    #[test]
    fn kinds_parse_from_names_and_codes() {
        for kind in ViolationKind::ALL {
            assert_eq!(kind.name().parse(), Ok(kind));
            assert_eq!(kind.code().parse(), Ok(kind));
        }
        assert_eq!(
            "owner-access-while-borrowed".parse(),
            Ok(ViolationKind::OwnerAccessWhileBorrowed)
        );
        assert!("use_after_move".parse::<ViolationKind>().is_err());
    }

    #[test]
    fn errors_serialize_with_kind_tag() {
        let error = BorrowError::OwnerAccessWhileBorrowed {
            binding: "a".to_string(),
            access: AccessKind::Write,
            held: BorrowKind::Exclusive,
            holders: vec!["foo".to_string()],
            position: Position::statement(2, None),
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "owner_access_while_borrowed");
        assert_eq!(json["access"], "write");
        assert_eq!(json["position"]["index"], 2);
    }
}
