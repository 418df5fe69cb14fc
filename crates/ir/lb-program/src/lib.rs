//! Program model for the lexical borrow checker
//!
//! A program is a flat, ordered list of primitive statements. Lexical blocks
//! are delimited by explicit [`StmtKind::EnterScope`] / [`StmtKind::ExitScope`]
//! markers, and the whole program is implicitly wrapped in an outermost scope
//! that closes after the last statement.
//!
//! The model is serializable so that programs produced by an external parser
//! can be handed to the checker as JSON or TOML:
//!
//! ```json
//! { "statements": [
//!     { "op": "declare_binding", "name": "a", "mutable": true, "init": { "int": 5 } },
//!     { "op": "declare_reference", "name": "foo", "kind": "exclusive", "target": "a" }
//! ] }
//! ```

pub mod builder;
pub mod expr;
pub mod validate;

pub use builder::ProgramBuilder;
pub use expr::{BinOp, Expr};
pub use validate::ProgramError;

use lb_span::{FileSpan, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// `&T`: read-only, any number may coexist
    Shared,
    /// `&mut T`: read-write, excludes every other access
    Exclusive,
}

impl RefKind {
    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::Exclusive)
    }

    /// Borrow operator as written in source (`&` or `&mut `)
    pub fn sigil(self) -> &'static str {
        match self {
            Self::Shared => "&",
            Self::Exclusive => "&mut ",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// Value-type tag of a binding.
///
/// Carried for display only; every binding is just a location holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTag(pub String);

impl Default for ValueTag {
    fn default() -> Self {
        Self("i32".to_string())
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a read reaches its binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPath {
    /// `*reference`: read through an existing reference
    Deref(String),
    /// `&binding`: read through a fresh, anonymous shared borrow, the way a
    /// print-style operation borrows its argument
    Borrow(String),
}

impl AccessPath {
    pub fn name(&self) -> &str {
        match self {
            Self::Deref(name) | Self::Borrow(name) => name,
        }
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deref(name) => write!(f, "*{name}"),
            Self::Borrow(name) => write!(f, "&{name}"),
        }
    }
}

/// Primitive statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StmtKind {
    /// `let [mut] name: ty [= init]`
    DeclareBinding {
        /// Binding name
        name: String,
        /// Whether the owner may reassign the binding
        #[serde(default)]
        mutable: bool,
        /// Value-type tag
        #[serde(default)]
        ty: ValueTag,
        /// Initial value, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Expr>,
    },
    /// `let [mut] name = &target` or `let [mut] name = &mut target`
    DeclareReference {
        /// Reference name
        name: String,
        /// Shared or exclusive
        kind: RefKind,
        /// Whether the reference variable may later be rebound
        #[serde(default)]
        mutable: bool,
        /// Referent binding
        target: String,
    },
    /// `name = &target`, reusing the reference's declared kind
    RebindReference {
        /// Reference name
        name: String,
        /// New referent binding
        target: String,
    },
    /// `name = value`: the owner writes its binding
    AssignBinding {
        /// Binding name
        name: String,
        /// New value
        value: Expr,
    },
    /// `*reference = value`
    AssignThroughReference {
        /// Reference name
        reference: String,
        /// New value
        value: Expr,
    },
    /// Owner read of a binding, including print-style formatting
    ReadBinding {
        /// Binding name
        name: String,
    },
    /// Read through a reference or a transient shared borrow
    ReadThroughReference {
        /// Access path
        path: AccessPath,
    },
    /// `{`
    EnterScope,
    /// `}`
    ExitScope,
}

impl StmtKind {
    /// Name declared by this statement, if any
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Self::DeclareBinding { name, .. } | Self::DeclareReference { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Value expression carried by this statement, if any
    pub fn value(&self) -> Option<&Expr> {
        match self {
            Self::DeclareBinding { init, .. } => init.as_ref(),
            Self::AssignBinding { value, .. } | Self::AssignThroughReference { value, .. } => {
                Some(value)
            }
            _ => None,
        }
    }
}

impl fmt::Display for StmtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut_kw = |mutable: bool| if mutable { "mut " } else { "" };
        match self {
            Self::DeclareBinding {
                name,
                mutable,
                ty,
                init,
            } => {
                write!(f, "let {}{name}: {ty}", mut_kw(*mutable))?;
                if let Some(init) = init {
                    write!(f, " = {init}")?;
                }
                Ok(())
            }
            Self::DeclareReference {
                name,
                kind,
                mutable,
                target,
            } => write!(f, "let {}{name} = {}{target}", mut_kw(*mutable), kind.sigil()),
            Self::RebindReference { name, target } => write!(f, "rebind {name} -> {target}"),
            Self::AssignBinding { name, value } => write!(f, "{name} = {value}"),
            Self::AssignThroughReference { reference, value } => {
                write!(f, "*{reference} = {value}")
            }
            Self::ReadBinding { name } => write!(f, "read {name}"),
            Self::ReadThroughReference { path } => write!(f, "read {path}"),
            Self::EnterScope => write!(f, "{{"),
            Self::ExitScope => write!(f, "}}"),
        }
    }
}

/// A statement with its optional source location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stmt {
    /// What the statement does
    #[serde(flatten)]
    pub kind: StmtKind,
    /// Where the statement came from, when produced from source text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<FileSpan>,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self { kind, span: None }
    }

    pub fn with_span(mut self, span: FileSpan) -> Self {
        self.span = Some(span);
        self
    }
}

impl From<StmtKind> for Stmt {
    fn from(kind: StmtKind) -> Self {
        Self::new(kind)
    }
}

/// Source text a program was produced from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Display name or path of the source file
    pub path: String,
    /// Full source text that statement spans index into
    pub text: String,
}

/// A complete program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Optional program name used in reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional source text for rich diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
    /// Statements in program order
    #[serde(default)]
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self {
            name: None,
            source: None,
            statements,
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Position of the statement at `index`, or end of program when out of range
    pub fn position(&self, index: usize) -> Position {
        match self.statements.get(index) {
            Some(stmt) => Position::statement(index, stmt.span),
            None => Position::end_of_program(self.statements.len()),
        }
    }

    /// Returns the name used in reports
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.source.as_ref().map(|source| source.path.as_str()))
            .unwrap_or("<program>")
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        for (index, stmt) in self.statements.iter().enumerate() {
            if matches!(stmt.kind, StmtKind::ExitScope) {
                depth = depth.saturating_sub(1);
            }
            writeln!(f, "{index:>3}  {}{}", "    ".repeat(depth), stmt.kind)?;
            if matches!(stmt.kind, StmtKind::EnterScope) {
                depth += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_deserialize_from_json() {
        let json = r#"{
            "name": "demo",
            "statements": [
                { "op": "declare_binding", "name": "a", "mutable": true, "init": { "int": 5 } },
                { "op": "declare_reference", "name": "foo", "kind": "exclusive", "target": "a" },
                { "op": "assign_binding", "name": "a",
                  "value": { "binary": { "op": "add", "lhs": { "var": "a" }, "rhs": { "int": 1 } } } },
                { "op": "read_through_reference", "path": { "borrow": "a" }, "span": { "start": 3, "end": 9 } },
                { "op": "enter_scope" },
                { "op": "exit_scope" }
            ]
        }"#;
        let program: Program = serde_json::from_str(json).unwrap();

        assert_eq!(program.display_name(), "demo");
        assert_eq!(program.len(), 6);
        assert_eq!(
            program.statements[0].kind,
            StmtKind::DeclareBinding {
                name: "a".to_string(),
                mutable: true,
                ty: ValueTag::default(),
                init: Some(Expr::Int(5)),
            }
        );
        assert_eq!(
            program.statements[2].kind,
            StmtKind::AssignBinding {
                name: "a".to_string(),
                value: Expr::add(Expr::var("a"), Expr::int(1)),
            }
        );
        let span = program.statements[3].span.unwrap();
        assert_eq!(span.range(), 3..9);
        assert_eq!(program.statements[4].kind, StmtKind::EnterScope);
    }

    #[test]
    fn statements_deserialize_from_toml() {
        let source = r#"
            name = "toml-demo"

            [[statements]]
            op = "declare_binding"
            name = "b"
            init = { int = 6 }

            [[statements]]
            op = "declare_reference"
            name = "r"
            kind = "shared"
            target = "b"

            [[statements]]
            op = "read_through_reference"
            path = { deref = "r" }
        "#;
        let program: Program = toml::from_str(source).unwrap();

        assert_eq!(program.len(), 3);
        assert_eq!(
            program.statements[2].kind,
            StmtKind::ReadThroughReference {
                path: AccessPath::Deref("r".to_string()),
            }
        );
    }

    #[test]
    fn display_renders_pseudo_source() {
        let program = ProgramBuilder::new()
            .binding_mut("a", 5)
            .enter()
            .shared_ref("foo", "a")
            .exit()
            .assign("a", Expr::add(Expr::var("a"), Expr::int(1)))
            .build();

        let rendered = program.to_string();
        assert!(rendered.contains("let mut a: i32 = 5"));
        assert!(rendered.contains("    let foo = &a"));
        assert!(rendered.contains("a = a + 1"));
    }
}
