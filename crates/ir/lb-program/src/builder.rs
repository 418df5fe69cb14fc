//! Fluent construction of programs

use crate::{AccessPath, Expr, Program, RefKind, SourceInfo, Stmt, StmtKind, ValueTag};
use lb_span::FileSpan;

/// Builds a [`Program`] statement by statement
///
/// ```rust
/// use lb_program::{Expr, ProgramBuilder};
///
/// let program = ProgramBuilder::new()
///     .binding_mut("a", 5)
///     .exclusive_ref("foo", "a")
///     .assign("a", Expr::add(Expr::var("a"), Expr::int(1)))
///     .build();
/// assert_eq!(program.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.program.name = Some(name.into());
        self
    }

    pub fn source(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.program.source = Some(SourceInfo {
            path: path.into(),
            text: text.into(),
        });
        self
    }

    /// Appends an arbitrary statement
    pub fn stmt(mut self, kind: StmtKind) -> Self {
        self.program.statements.push(Stmt::new(kind));
        self
    }

    /// Attaches a span to the most recently added statement
    pub fn at(mut self, span: FileSpan) -> Self {
        if let Some(last) = self.program.statements.last_mut() {
            last.span = Some(span);
        }
        self
    }

    fn declare(self, name: &str, mutable: bool, init: Option<Expr>) -> Self {
        self.stmt(StmtKind::DeclareBinding {
            name: name.to_string(),
            mutable,
            ty: ValueTag::default(),
            init,
        })
    }

    /// `let name = value`
    pub fn binding(self, name: &str, value: i64) -> Self {
        self.declare(name, false, Some(Expr::Int(value)))
    }

    /// `let mut name = value`
    pub fn binding_mut(self, name: &str, value: i64) -> Self {
        self.declare(name, true, Some(Expr::Int(value)))
    }

    /// `let name = init` for any initializer
    pub fn binding_with(self, name: &str, mutable: bool, init: Expr) -> Self {
        self.declare(name, mutable, Some(init))
    }

    /// `let name;` with no initial value
    pub fn binding_uninit(self, name: &str, mutable: bool) -> Self {
        self.declare(name, mutable, None)
    }

    pub fn reference(self, name: &str, kind: RefKind, mutable: bool, target: &str) -> Self {
        self.stmt(StmtKind::DeclareReference {
            name: name.to_string(),
            kind,
            mutable,
            target: target.to_string(),
        })
    }

    /// `let name = &target`
    pub fn shared_ref(self, name: &str, target: &str) -> Self {
        self.reference(name, RefKind::Shared, false, target)
    }

    /// `let name = &mut target`
    pub fn exclusive_ref(self, name: &str, target: &str) -> Self {
        self.reference(name, RefKind::Exclusive, false, target)
    }

    pub fn rebind(self, name: &str, target: &str) -> Self {
        self.stmt(StmtKind::RebindReference {
            name: name.to_string(),
            target: target.to_string(),
        })
    }

    pub fn assign(self, name: &str, value: Expr) -> Self {
        self.stmt(StmtKind::AssignBinding {
            name: name.to_string(),
            value,
        })
    }

    pub fn assign_through(self, reference: &str, value: Expr) -> Self {
        self.stmt(StmtKind::AssignThroughReference {
            reference: reference.to_string(),
            value,
        })
    }

    pub fn read(self, name: &str) -> Self {
        self.stmt(StmtKind::ReadBinding {
            name: name.to_string(),
        })
    }

    /// `read *reference`
    pub fn read_deref(self, reference: &str) -> Self {
        self.stmt(StmtKind::ReadThroughReference {
            path: AccessPath::Deref(reference.to_string()),
        })
    }

    /// `read &binding`
    pub fn read_borrowed(self, binding: &str) -> Self {
        self.stmt(StmtKind::ReadThroughReference {
            path: AccessPath::Borrow(binding.to_string()),
        })
    }

    pub fn enter(self) -> Self {
        self.stmt(StmtKind::EnterScope)
    }

    pub fn exit(self) -> Self {
        self.stmt(StmtKind::ExitScope)
    }

    pub fn build(self) -> Program {
        self.program
    }
}
