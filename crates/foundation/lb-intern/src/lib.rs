//! Identifier interning
//!
//! Every analysis owns its own [`Interner`]; symbols from one interner are
//! meaningless to another.

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::fmt;
use std::sync::Arc;

/// Thread-safe identifier interner
#[derive(Clone, Default)]
pub struct Interner {
    inner: Arc<ThreadedRodeo>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, name: &str) -> Symbol {
        self.inner.get_or_intern(name)
    }

    /// Looks up an identifier without interning it
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.inner.get(name)
    }

    /// Resolves a symbol back to its text.
    ///
    /// Symbols minted by a different interner resolve to `"<unknown>"`.
    pub fn resolve(&self, sym: &Symbol) -> String {
        self.try_resolve(sym)
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    pub fn try_resolve(&self, sym: &Symbol) -> Option<String> {
        self.inner.try_resolve(sym).map(ToString::to_string)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("symbols", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let interner = Interner::new();
        let first = interner.intern("foo");
        let second = interner.intern("foo");
        assert_eq!(first, second);
        assert_eq!(interner.resolve(&first), "foo");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn get_does_not_intern() {
        let interner = Interner::new();
        assert!(interner.get("bar").is_none());
        assert!(interner.is_empty());
    }
}
