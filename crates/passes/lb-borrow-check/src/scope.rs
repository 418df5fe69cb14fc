//! Lexical scope tracking
//!
//! Each frame remembers its entities in creation order so that exiting the
//! frame can destroy them in exact reverse order.

use lb_intern::Symbol;
use rustc_hash::FxHashMap;

use crate::entity::{BindingId, ReferenceId};

/// Something declared in a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Binding(BindingId),
    Reference(ReferenceId),
}

/// One open lexical scope
#[derive(Debug, Default)]
struct Frame {
    /// Every entity declared here, shadowed ones included, in creation order
    entities: Vec<Entity>,
    /// Currently visible entity for each name
    names: FxHashMap<Symbol, Entity>,
}

/// Stack of open frames, root frame at the bottom
#[derive(Debug)]
pub struct ScopeTracker {
    frames: Vec<Frame>,
}

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTracker {
    /// Creates a tracker with the implicit root frame open
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Nesting depth of the innermost frame; the root frame is 0
    pub fn depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub fn enter(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Declares `entity` under `name` in the innermost frame.
    ///
    /// Returns the entity it shadows in that same frame, if any. Entities in
    /// outer frames are hidden but not returned.
    pub fn declare(&mut self, name: Symbol, entity: Entity) -> Option<Entity> {
        let frame = self.frames.last_mut()?;
        frame.entities.push(entity);
        frame.names.insert(name, entity)
    }

    /// Resolves a name, innermost frame first
    pub fn lookup(&self, name: Symbol) -> Option<Entity> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.names.get(&name).copied())
    }

    /// Closes the innermost non-root frame.
    ///
    /// Returns its entities in destruction order (reverse creation order),
    /// or `None` if only the root frame is open.
    pub fn exit(&mut self) -> Option<Vec<Entity>> {
        if self.frames.len() <= 1 {
            return None;
        }
        self.frames.pop().map(Frame::into_destruction_order)
    }

    /// Closes every open frame, root included, innermost first
    pub fn finish(&mut self) -> Vec<Entity> {
        let mut destroyed = Vec::new();
        while let Some(frame) = self.frames.pop() {
            destroyed.extend(frame.into_destruction_order());
        }
        destroyed
    }
}

impl Frame {
    fn into_destruction_order(self) -> Vec<Entity> {
        let mut entities = self.entities;
        entities.reverse();
        entities
    }
}
