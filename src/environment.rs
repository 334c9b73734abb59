//! Lexical environment: a stack of scope frames, innermost last.
//!
//! Frames are persistent maps, so handing one to a closure is an O(1)
//! snapshot; later `def`s in the defining scope produce a new map version and
//! never show up in a frame that was already captured.

use log::debug;
use rpds::HashTrieMap;

use crate::value::Value;

/// One level of identifier bindings.
pub type Frame = HashTrieMap<String, Value>;

/// Which frames [`Environment::has`] inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Only the innermost frame.
    Local,

    /// Every frame, innermost first.
    #[default]
    Global,
}

#[derive(Debug, Clone)]
pub struct Environment {
    stack: Vec<Frame>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment holding only the (empty) global frame.
    pub fn new() -> Self {
        Environment {
            stack: vec![Frame::new()],
        }
    }

    /// Push frames on top of the stack; the last one becomes innermost.
    pub fn push(&mut self, frames: impl IntoIterator<Item = Frame>) {
        let before = self.stack.len();
        self.stack.extend(frames);
        debug!("Pushed {} frame(s), depth={}", self.stack.len() - before, self.stack.len());
    }

    /// Remove `count` frames from the top.
    ///
    /// # Panics
    ///
    /// If that would remove the global frame.  Frames are only popped by the
    /// code that pushed them, so this is a driver bug, not a program error.
    pub fn pop(&mut self, count: usize) {
        if count >= self.stack.len() {
            panic!(
                "internal error: empty stack (popping {} of {} frame(s))",
                count,
                self.stack.len()
            );
        }
        self.stack.truncate(self.stack.len() - count);
        debug!("Popped {} frame(s), depth={}", count, self.stack.len());
    }

    /// The innermost frame, for direct mutation by `def`.
    pub fn pick(&mut self) -> &mut Frame {
        match self.stack.last_mut() {
            Some(frame) => frame,
            None => panic!("internal error: empty stack"),
        }
    }

    pub fn has(&self, id: &str, scope: Scope) -> bool {
        match scope {
            Scope::Local => self.stack.last().is_some_and(|f| f.contains_key(id)),
            Scope::Global => self.stack.iter().any(|f| f.contains_key(id)),
        }
    }

    /// Resolve `id`, innermost frame first.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.stack.iter().rev().find_map(|f| f.get(id))
    }

    /// Snapshot of every frame currently on the stack, outermost first.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.stack.clone()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
