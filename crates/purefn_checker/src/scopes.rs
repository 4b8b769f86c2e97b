//! The scope chain model.
//!
//! Scopes form a tree: one per block, function body, or loop head. A scope
//! records which names are declared in it and a non-owning link to its
//! parent. All scopes live in an arena owned by the traversal and are
//! addressed by handles, so a child never owns its parent; lookup walks from
//! the current scope outward through parents, never into children or
//! siblings. Names are never removed.

use purefn_core::intern::InternedString;
use rustc_hash::FxHashSet;

/// Handle to a scope in the arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One lexical scope: the set of names declared here plus the parent link.
#[derive(Debug)]
struct Scope {
    names: FxHashSet<InternedString>,
    parent: Option<ScopeId>,
}

/// The arena of scopes for one compilation.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    /// Create an arena holding only the root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                names: FxHashSet::default(),
                parent: None,
            }],
        }
    }

    /// The root scope of the subject program.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Create a new scope whose parent is `parent`.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            names: FxHashSet::default(),
            parent: Some(parent),
        });
        id
    }

    /// Add a name to the given scope.
    pub fn declare(&mut self, scope: ScopeId, name: InternedString) {
        self.scopes[scope.index()].names.insert(name);
    }

    /// Whether `name` is declared in `scope` or any ancestor.
    pub fn resolves(&self, scope: ScopeId, name: InternedString) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if s.names.contains(&name) {
                return true;
            }
            current = s.parent;
        }
        false
    }

    /// Number of scopes created so far.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}
