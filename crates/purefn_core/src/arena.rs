//! Arena allocation for one compilation.
//!
//! AST nodes produced by the parser and by the guard-injection transform are
//! allocated from a bump arena and freed all at once when the compilation
//! ends. Each compilation owns its own arena; nothing is shared across calls.

use bumpalo::Bump;

/// The compiler arena wraps a bump allocator for all per-compilation
/// allocations.
pub struct CompilerArena {
    bump: Bump,
}

impl CompilerArena {
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Create an arena with the specified initial capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bump: Bump::with_capacity(capacity),
        }
    }

    /// Get a reference to the underlying bump allocator.
    #[inline]
    pub fn bump(&self) -> &Bump {
        &self.bump
    }

    /// Allocate a value in the arena and return a reference to it.
    #[inline]
    pub fn alloc<T>(&self, val: T) -> &T {
        self.bump.alloc(val)
    }

    /// Allocate a string slice in the arena.
    #[inline]
    pub fn alloc_str(&self, s: &str) -> &str {
        self.bump.alloc_str(s)
    }
}

impl Default for CompilerArena {
    fn default() -> Self {
        Self::new()
    }
}
