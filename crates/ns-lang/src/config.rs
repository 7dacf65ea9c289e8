//! Analyzer and interpreter options.

/// What the analyzer does when a `def` reuses a name that is already
/// declared in the same scope (or names a built-in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Redeclaration {
    /// Report `S006`.
    #[default]
    Error,
    /// The new definition replaces the old one for every later use.
    Shadow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub function_redeclaration: Redeclaration,
    /// Nested user-function calls allowed before `RecursionLimit` is raised.
    pub max_call_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { function_redeclaration: Redeclaration::Error, max_call_depth: 200 }
    }
}

impl Options {
    pub fn with_redeclaration(mut self, policy: Redeclaration) -> Self {
        self.function_redeclaration = policy;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}
