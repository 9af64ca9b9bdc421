// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static scope facts the pattern compiler may rely on.

use rustc_hash::FxHashSet;

/// What static analysis knows about the names visible at the pattern.
#[derive(Debug, Default)]
pub struct Scope {
    /// Names declared as locals of the enclosing function
    locals: FxHashSet<String>,
    /// The code can introduce bindings at runtime (`with`, sloppy direct eval)
    pub dynamic: bool,
}

impl Scope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a local. Returns false if it was already declared; legality
    /// is the parser's business.
    pub fn declare(&mut self, name: impl Into<String>) -> bool {
        self.locals.insert(name.into())
    }

    /// Marks the scope as able to grow bindings at runtime.
    pub fn mark_dynamic(&mut self) {
        self.dynamic = true;
    }

    /// Check if a variable is a local (vs global).
    pub fn is_local(&self, name: &str) -> bool {
        self.locals.contains(name)
    }

    /// True when `name` resolves to a local binding that no script run in
    /// between can shadow or remove, so resolving it early is invisible.
    pub fn is_unobservable_local(&self, name: &str) -> bool {
        !self.dynamic && self.is_local(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_new() {
        let scope = Scope::new();
        assert!(!scope.is_local("x"));
        assert!(!scope.dynamic);
    }

    #[test]
    fn test_redeclare_is_reported() {
        let mut scope = Scope::new();
        assert!(scope.declare("x"));
        assert!(!scope.declare("x"));
        assert!(scope.is_local("x"));
    }

    #[test]
    fn test_unobservable_local() {
        let mut scope = Scope::new();
        scope.declare("local");
        assert!(scope.is_unobservable_local("local"));
        assert!(!scope.is_unobservable_local("global"));

        scope.mark_dynamic();
        assert!(!scope.is_unobservable_local("local"));
    }
}
