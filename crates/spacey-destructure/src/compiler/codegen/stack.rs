// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compile-time model of the operand stack.
//!
//! Every emit helper states what it pops and pushes; the model checks those
//! claims so a sequencing bug surfaces as a compile error instead of a
//! corrupted stack at runtime.

use std::fmt;

use crate::compiler::error::{CompileError, CompileResult};

/// What a live operand stack slot (or temporary) holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackEntry {
    /// A language value
    Value,
    /// A value already coerced with ToPropertyKey
    Key,
    /// A resolved reference awaiting PutValue
    Reference,
    /// An iterator record
    Iterator,
    /// A consumed-key set
    KeySet,
}

impl fmt::Display for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StackEntry::Value => "a value",
            StackEntry::Key => "a property key",
            StackEntry::Reference => "a reference",
            StackEntry::Iterator => "an iterator",
            StackEntry::KeySet => "a key set",
        };
        f.write_str(name)
    }
}

/// The typed sequence of live operand stack entries.
#[derive(Debug, Clone, Default)]
pub struct StackModel {
    entries: Vec<StackEntry>,
    max_depth: usize,
}

impl StackModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an entry.
    pub fn push(&mut self, entry: StackEntry) {
        self.entries.push(entry);
        self.max_depth = self.max_depth.max(self.entries.len());
    }

    /// Pops an entry of the expected kind.
    pub fn pop(&mut self, expected: StackEntry, context: &'static str) -> CompileResult<()> {
        self.peek(expected, context)?;
        self.entries.pop();
        Ok(())
    }

    /// Pops whatever is on top.
    pub fn pop_any(&mut self, context: &'static str) -> CompileResult<StackEntry> {
        self.entries.pop().ok_or(CompileError::StackMismatch {
            context,
            expected: StackEntry::Value,
            found: None,
        })
    }

    /// Checks the top entry without popping it.
    pub fn peek(&self, expected: StackEntry, context: &'static str) -> CompileResult<()> {
        match self.entries.last() {
            Some(top) if *top == expected => Ok(()),
            found => Err(CompileError::StackMismatch {
                context,
                expected,
                found: found.copied(),
            }),
        }
    }

    /// The entry `depth` slots below the top (0 is the top).
    pub fn at(&self, depth: usize) -> Option<StackEntry> {
        self.entries.iter().rev().nth(depth).copied()
    }

    /// Number of live entries.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Deepest the stack has been.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The live entries, bottom first.
    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    /// Copies the current shape, for control-flow joins.
    pub fn snapshot(&self) -> Vec<StackEntry> {
        self.entries.clone()
    }

    /// Replaces the current shape with a saved one.
    pub fn restore(&mut self, entries: Vec<StackEntry>) {
        self.entries = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = StackModel::new();
        stack.push(StackEntry::Value);
        stack.push(StackEntry::Key);
        assert_eq!(stack.depth(), 2);
        stack.pop(StackEntry::Key, "test").unwrap();
        stack.pop(StackEntry::Value, "test").unwrap();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.max_depth(), 2);
    }

    #[test]
    fn test_pop_wrong_kind() {
        let mut stack = StackModel::new();
        stack.push(StackEntry::Value);
        let err = stack.pop(StackEntry::Reference, "PutValue").unwrap_err();
        assert_eq!(
            err,
            CompileError::StackMismatch {
                context: "PutValue",
                expected: StackEntry::Reference,
                found: Some(StackEntry::Value),
            }
        );
        // The failed pop leaves the model untouched.
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_pop_empty() {
        let mut stack = StackModel::new();
        assert!(stack.pop_any("Pop").is_err());
        assert!(stack.pop(StackEntry::Value, "Pop").is_err());
    }

    #[test]
    fn test_at_and_snapshot() {
        let mut stack = StackModel::new();
        stack.push(StackEntry::Value);
        stack.push(StackEntry::Reference);
        assert_eq!(stack.at(0), Some(StackEntry::Reference));
        assert_eq!(stack.at(1), Some(StackEntry::Value));
        assert_eq!(stack.at(2), None);

        let saved = stack.snapshot();
        stack.pop_any("test").unwrap();
        stack.restore(saved);
        assert_eq!(stack.entries(), &[StackEntry::Value, StackEntry::Reference]);
    }
}
