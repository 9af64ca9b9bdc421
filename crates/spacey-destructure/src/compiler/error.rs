// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compile-time errors.
//!
//! None of these are recoverable: they mean the pattern tree broke a
//! structural rule the parser guarantees, or the compiler itself has a bug.

use thiserror::Error;

use super::codegen::StackEntry;

/// Result type for compilation.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Errors raised while emitting code for a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The pattern tree violates a structural rule
    #[error("Malformed pattern: {0}")]
    MalformedPattern(String),

    /// An emit step found the wrong kind of entry on the operand stack
    #[error(
        "Operand stack mismatch in {context}: expected {expected}, found {}",
        describe_top(.found)
    )]
    StackMismatch {
        /// The emit step that checked
        context: &'static str,
        /// What it needed
        expected: StackEntry,
        /// What the model held (None when empty)
        found: Option<StackEntry>,
    },

    /// A temporary of the wrong kind was handed to an emit step
    #[error("Temporary t{slot} holds {found}, {context} needs {expected}")]
    TemporaryMismatch {
        /// The emit step that checked
        context: &'static str,
        /// The slot
        slot: u16,
        /// What it needed
        expected: StackEntry,
        /// What the slot holds
        found: StackEntry,
    },

    /// The constant pool is full
    #[error("Too many constants in one chunk")]
    TooManyConstants,

    /// Temporary slot numbers ran out
    #[error("Too many temporaries in one chunk")]
    TooManyTemporaries,

    /// An array literal has more elements than one instruction can collect
    #[error("Array literal with {0} elements is too large")]
    TooManyElements(usize),

    /// Anything else that can only be a compiler bug
    #[error("Internal compiler error: {0}")]
    Internal(String),
}

fn describe_top(found: &Option<StackEntry>) -> String {
    match found {
        Some(entry) => entry.to_string(),
        None => "an empty stack".to_string(),
    }
}
