// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-destructure
//!
//! The binding and destructuring pattern compiler of the Spacey engine.
//!
//! ## Overview
//!
//! Patterns in declarations, parameter lists and assignment expressions are
//! compiled to stack-machine bytecode that reproduces the language's
//! evaluation order: iterator protocol, defaults that fire only on
//! `undefined`, rest collection, computed keys and inferred function names.
//!
//! The crate also ships the runtime pieces the compiled code talks to and a
//! small interpreter, so every pattern can be executed and observed.
//!
//! ## Quick Start
//!
//! ```rust
//! use spacey_destructure::ast::{BindingElementItem, BindingPattern, Expression};
//! use spacey_destructure::compiler::{BindingMode, CompileUnit, EnvironmentHandle, compile_unit};
//! use spacey_destructure::{CompileOptions, VM, Value};
//!
//! // let [a, b = 10] = [1];
//! let unit = CompileUnit::binding(
//!     BindingPattern::array(vec![
//!         BindingElementItem::ident("a"),
//!         BindingElementItem::with_default(
//!             spacey_destructure::ast::Binding::ident("b"),
//!             Expression::number(10.0),
//!         ),
//!     ]),
//!     BindingMode::Direct(EnvironmentHandle::Lexical),
//!     Expression::array(vec![Expression::number(1.0)]),
//! );
//! let bytecode = compile_unit(&unit, &CompileOptions::default()).unwrap();
//!
//! let mut vm = VM::new();
//! vm.execute(&bytecode).unwrap();
//! assert_eq!(vm.binding("a"), Some(Value::Number(1.0)));
//! assert_eq!(vm.binding("b"), Some(Value::Number(10.0)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod compiler;
pub mod runtime;
pub mod vm;

use thiserror::Error;

// Re-exports for convenience
pub use compiler::{CompileError, CompileOptions, Compiler};
pub use runtime::value::Value;
pub use vm::{Effect, VM};

/// Result type for executing compiled code.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while compiling or running patterns.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Type error during execution
    #[error("TypeError: {0}")]
    TypeError(String),
    /// Reference error (undefined variable)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),
    /// An exception thrown by script (scripted iterators)
    #[error("Uncaught {0}")]
    Thrown(String),
    /// Internal engine error
    #[error("InternalError: {0}")]
    InternalError(String),
    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl Error {
    /// Whether compiled code can observe this error as an exception.
    pub fn is_catchable(&self) -> bool {
        matches!(
            self,
            Error::TypeError(_) | Error::ReferenceError(_) | Error::Thrown(_)
        )
    }
}
