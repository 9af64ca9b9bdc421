// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation for binding and destructuring patterns.
//!
//! One recursive compiler covers every pattern shape. Binding patterns and
//! assignment patterns are lowered to the same element and property views,
//! so key evaluation, default handling, iterator scaffolding and rest
//! construction exist exactly once. The binding mode travels with each
//! element target and never changes inside one pattern.

mod array;
mod assignment;
mod binding;
mod defaults;
mod emitter;
mod expressions;
mod object;
mod scope;
mod stack;

#[cfg(test)]
mod tests;

pub use binding::BindingMode;
pub use emitter::{Emitter, Temp, TryRegion};
pub use expressions::{BasicExpressions, ExpressionCompiler};
pub use scope::Scope;
pub use stack::{StackEntry, StackModel};

use tracing::{debug, instrument};

use crate::ast::{AssignmentPattern, BindingPattern, Expression, FormalParameters};
use crate::compiler::bytecode::Bytecode;
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::options::CompileOptions;

/// Compiles patterns to bytecode.
pub struct Compiler<X: ExpressionCompiler = BasicExpressions> {
    /// The chunk being generated
    pub emitter: Emitter,
    /// Static scope facts for the code around the pattern
    pub scope: Scope,
    expressions: X,
    options: CompileOptions,
}

impl Compiler<BasicExpressions> {
    /// Creates a compiler with default options.
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    /// Creates a compiler with the given options.
    pub fn with_options(options: CompileOptions) -> Self {
        Self::with_expressions(BasicExpressions, options)
    }
}

impl Default for Compiler<BasicExpressions> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: ExpressionCompiler> Compiler<X> {
    /// Creates a compiler that delegates sub-expressions to `expressions`.
    pub fn with_expressions(expressions: X, options: CompileOptions) -> Self {
        Self {
            emitter: Emitter::new(),
            scope: Scope::new(),
            expressions,
            options,
        }
    }

    /// The options this compiler was created with.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Compiles `expr`, leaving its value on the stack.
    pub fn compile_expression(&mut self, expr: &Expression) -> CompileResult<()> {
        self.expressions
            .compile_expression(&mut self.emitter, &self.scope, expr)
    }

    /// Binds the value on top of the stack to `pattern`, consuming it.
    #[instrument(level = "debug", skip_all, fields(mode = ?mode))]
    pub fn compile_binding_initialization(
        &mut self,
        pattern: &BindingPattern,
        mode: BindingMode,
    ) -> CompileResult<()> {
        let depth = self.entry_depth("compileBindingInitialization")?;
        self.binding_pattern(pattern, mode)?;
        self.check_consumed(depth)
    }

    /// Binds `parameters` positionally from the argument iterator in
    /// `cursor`. The cursor belongs to the caller and is never closed here.
    #[instrument(level = "debug", skip_all, fields(mode = ?mode, count = parameters.items.len()))]
    pub fn compile_iterator_binding_initialization(
        &mut self,
        parameters: &FormalParameters,
        cursor: Temp,
        mode: BindingMode,
    ) -> CompileResult<()> {
        if cursor.kind() != StackEntry::Iterator {
            return Err(CompileError::TemporaryMismatch {
                context: "compileIteratorBindingInitialization",
                slot: cursor.slot(),
                expected: StackEntry::Iterator,
                found: cursor.kind(),
            });
        }
        let depth = self.emitter.stack().depth();
        let elements = array::parameter_elements(parameters, mode);
        self.iterator_elements(&elements, cursor)?;
        if self.emitter.stack().depth() != depth {
            return Err(CompileError::Internal(
                "parameter binding left values on the stack".into(),
            ));
        }
        Ok(())
    }

    /// Assigns the value on top of the stack through `pattern`, consuming it.
    #[instrument(level = "debug", skip_all)]
    pub fn compile_destructuring_assignment(
        &mut self,
        pattern: &AssignmentPattern,
    ) -> CompileResult<()> {
        let depth = self.entry_depth("compileDestructuringAssignment")?;
        self.assignment_pattern(pattern)?;
        self.check_consumed(depth)
    }

    /// Finishes the chunk.
    pub fn finish(self) -> CompileResult<Bytecode> {
        let bytecode = self.emitter.finish(self.options.strict)?;
        debug!(
            instructions = bytecode.instructions.len(),
            temporaries = bytecode.temporaries,
            "finished chunk"
        );
        Ok(bytecode)
    }

    fn entry_depth(&self, context: &'static str) -> CompileResult<usize> {
        self.emitter.stack().peek(StackEntry::Value, context)?;
        Ok(self.emitter.stack().depth())
    }

    fn check_consumed(&self, depth: usize) -> CompileResult<()> {
        if self.emitter.stack().depth() + 1 == depth {
            Ok(())
        } else {
            Err(CompileError::Internal(format!(
                "pattern left the stack at depth {} (expected {})",
                self.emitter.stack().depth(),
                depth - 1
            )))
        }
    }

    // ========================================================================
    // Pattern dispatch
    // ========================================================================

    /// `[v] -> []`
    fn binding_pattern(&mut self, pattern: &BindingPattern, mode: BindingMode) -> CompileResult<()> {
        match pattern {
            BindingPattern::Array(array) => {
                debug!(elements = array.elements.len(), "array binding pattern");
                let elements = array::binding_elements(&array.elements, mode)?;
                self.iterable_pattern(&elements)
            }
            BindingPattern::Object(object) => {
                debug!(
                    properties = object.properties.len(),
                    rest = object.rest.is_some(),
                    "object binding pattern"
                );
                let (properties, rest) = object::binding_properties(object, mode);
                self.object_pattern(&properties, rest)
            }
        }
    }
}
