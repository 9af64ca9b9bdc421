// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Leaf targets: where a matched value ends up.

use serde::{Deserialize, Serialize};

use super::{Compiler, ExpressionCompiler};
use crate::ast::{
    AssignmentPattern, AssignmentTarget, Binding, BindingPattern, Identifier, MemberProperty,
};
use crate::compiler::bytecode::EnvironmentHandle;
use crate::compiler::error::CompileResult;

/// How binding identifiers are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingMode {
    /// Create and initialize the binding in an environment known at compile
    /// time.
    Direct(EnvironmentHandle),
    /// Resolve the name through the running scope chain, then write through
    /// the reference.
    Reference,
}

/// One element or property target, with the binding mode attached where it
/// matters.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ElementTarget<'a> {
    /// A binding identifier
    Name(&'a Identifier, BindingMode),
    /// A nested binding pattern
    BindingPattern(&'a BindingPattern, BindingMode),
    /// Any assignment target
    Assignment(&'a AssignmentTarget),
}

impl<'a> ElementTarget<'a> {
    pub(crate) fn from_binding(binding: &'a Binding, mode: BindingMode) -> Self {
        match binding {
            Binding::Identifier(id) => ElementTarget::Name(id, mode),
            Binding::Pattern(pattern) => ElementTarget::BindingPattern(pattern, mode),
        }
    }

    /// The identifier an anonymous function default is named after.
    pub(crate) fn inferred_name(&self) -> Option<&'a str> {
        match self {
            ElementTarget::Name(id, _) => Some(id.name.as_str()),
            ElementTarget::Assignment(AssignmentTarget::Identifier(id)) => Some(id.name.as_str()),
            _ => None,
        }
    }

    /// Whether a reference has to be resolved for this target.
    pub(crate) fn needs_reference(&self) -> bool {
        match self {
            ElementTarget::Name(_, mode) => *mode == BindingMode::Reference,
            ElementTarget::BindingPattern(..) => false,
            ElementTarget::Assignment(target) => !matches!(target, AssignmentTarget::Pattern(_)),
        }
    }

    /// Whether the target is a nested pattern.
    pub(crate) fn is_pattern(&self) -> bool {
        matches!(
            self,
            ElementTarget::BindingPattern(..)
                | ElementTarget::Assignment(AssignmentTarget::Pattern(_))
        )
    }

    /// The target identifier, when the reference would be a plain name.
    pub(crate) fn reference_name(&self) -> Option<&'a str> {
        match self {
            ElementTarget::Name(id, BindingMode::Reference) => Some(id.name.as_str()),
            ElementTarget::Assignment(AssignmentTarget::Identifier(id)) => Some(id.name.as_str()),
            _ => None,
        }
    }
}

/// What consumes the value once an element has produced it.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Sink<'a> {
    /// Create and initialize `name` in a known environment
    Initialize(EnvironmentHandle, &'a str),
    /// A reference sits on the stack just below the value
    Put,
    /// The value feeds a nested binding pattern
    Binding(&'a BindingPattern, BindingMode),
    /// The value feeds a nested assignment pattern
    Assignment(&'a AssignmentPattern),
}

impl Sink<'_> {
    pub(crate) fn is_put(&self) -> bool {
        matches!(self, Sink::Put)
    }
}

impl<X: ExpressionCompiler> Compiler<X> {
    /// Resolves whatever has to be resolved before the value is produced.
    /// Pushes a reference for [`Sink::Put`], nothing otherwise.
    pub(crate) fn prepare_target<'a>(&mut self, target: ElementTarget<'a>) -> CompileResult<Sink<'a>> {
        match target {
            ElementTarget::Name(id, BindingMode::Direct(env)) => Ok(Sink::Initialize(env, &id.name)),
            ElementTarget::Name(id, BindingMode::Reference) => {
                self.emitter.resolve_binding(&id.name)?;
                Ok(Sink::Put)
            }
            ElementTarget::BindingPattern(pattern, mode) => Ok(Sink::Binding(pattern, mode)),
            ElementTarget::Assignment(AssignmentTarget::Identifier(id)) => {
                self.emitter.resolve_binding(&id.name)?;
                Ok(Sink::Put)
            }
            ElementTarget::Assignment(AssignmentTarget::Member(member)) => {
                self.compile_expression(&member.object)?;
                match &member.property {
                    MemberProperty::Static(name) => self.emitter.make_reference(Some(&name.name))?,
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        self.emitter.to_property_key()?;
                        self.emitter.make_reference(None)?;
                    }
                }
                Ok(Sink::Put)
            }
            ElementTarget::Assignment(AssignmentTarget::Pattern(pattern)) => {
                Ok(Sink::Assignment(pattern))
            }
        }
    }

    /// Consumes the value on top of the stack: `[(ref,) v] -> []`.
    pub(crate) fn complete_target(&mut self, sink: Sink<'_>) -> CompileResult<()> {
        match sink {
            Sink::Initialize(env, name) => {
                self.emitter.create_mutable_binding(env, name)?;
                self.emitter.initialize_binding(env, name)
            }
            Sink::Put => self.emitter.put_value(),
            Sink::Binding(pattern, mode) => self.binding_pattern(pattern, mode),
            Sink::Assignment(pattern) => self.assignment_pattern(pattern),
        }
    }
}
