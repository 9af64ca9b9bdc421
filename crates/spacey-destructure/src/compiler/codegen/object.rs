// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object patterns: keyed properties, the consumed-key set and rest objects.
//!
//! The source object stays on the operand stack for the whole pattern. Each
//! property works on a copy of it and leaves the stack as it found it; the
//! rest element (or a final `Pop`) consumes the original.

use tracing::trace;

use super::binding::{BindingMode, ElementTarget, Sink};
use super::emitter::Temp;
use super::stack::StackEntry;
use super::{Compiler, ExpressionCompiler};
use crate::ast::{Expression, ObjectBindingPattern, PropertyName};
use crate::compiler::error::CompileResult;

/// One non-rest property of an object-shaped pattern.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PropertyView<'a> {
    pub key: &'a PropertyName,
    pub target: ElementTarget<'a>,
    pub default: Option<&'a Expression>,
}

/// Views of an object binding pattern.
pub(crate) fn binding_properties(
    pattern: &ObjectBindingPattern,
    mode: BindingMode,
) -> (Vec<PropertyView<'_>>, Option<ElementTarget<'_>>) {
    let properties = pattern
        .properties
        .iter()
        .map(|property| PropertyView {
            key: &property.key,
            target: ElementTarget::from_binding(&property.target, mode),
            default: property.default.as_ref(),
        })
        .collect();
    let rest = pattern.rest.as_ref().map(|id| ElementTarget::Name(id, mode));
    (properties, rest)
}

impl<X: ExpressionCompiler> Compiler<X> {
    /// Destructures the value on top of the stack by property: `[v] -> []`.
    pub(crate) fn object_pattern(
        &mut self,
        properties: &[PropertyView<'_>],
        rest: Option<ElementTarget<'_>>,
    ) -> CompileResult<()> {
        self.emitter.require_object_coercible()?;

        let keys = if !properties.is_empty() && rest.is_some() {
            Some(self.emitter.new_key_set()?)
        } else {
            None
        };

        for property in properties {
            self.keyed_property(property, keys)?;
        }

        match rest {
            Some(target) => self.object_rest(target, keys)?,
            None => self.emitter.pop()?,
        }
        if let Some(keys) = keys {
            self.emitter.free_temp(keys);
        }
        Ok(())
    }

    /// Whether the target's reference may be resolved before the key is
    /// evaluated without anyone being able to tell.
    ///
    /// A literal key runs no script. A computed key can run arbitrary script,
    /// which could create or delete the binding the name resolves to, unless
    /// the name is a local that nothing at runtime can shadow.
    fn may_resolve_before_key(&self, key: &PropertyName, target: &ElementTarget<'_>) -> bool {
        if !self.options.hoist_references || !target.needs_reference() {
            return false;
        }
        match key {
            PropertyName::Literal(_) => true,
            PropertyName::Computed(_) => target
                .reference_name()
                .is_some_and(|name| self.scope.is_unobservable_local(name)),
        }
    }

    /// One property: key, record, read, default, store. `[obj] -> [obj]`.
    fn keyed_property(&mut self, property: &PropertyView<'_>, keys: Option<Temp>) -> CompileResult<()> {
        let hoisted = self.may_resolve_before_key(property.key, &property.target);
        trace!(hoisted, key = ?property.key.as_literal(), "keyed property");

        let sink = if hoisted {
            let sink = self.prepare_target(property.target)?;
            // [obj, ref] -> [obj, ref, obj]
            self.emitter.over()?;
            self.property_key(property.key, keys)?;
            self.read_property(property.key)?;
            sink
        } else {
            self.emitter.dup()?;
            self.property_key(property.key, keys)?;
            if property.target.needs_reference() {
                self.read_through_reference(property)?
            } else {
                self.read_property(property.key)?;
                self.prepare_target(property.target)?
            }
        };

        self.apply_default(property.default, property.target.inferred_name())?;
        self.complete_target(sink)
    }

    /// Evaluates a computed key and records the key in the consumed set.
    /// Pushes the coerced key for computed names, nothing for literals.
    fn property_key(&mut self, key: &PropertyName, keys: Option<Temp>) -> CompileResult<()> {
        match key {
            PropertyName::Literal(name) => {
                if let Some(keys) = keys {
                    self.emitter.record_key(keys, Some(name))?;
                }
            }
            PropertyName::Computed(expr) => {
                self.compile_expression(expr)?;
                self.emitter.to_property_key()?;
                if let Some(keys) = keys {
                    self.emitter.record_key(keys, None)?;
                }
            }
        }
        Ok(())
    }

    /// `[obj] -> [v]` or `[obj, key] -> [v]`
    fn read_property(&mut self, key: &PropertyName) -> CompileResult<()> {
        self.emitter.get_v(key.as_literal())
    }

    /// Resolves the target after the key, parking a computed key in a
    /// temporary while the reference is built:
    /// `[obj, obj(, key)] -> [obj, ref, v]`.
    fn read_through_reference<'a>(&mut self, property: &PropertyView<'a>) -> CompileResult<Sink<'a>> {
        let parked = match property.key {
            PropertyName::Literal(_) => None,
            PropertyName::Computed(_) => {
                let temp = self.emitter.alloc_temp(StackEntry::Key)?;
                self.emitter.store_local(temp)?;
                Some(temp)
            }
        };

        let sink = self.prepare_target(property.target)?;
        // [obj, obj, ref] -> [obj, ref, obj]
        self.emitter.swap()?;

        if let Some(temp) = parked {
            self.emitter.load_local(temp)?;
            self.emitter.free_temp(temp);
        }
        self.read_property(property.key)?;
        Ok(sink)
    }

    /// Builds the rest object from the source on top of the stack and
    /// stores it: `[obj] -> []`.
    ///
    /// For an assignment to a plain identifier the rest object is built
    /// before the reference is resolved. Every other target is resolved
    /// first.
    pub(crate) fn object_rest(&mut self, target: ElementTarget<'_>, keys: Option<Temp>) -> CompileResult<()> {
        let copy_first = target.reference_name().is_some()
            && matches!(target, ElementTarget::Assignment(_));

        if copy_first {
            self.emitter.copy_data_properties(keys)?;
            let sink = self.prepare_target(target)?;
            // [copy, ref] -> [ref, copy]
            self.emitter.swap()?;
            return self.complete_target(sink);
        }

        let sink = self.prepare_target(target)?;
        if sink.is_put() {
            // [obj, ref] -> [ref, obj]
            self.emitter.swap()?;
        }
        self.emitter.copy_data_properties(keys)?;
        self.complete_target(sink)
    }
}
