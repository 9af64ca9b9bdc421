// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Destructuring assignment.
//!
//! Same shapes as binding patterns, but every leaf is an existing assignable
//! target. A non-pattern target is evaluated to a reference before its value
//! is read from the source, and written only after the default is applied;
//! the reference stays on the operand stack in between.

use tracing::debug;

use super::array::{self, ElementView};
use super::binding::ElementTarget;
use super::object::PropertyView;
use super::{Compiler, ExpressionCompiler};
use crate::ast::{AssignmentElementItem, AssignmentPattern, ObjectAssignmentPattern};
use crate::compiler::error::CompileResult;

fn assignment_elements(elements: &[AssignmentElementItem]) -> CompileResult<Vec<ElementView<'_>>> {
    let views = elements
        .iter()
        .map(|item| match item {
            AssignmentElementItem::Elision => ElementView::Elision,
            AssignmentElementItem::Element(element) => ElementView::Element(
                ElementTarget::Assignment(&element.target),
                element.default.as_ref(),
            ),
            AssignmentElementItem::Rest(target) => ElementView::Rest(ElementTarget::Assignment(target)),
        })
        .collect::<Vec<_>>();
    array::check_rest_is_last(&views)?;
    Ok(views)
}

fn assignment_properties(
    pattern: &ObjectAssignmentPattern,
) -> (Vec<PropertyView<'_>>, Option<ElementTarget<'_>>) {
    let properties = pattern
        .properties
        .iter()
        .map(|property| PropertyView {
            key: &property.key,
            target: ElementTarget::Assignment(&property.target),
            default: property.default.as_ref(),
        })
        .collect();
    (properties, pattern.rest.as_ref().map(ElementTarget::Assignment))
}

impl<X: ExpressionCompiler> Compiler<X> {
    /// `[v] -> []`
    pub(crate) fn assignment_pattern(&mut self, pattern: &AssignmentPattern) -> CompileResult<()> {
        match pattern {
            AssignmentPattern::Array(array) => {
                debug!(elements = array.elements.len(), "array assignment pattern");
                let elements = assignment_elements(&array.elements)?;
                self.iterable_pattern(&elements)
            }
            AssignmentPattern::Object(object) => {
                debug!(
                    properties = object.properties.len(),
                    rest = object.rest.is_some(),
                    "object assignment pattern"
                );
                let (properties, rest) = assignment_properties(object);
                self.object_pattern(&properties, rest)
            }
        }
    }
}
