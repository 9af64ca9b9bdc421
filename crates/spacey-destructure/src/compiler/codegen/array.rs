// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Array patterns and positional parameter lists.
//!
//! An array pattern owns one iterator for its whole run. Every elision and
//! positional element advances it once; a rest element drains it. If
//! anything throws while the iterator is still open, the handler closes it
//! before the exception continues.

use tracing::trace;

use super::binding::{BindingMode, ElementTarget};
use super::emitter::Temp;
use super::{Compiler, ExpressionCompiler};
use crate::ast::{BindingElementItem, Expression, FormalParameters};
use crate::compiler::error::{CompileError, CompileResult};

/// One slot of an array-shaped pattern, binding or assignment.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ElementView<'a> {
    /// Advance and discard
    Elision,
    /// Advance, default, store
    Element(ElementTarget<'a>, Option<&'a Expression>),
    /// Drain into an array, store
    Rest(ElementTarget<'a>),
}

impl ElementView<'_> {
    /// Whether anything after the iterator step can raise an exception, so
    /// an abrupt exit has to close the iterator.
    fn may_throw(&self) -> bool {
        match self {
            ElementView::Elision => false,
            ElementView::Element(target, default) => {
                default.is_some() || target.is_pattern() || target.needs_reference()
            }
            ElementView::Rest(target) => target.is_pattern() || target.needs_reference(),
        }
    }
}

/// Views of an array binding pattern's elements.
pub(crate) fn binding_elements(
    elements: &[BindingElementItem],
    mode: BindingMode,
) -> CompileResult<Vec<ElementView<'_>>> {
    let views = elements
        .iter()
        .map(|item| match item {
            BindingElementItem::Elision => ElementView::Elision,
            BindingElementItem::Element(element) => ElementView::Element(
                ElementTarget::from_binding(&element.target, mode),
                element.default.as_ref(),
            ),
            BindingElementItem::Rest(target) => {
                ElementView::Rest(ElementTarget::from_binding(target, mode))
            }
        })
        .collect::<Vec<_>>();
    check_rest_is_last(&views)?;
    Ok(views)
}

/// Views of a formal parameter list.
pub(crate) fn parameter_elements(
    parameters: &FormalParameters,
    mode: BindingMode,
) -> Vec<ElementView<'_>> {
    parameters
        .items
        .iter()
        .map(|item| {
            ElementView::Element(
                ElementTarget::from_binding(&item.target, mode),
                item.default.as_ref(),
            )
        })
        .chain(
            parameters
                .rest
                .iter()
                .map(|rest| ElementView::Rest(ElementTarget::from_binding(rest, mode))),
        )
        .collect()
}

pub(crate) fn check_rest_is_last(views: &[ElementView<'_>]) -> CompileResult<()> {
    let misplaced = views
        .iter()
        .rev()
        .skip(1)
        .any(|view| matches!(view, ElementView::Rest(_)));
    if misplaced {
        return Err(CompileError::MalformedPattern(
            "rest element must be the last element".into(),
        ));
    }
    Ok(())
}

impl<X: ExpressionCompiler> Compiler<X> {
    /// Destructures the value on top of the stack through its iterator:
    /// `[v] -> []`.
    pub(crate) fn iterable_pattern(&mut self, elements: &[ElementView<'_>]) -> CompileResult<()> {
        let cursor = self.emitter.get_iterator()?;
        let guarded =
            !self.options.elide_close_guards || elements.iter().any(ElementView::may_throw);
        trace!(guarded, elements = elements.len(), "iterable pattern");

        if !guarded {
            let drained = self.iterator_elements(elements, cursor)?;
            if !drained {
                self.emitter.iterator_close(cursor)?;
            }
            self.emitter.free_temp(cursor);
            return Ok(());
        }

        let region = self.emitter.enter_try();
        let drained = self.iterator_elements(elements, cursor)?;
        self.emitter.leave_try()?;
        if !drained {
            self.emitter.iterator_close(cursor)?;
        }
        let done = self.emitter.jump();
        let after = self.emitter.stack_snapshot();

        self.emitter.begin_handler(region)?;
        self.emitter.iterator_close_on_throw(cursor)?;
        self.emitter.rethrow();

        self.emitter.restore_stack(after);
        self.emitter.patch_jump(done)?;
        self.emitter.free_temp(cursor);
        Ok(())
    }

    /// Matches `elements` against the iterator in `cursor`. Returns true if
    /// the last element drained the iterator.
    pub(crate) fn iterator_elements(
        &mut self,
        elements: &[ElementView<'_>],
        cursor: Temp,
    ) -> CompileResult<bool> {
        for element in elements {
            match *element {
                ElementView::Elision => {
                    self.emitter.iterator_step(cursor)?;
                    self.emitter.pop()?;
                }
                ElementView::Element(target, default) => {
                    let sink = self.prepare_target(target)?;
                    self.emitter.iterator_step(cursor)?;
                    self.apply_default(default, target.inferred_name())?;
                    self.complete_target(sink)?;
                }
                ElementView::Rest(target) => {
                    let sink = self.prepare_target(target)?;
                    self.emitter.iterator_drain(cursor)?;
                    self.complete_target(sink)?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
