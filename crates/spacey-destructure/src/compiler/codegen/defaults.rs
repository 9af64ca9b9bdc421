// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Default values and inferred function names.

use super::{Compiler, ExpressionCompiler};
use crate::ast::Expression;
use crate::compiler::error::CompileResult;

impl<X: ExpressionCompiler> Compiler<X> {
    /// Replaces the value on top of the stack with `default` when it is
    /// exactly undefined: `[v] -> [v']`.
    ///
    /// `name` is the plain identifier the value is headed for, if any; an
    /// anonymous function or class default takes that name.
    pub(crate) fn apply_default(
        &mut self,
        default: Option<&Expression>,
        name: Option<&str>,
    ) -> CompileResult<()> {
        let Some(default) = default else {
            return Ok(());
        };

        let present = self.emitter.jump_if_not_undefined()?;
        self.emitter.pop()?;
        self.compile_expression(default)?;
        if let Some(name) = name
            && default.is_anonymous_function_definition()
        {
            self.emitter.set_function_name(name)?;
        }
        self.emitter.patch_jump(present)
    }
}
