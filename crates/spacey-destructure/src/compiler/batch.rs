// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Self-contained compile units and batch compilation.
//!
//! A unit pairs a source expression with the pattern it feeds, which is
//! enough to produce a runnable chunk. Units share nothing, so a batch can
//! be compiled on as many threads as `rayon` offers.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::bytecode::Bytecode;
use super::codegen::{BindingMode, Compiler};
use super::error::CompileResult;
use super::options::CompileOptions;
use crate::ast::{AssignmentPattern, BindingPattern, Expression, FormalParameters};

/// A source expression and the pattern its value is matched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileUnit {
    /// Label for diagnostics
    #[serde(default)]
    pub name: Option<String>,
    /// Produces the value being destructured
    pub source: Expression,
    /// What the value is matched against
    pub target: UnitTarget,
    /// Names static analysis proved to be unshadowable locals
    #[serde(default)]
    pub locals: Vec<String>,
}

/// The pattern half of a [`CompileUnit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitTarget {
    /// `let <pattern> = source`
    Binding {
        /// The pattern
        pattern: BindingPattern,
        /// How identifiers are bound
        mode: BindingMode,
    },
    /// `<pattern> = source`
    Assignment {
        /// The pattern
        pattern: AssignmentPattern,
    },
    /// `function (<parameters>) {}` called with the elements of `source`
    Parameters {
        /// The parameter list
        parameters: FormalParameters,
        /// How identifiers are bound
        mode: BindingMode,
    },
}

impl CompileUnit {
    /// A binding unit.
    pub fn binding(pattern: BindingPattern, mode: BindingMode, source: Expression) -> Self {
        Self {
            name: None,
            source,
            target: UnitTarget::Binding { pattern, mode },
            locals: Vec::new(),
        }
    }

    /// An assignment unit.
    pub fn assignment(pattern: AssignmentPattern, source: Expression) -> Self {
        Self {
            name: None,
            source,
            target: UnitTarget::Assignment { pattern },
            locals: Vec::new(),
        }
    }

    /// A parameter-list unit; `arguments` must be iterable.
    pub fn parameters(parameters: FormalParameters, mode: BindingMode, arguments: Expression) -> Self {
        Self {
            name: None,
            source: arguments,
            target: UnitTarget::Parameters { parameters, mode },
            locals: Vec::new(),
        }
    }

    /// Declares names as unshadowable locals.
    pub fn with_locals<I, S>(mut self, locals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locals.extend(locals.into_iter().map(Into::into));
        self
    }
}

/// Compiles one unit to a runnable chunk.
#[instrument(level = "debug", skip_all, fields(name = unit.name.as_deref().unwrap_or("<unit>")))]
pub fn compile_unit(unit: &CompileUnit, options: &CompileOptions) -> CompileResult<Bytecode> {
    let mut compiler = Compiler::with_options(*options);
    for local in &unit.locals {
        compiler.scope.declare(local.as_str());
    }

    compiler.compile_expression(&unit.source)?;
    match &unit.target {
        UnitTarget::Binding { pattern, mode } => {
            compiler.compile_binding_initialization(pattern, *mode)?
        }
        UnitTarget::Assignment { pattern } => compiler.compile_destructuring_assignment(pattern)?,
        UnitTarget::Parameters { parameters, mode } => {
            let cursor = compiler.emitter.get_iterator()?;
            compiler.compile_iterator_binding_initialization(parameters, cursor, *mode)?;
            compiler.emitter.free_temp(cursor);
        }
    }
    compiler.finish()
}

/// Compiles independent units, in parallel when the `parallel` feature is on.
/// Results come back in input order.
pub fn compile_batch(units: &[CompileUnit], options: &CompileOptions) -> Vec<CompileResult<Bytecode>> {
    debug!(units = units.len(), "compiling batch");

    #[cfg(feature = "parallel")]
    {
        units
            .par_iter()
            .map(|unit| compile_unit(unit, options))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        units.iter().map(|unit| compile_unit(unit, options)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BindingElementItem, BindingProperty};
    use crate::compiler::bytecode::{EnvironmentHandle, OpCode};

    const LEXICAL: BindingMode = BindingMode::Direct(EnvironmentHandle::Lexical);

    #[test]
    fn test_units_round_trip_through_json() {
        let unit = CompileUnit::binding(
            BindingPattern::object(vec![BindingProperty::shorthand("a")], Some("rest")),
            LEXICAL,
            Expression::ident("value"),
        );
        let json = serde_json::to_string(&unit).unwrap();
        let back: CompileUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unit);
    }

    #[test]
    fn test_batch_preserves_order() {
        let units = vec![
            CompileUnit::binding(
                BindingPattern::array(vec![BindingElementItem::ident("a")]),
                LEXICAL,
                Expression::array(vec![]),
            ),
            CompileUnit::binding(
                BindingPattern::object(vec![BindingProperty::shorthand("b")], None),
                LEXICAL,
                Expression::object::<&str>(vec![]),
            ),
        ];
        let results = compile_batch(&units, &CompileOptions::default());
        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        let second = results[1].as_ref().unwrap();
        assert_eq!(first.count(OpCode::GetIterator), 1);
        assert_eq!(second.count(OpCode::RequireObjectCoercible), 1);
    }

    #[test]
    fn test_malformed_unit_fails_alone() {
        let units = vec![
            CompileUnit::binding(
                BindingPattern::array(vec![
                    BindingElementItem::rest(crate::ast::Binding::ident("r")),
                    BindingElementItem::ident("late"),
                ]),
                LEXICAL,
                Expression::array(vec![]),
            ),
            CompileUnit::binding(
                BindingPattern::array(vec![BindingElementItem::ident("ok")]),
                LEXICAL,
                Expression::array(vec![]),
            ),
        ];
        let results = compile_batch(&units, &CompileOptions::default());
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }
}
