// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The expression compiler seam.

use super::emitter::Emitter;
use super::scope::Scope;
use crate::ast::{Expression, Literal, MemberProperty, PropertyKey};
use crate::compiler::error::CompileResult;
use crate::runtime::value::Value;

/// Compiles sub-expressions for the pattern compiler.
///
/// An implementation must leave exactly one value on the operand stack and
/// keep the emitter's stack model in step with what it emits.
pub trait ExpressionCompiler {
    /// Compiles `expr`, pushing its value.
    fn compile_expression(
        &mut self,
        emitter: &mut Emitter,
        scope: &Scope,
        expr: &Expression,
    ) -> CompileResult<()>;
}

/// Handles the expressions that can appear inside patterns.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicExpressions;

impl ExpressionCompiler for BasicExpressions {
    fn compile_expression(
        &mut self,
        emitter: &mut Emitter,
        scope: &Scope,
        expr: &Expression,
    ) -> CompileResult<()> {
        match expr {
            Expression::Literal(literal) => match literal {
                Literal::Number(n) => emitter.load_constant(Value::Number(*n)),
                Literal::String(s) => emitter.load_constant(Value::String(s.clone())),
                Literal::Boolean(b) => emitter.load_boolean(*b),
                Literal::Null => emitter.load_constant(Value::Null),
                Literal::Undefined => emitter.load_undefined(),
            },
            Expression::Identifier(id) => emitter.load_binding(&id.name),
            Expression::Member(member) => {
                self.compile_expression(emitter, scope, &member.object)?;
                match &member.property {
                    MemberProperty::Static(name) => emitter.get_v(Some(&name.name)),
                    MemberProperty::Computed(key) => {
                        self.compile_expression(emitter, scope, key)?;
                        emitter.to_property_key()?;
                        emitter.get_v(None)
                    }
                }
            }
            Expression::Array(array) => {
                for element in &array.elements {
                    match element {
                        Some(element) => self.compile_expression(emitter, scope, element)?,
                        None => emitter.load_undefined()?,
                    }
                }
                emitter.new_array(array.elements.len())
            }
            Expression::Object(object) => {
                emitter.new_object()?;
                for property in &object.properties {
                    match &property.key {
                        PropertyKey::Static(key) => {
                            self.compile_expression(emitter, scope, &property.value)?;
                            emitter.init_property(Some(key))?;
                        }
                        PropertyKey::Computed(key) => {
                            self.compile_expression(emitter, scope, key)?;
                            emitter.to_property_key()?;
                            self.compile_expression(emitter, scope, &property.value)?;
                            emitter.init_property(None)?;
                        }
                    }
                }
                Ok(())
            }
            Expression::Function(func) => {
                emitter.create_function(func.id.as_ref().map(|id| id.name.as_str()), func.kind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionKind, MemberExpression};
    use crate::compiler::bytecode::OpCode;

    fn compile(expr: &Expression) -> Vec<OpCode> {
        let mut emitter = Emitter::new();
        BasicExpressions
            .compile_expression(&mut emitter, &Scope::new(), expr)
            .unwrap();
        assert_eq!(emitter.stack().depth(), 1);
        emitter.finish(false).unwrap().opcodes()
    }

    #[test]
    fn test_literals() {
        assert_eq!(compile(&Expression::number(1.0)), vec![OpCode::LoadConst, OpCode::Halt]);
        assert_eq!(
            compile(&Expression::Literal(Literal::Null)),
            vec![OpCode::LoadNull, OpCode::Halt]
        );
    }

    #[test]
    fn test_computed_member() {
        let expr = Expression::Member(MemberExpression::computed(
            Expression::ident("o"),
            Expression::ident("k"),
        ));
        assert_eq!(
            compile(&expr),
            vec![
                OpCode::LoadBinding,
                OpCode::LoadBinding,
                OpCode::ToPropertyKey,
                OpCode::GetV,
                OpCode::Halt
            ]
        );
    }

    #[test]
    fn test_object_and_array_literals() {
        let expr = Expression::object(vec![(
            "a",
            Expression::array(vec![Expression::number(1.0), Expression::number(2.0)]),
        )]);
        assert_eq!(
            compile(&expr),
            vec![
                OpCode::NewObject,
                OpCode::LoadConst,
                OpCode::LoadConst,
                OpCode::NewArray,
                OpCode::InitProperty,
                OpCode::Halt
            ]
        );
    }

    #[test]
    fn test_function() {
        assert_eq!(
            compile(&Expression::anonymous(FunctionKind::Arrow)),
            vec![OpCode::CreateFunction, OpCode::Halt]
        );
    }
}
