// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Syntax trees consumed by the pattern compiler.
//!
//! The parser produces these once; the compiler only reads them. Node shapes
//! follow ESTree naming where it does not get in the way, and every node
//! serializes to externally tagged JSON so trees can be stored and replayed.

mod pattern;

pub use pattern::*;

use serde::{Deserialize, Serialize};

/// An identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

impl Identifier {
    /// Creates an identifier with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The subset of expressions that can appear inside patterns: defaults,
/// computed keys and member targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(Identifier),
    /// Member access (a.b or a[b])
    Member(MemberExpression),
    /// Array literal
    Array(ArrayExpression),
    /// Object literal
    Object(ObjectExpression),
    /// Function, arrow or class expression
    Function(FunctionExpression),
}

impl Expression {
    /// Number literal.
    pub fn number(n: f64) -> Self {
        Expression::Literal(Literal::Number(n))
    }

    /// String literal.
    pub fn string(s: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(s.into()))
    }

    /// Identifier reference.
    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Identifier(Identifier::new(name))
    }

    /// Static member access `object.property`.
    pub fn member(object: Expression, property: impl Into<String>) -> Self {
        Expression::Member(MemberExpression::named(object, property))
    }

    /// Array literal with no holes.
    pub fn array(elements: Vec<Expression>) -> Self {
        Expression::Array(ArrayExpression {
            elements: elements.into_iter().map(Some).collect(),
        })
    }

    /// Object literal with static keys.
    pub fn object<K: Into<String>>(properties: Vec<(K, Expression)>) -> Self {
        Expression::Object(ObjectExpression {
            properties: properties
                .into_iter()
                .map(|(key, value)| Property {
                    key: PropertyKey::Static(key.into()),
                    value,
                })
                .collect(),
        })
    }

    /// Anonymous function expression of the given kind.
    pub fn anonymous(kind: FunctionKind) -> Self {
        Expression::Function(FunctionExpression { id: None, kind })
    }

    /// Returns true for an anonymous function or class definition, the
    /// syntactic form that receives its name from the binding it initializes.
    pub fn is_anonymous_function_definition(&self) -> bool {
        match self {
            Expression::Function(func) => func.kind == FunctionKind::Arrow || func.id.is_none(),
            _ => false,
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null
    Null,
    /// undefined (as a literal, for convenience)
    Undefined,
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpression {
    /// The object being accessed
    pub object: Box<Expression>,
    /// The property being accessed
    pub property: MemberProperty,
}

impl MemberExpression {
    /// `object.property`
    pub fn named(object: Expression, property: impl Into<String>) -> Self {
        Self {
            object: Box::new(object),
            property: MemberProperty::Static(Identifier::new(property)),
        }
    }

    /// `object[property]`
    pub fn computed(object: Expression, property: Expression) -> Self {
        Self {
            object: Box::new(object),
            property: MemberProperty::Computed(Box::new(property)),
        }
    }
}

/// The property half of a member access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberProperty {
    /// Dot access
    Static(Identifier),
    /// Bracket access
    Computed(Box<Expression>),
}

/// An array literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayExpression {
    /// The elements (None for holes)
    pub elements: Vec<Option<Expression>>,
}

/// An object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectExpression {
    /// The properties
    pub properties: Vec<Property>,
}

/// An object literal property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// The property key
    pub key: PropertyKey,
    /// The property value
    pub value: Expression,
}

/// An object literal key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKey {
    /// Identifier, string or numeric key, already in canonical string form
    Static(String),
    /// `[expr]`
    Computed(Box<Expression>),
}

/// A function-like value. Bodies never matter to pattern compilation, so
/// only the name and flavour are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpression {
    /// The function's own name, if any
    pub id: Option<Identifier>,
    /// Which syntactic form produced it
    pub kind: FunctionKind,
}

/// Syntactic flavour of a function-like expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    /// `function () {}`
    Normal,
    /// `() => {}`
    Arrow,
    /// `async function () {}`
    Async,
    /// `function* () {}`
    Generator,
    /// `class {}`
    Class,
}
