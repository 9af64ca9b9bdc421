// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Binding and assignment patterns.

use serde::{Deserialize, Serialize};

use super::{Expression, Identifier, MemberExpression};

// ============================================================================
// Binding patterns (declarations and parameters)
// ============================================================================

/// A destructuring pattern that introduces bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingPattern {
    /// `[a, , b = 1, ...c]`
    Array(ArrayBindingPattern),
    /// `{a, b: c, [k]: d, ...e}`
    Object(ObjectBindingPattern),
}

impl BindingPattern {
    /// Array pattern from its elements.
    pub fn array(elements: Vec<BindingElementItem>) -> Self {
        BindingPattern::Array(ArrayBindingPattern { elements })
    }

    /// Object pattern from its properties and optional rest identifier.
    pub fn object(properties: Vec<BindingProperty>, rest: Option<&str>) -> Self {
        BindingPattern::Object(ObjectBindingPattern {
            properties,
            rest: rest.map(Identifier::new),
        })
    }
}

/// An array binding pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayBindingPattern {
    /// The elements in source order; a rest element may only come last
    pub elements: Vec<BindingElementItem>,
}

/// One slot of an array binding pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingElementItem {
    /// A hole: `[, a]`
    Elision,
    /// A positional element with an optional default
    Element(BindingElement),
    /// `...target`
    Rest(Binding),
}

impl BindingElementItem {
    /// Positional identifier element without default.
    pub fn ident(name: &str) -> Self {
        BindingElementItem::Element(BindingElement::new(Binding::ident(name), None))
    }

    /// Positional element with a default.
    pub fn with_default(target: Binding, default: Expression) -> Self {
        BindingElementItem::Element(BindingElement::new(target, Some(default)))
    }

    /// Rest element.
    pub fn rest(target: Binding) -> Self {
        BindingElementItem::Rest(target)
    }
}

/// A binding target plus its optional default. Also the shape of a single
/// formal parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingElement {
    /// Where the value goes
    pub target: Binding,
    /// Used when the incoming value is exactly undefined
    pub default: Option<Expression>,
}

impl BindingElement {
    /// Creates a binding element.
    pub fn new(target: Binding, default: Option<Expression>) -> Self {
        Self { target, default }
    }
}

/// The target of a binding element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// A plain name
    Identifier(Identifier),
    /// A nested pattern
    Pattern(Box<BindingPattern>),
}

impl Binding {
    /// Plain identifier binding.
    pub fn ident(name: &str) -> Self {
        Binding::Identifier(Identifier::new(name))
    }

    /// Nested pattern binding.
    pub fn pattern(pattern: BindingPattern) -> Self {
        Binding::Pattern(Box::new(pattern))
    }
}

/// An object binding pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectBindingPattern {
    /// The non-rest properties in source order
    pub properties: Vec<BindingProperty>,
    /// `...rest`, always syntactically last
    pub rest: Option<Identifier>,
}

/// One property of an object binding pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingProperty {
    /// The property read from the source
    pub key: PropertyName,
    /// Where the value goes
    pub target: Binding,
    /// Used when the property value is exactly undefined
    pub default: Option<Expression>,
}

impl BindingProperty {
    /// Shorthand `{name}`.
    pub fn shorthand(name: &str) -> Self {
        Self {
            key: PropertyName::literal(name),
            target: Binding::ident(name),
            default: None,
        }
    }

    /// `{key: target}` with an optional default.
    pub fn new(key: PropertyName, target: Binding, default: Option<Expression>) -> Self {
        Self {
            key,
            target,
            default,
        }
    }
}

/// The key of an object pattern property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyName {
    /// Identifier, string or numeric key in canonical string form
    Literal(String),
    /// `[expr]`
    Computed(Box<Expression>),
}

impl PropertyName {
    /// Literal key.
    pub fn literal(name: &str) -> Self {
        PropertyName::Literal(name.to_string())
    }

    /// Computed key.
    pub fn computed(expr: Expression) -> Self {
        PropertyName::Computed(Box::new(expr))
    }

    /// The literal key text, if this key is known at compile time.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            PropertyName::Literal(name) => Some(name),
            PropertyName::Computed(_) => None,
        }
    }
}

/// A function's formal parameter list, bound positionally from an argument
/// cursor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormalParameters {
    /// Positional parameters
    pub items: Vec<BindingElement>,
    /// `...rest`
    pub rest: Option<Binding>,
}

// ============================================================================
// Assignment patterns
// ============================================================================

/// A destructuring pattern on the left of `=`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignmentPattern {
    /// `[a, obj.b, ...c] = v`
    Array(ArrayAssignmentPattern),
    /// `({a, b: obj.c, ...d} = v)`
    Object(ObjectAssignmentPattern),
}

impl AssignmentPattern {
    /// Array pattern from its elements.
    pub fn array(elements: Vec<AssignmentElementItem>) -> Self {
        AssignmentPattern::Array(ArrayAssignmentPattern { elements })
    }

    /// Object pattern from its properties and optional rest target.
    pub fn object(properties: Vec<AssignmentProperty>, rest: Option<AssignmentTarget>) -> Self {
        AssignmentPattern::Object(ObjectAssignmentPattern { properties, rest })
    }
}

/// An array assignment pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayAssignmentPattern {
    /// The elements in source order; a rest element may only come last
    pub elements: Vec<AssignmentElementItem>,
}

/// One slot of an array assignment pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignmentElementItem {
    /// A hole
    Elision,
    /// A positional target with an optional default
    Element(AssignmentElement),
    /// `...target`
    Rest(AssignmentTarget),
}

impl AssignmentElementItem {
    /// Positional target without default.
    pub fn target(target: AssignmentTarget) -> Self {
        AssignmentElementItem::Element(AssignmentElement {
            target,
            default: None,
        })
    }

    /// Positional target with a default.
    pub fn with_default(target: AssignmentTarget, default: Expression) -> Self {
        AssignmentElementItem::Element(AssignmentElement {
            target,
            default: Some(default),
        })
    }
}

/// An assignment target plus its optional default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentElement {
    /// Where the value goes
    pub target: AssignmentTarget,
    /// Used when the incoming value is exactly undefined
    pub default: Option<Expression>,
}

/// Anything that can be assigned to inside a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignmentTarget {
    /// An identifier reference
    Identifier(Identifier),
    /// A property access
    Member(MemberExpression),
    /// A nested pattern
    Pattern(Box<AssignmentPattern>),
}

impl AssignmentTarget {
    /// Identifier target.
    pub fn ident(name: &str) -> Self {
        AssignmentTarget::Identifier(Identifier::new(name))
    }

    /// Nested pattern target.
    pub fn pattern(pattern: AssignmentPattern) -> Self {
        AssignmentTarget::Pattern(Box::new(pattern))
    }
}

/// An object assignment pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAssignmentPattern {
    /// The non-rest properties in source order
    pub properties: Vec<AssignmentProperty>,
    /// `...target`, always syntactically last
    pub rest: Option<AssignmentTarget>,
}

/// One property of an object assignment pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentProperty {
    /// The property read from the source
    pub key: PropertyName,
    /// Where the value goes
    pub target: AssignmentTarget,
    /// Used when the property value is exactly undefined
    pub default: Option<Expression>,
}

impl AssignmentProperty {
    /// Shorthand `{name}`.
    pub fn shorthand(name: &str) -> Self {
        Self {
            key: PropertyName::literal(name),
            target: AssignmentTarget::ident(name),
            default: None,
        }
    }

    /// `{key: target}` with an optional default.
    pub fn new(key: PropertyName, target: AssignmentTarget, default: Option<Expression>) -> Self {
        Self {
            key,
            target,
            default,
        }
    }
}
