// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime value representation.

use std::fmt;

use super::reference::Reference;

/// A runtime value.
///
/// The first six variants are language values. The remaining ones are
/// interpreter-internal handles that only ever live in temporaries or on the
/// operand stack; compiled code never hands them to script.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Heap object handle
    Object(usize),
    /// Resolved reference waiting for `PutValue`
    Reference(Box<Reference>),
    /// Iterator record handle
    Iterator(usize),
    /// Consumed-key set handle
    KeySet(usize),
    /// Environment record handle
    Environment(usize),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN != NaN
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Iterator(a), Value::Iterator(b)) => a == b,
            (Value::KeySet(a), Value::KeySet(b)) => a == b,
            (Value::Environment(a), Value::Environment(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true for values script can observe.
    pub fn is_language_value(&self) -> bool {
        !matches!(
            self,
            Value::Reference(_) | Value::Iterator(_) | Value::KeySet(_) | Value::Environment(_)
        )
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Reference(_) | Value::Iterator(_) | Value::KeySet(_) | Value::Environment(_) => {
                "internal"
            }
        }
    }

    /// ToPropertyKey for primitives. Objects need the heap and are handled by
    /// the interpreter.
    pub fn primitive_key(&self) -> Option<String> {
        match self {
            Value::Undefined => Some("undefined".to_string()),
            Value::Null => Some("null".to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Number(n) => Some(number_to_string(*n)),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Number-to-string conversion for property keys and display: the shortest
/// digits that round-trip, with exponent form outside `[1e-6, 1e21)`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // -0 prints as 0
        "0".to_string()
    } else {
        ryu_js::Buffer::new().format_finite(n).to_string()
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Reference(reference) => write!(f, "<reference {}>", reference.name()),
            Value::Iterator(id) => write!(f, "<iterator #{}>", id),
            Value::KeySet(id) => write!(f, "<key set #{}>", id),
            Value::Environment(id) => write!(f, "<environment #{}>", id),
        }
    }
}
