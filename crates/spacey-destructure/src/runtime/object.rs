// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object heap and property tables.

use indexmap::IndexMap;

use super::iterator::IterableSpec;
use super::value::Value;
use crate::Error;
use crate::ast::FunctionKind;

/// How far past the end a write may grow the dense element vector. Indices
/// beyond that are kept as sparse entries in the property table.
const MAX_DENSE_GAP: usize = 1024;

/// A data property.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// The property value
    pub value: Value,
    /// Whether the property is writable
    pub writable: bool,
    /// Whether the property shows up in own-key enumeration
    pub enumerable: bool,
}

impl PropertyDescriptor {
    /// A plain writable, enumerable data property.
    pub fn data(value: Value) -> Self {
        Self {
            value,
            writable: true,
            enumerable: true,
        }
    }
}

/// What kind of object a heap cell holds.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// A plain object
    Ordinary,
    /// An array; elements past a large gap live in the property table
    Array(Vec<Value>),
    /// A function or class value
    Function {
        /// The `name` property; empty until a name is assigned
        name: String,
        /// Syntactic flavour
        kind: FunctionKind,
    },
    /// A programmable iterable used to observe the iterator protocol
    Iterable(IterableSpec),
}

/// A heap object.
#[derive(Debug, Clone)]
pub struct JsObject {
    /// The object kind
    pub kind: ObjectKind,
    /// Named properties in insertion order
    properties: IndexMap<String, PropertyDescriptor>,
}

impl JsObject {
    /// Creates an object of the given kind with no named properties.
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            properties: IndexMap::new(),
        }
    }

    /// Creates an empty plain object.
    pub fn ordinary() -> Self {
        Self::new(ObjectKind::Ordinary)
    }

    /// Reads an own property.
    pub fn get_own(&self, key: &str) -> Option<Value> {
        match &self.kind {
            ObjectKind::Array(elements) => {
                if key == "length" {
                    return Some(Value::Number(self.array_length() as f64));
                }
                if let Some(value) = array_index(key).and_then(|i| elements.get(i as usize)) {
                    return Some(value.clone());
                }
            }
            ObjectKind::Function { name, .. } if key == "name" => {
                return Some(Value::String(name.clone()));
            }
            _ => {}
        }
        self.properties.get(key).map(|p| p.value.clone())
    }

    /// Returns true if the object has an own property with this key.
    pub fn has_own(&self, key: &str) -> bool {
        self.get_own(key).is_some()
    }

    /// Writes a property, creating it as an enumerable data property if it
    /// does not exist. Returns false if the existing property is read-only.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        if let ObjectKind::Array(elements) = &mut self.kind {
            if let Some(index) = array_index(key).map(|i| i as usize) {
                let len = elements.len();
                if index < len {
                    elements[index] = value;
                    return true;
                }
                if index - len <= MAX_DENSE_GAP {
                    elements.resize(index, Value::Undefined);
                    // Pull sparse entries the dense part now covers.
                    for (i, slot) in elements.iter_mut().enumerate().skip(len) {
                        if let Some(sparse) = self.properties.shift_remove(&i.to_string()) {
                            *slot = sparse.value;
                        }
                    }
                    self.properties.shift_remove(key);
                    elements.push(value);
                    return true;
                }
            }
        }
        match self.properties.get_mut(key) {
            Some(existing) if !existing.writable => false,
            Some(existing) => {
                existing.value = value;
                true
            }
            None => {
                self.properties
                    .insert(key.to_string(), PropertyDescriptor::data(value));
                true
            }
        }
    }

    /// The array `length`: one past the highest index, dense or sparse.
    pub fn array_length(&self) -> usize {
        let ObjectKind::Array(elements) = &self.kind else {
            return 0;
        };
        self.properties
            .keys()
            .filter_map(|key| array_index(key))
            .map(|index| index as usize + 1)
            .fold(elements.len(), usize::max)
    }

    /// Defines (or redefines) a named property.
    pub fn define(&mut self, key: &str, descriptor: PropertyDescriptor) {
        self.properties.insert(key.to_string(), descriptor);
    }

    /// Own enumerable keys in enumeration order: integer indices ascending,
    /// then string keys in insertion order.
    pub fn own_enumerable_keys(&self) -> Vec<String> {
        let mut indices: Vec<u32> = Vec::new();
        if let ObjectKind::Array(elements) = &self.kind {
            indices.extend(0..elements.len() as u32);
        }

        let mut names = Vec::new();
        for (key, property) in &self.properties {
            if !property.enumerable {
                continue;
            }
            match array_index(key) {
                Some(index) => indices.push(index),
                None => names.push(key.clone()),
            }
        }
        indices.sort_unstable();
        indices.dedup();

        indices
            .into_iter()
            .map(|i| i.to_string())
            .chain(names)
            .collect()
    }
}

/// Parses a canonical array index ("0", "17"; not "01" or "-1").
pub fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

/// The object heap. Objects are never freed while a VM lives.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<JsObject>,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an object, returning its handle.
    pub fn alloc(&mut self, object: JsObject) -> usize {
        let id = self.objects.len();
        self.objects.push(object);
        id
    }

    /// Allocates a dense array.
    pub fn alloc_array(&mut self, elements: Vec<Value>) -> usize {
        self.alloc(JsObject::new(ObjectKind::Array(elements)))
    }

    /// Borrows an object.
    pub fn get(&self, id: usize) -> Result<&JsObject, Error> {
        self.objects
            .get(id)
            .ok_or_else(|| Error::InternalError(format!("Dangling object handle #{}", id)))
    }

    /// Mutably borrows an object.
    pub fn get_mut(&mut self, id: usize) -> Result<&mut JsObject, Error> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| Error::InternalError(format!("Dangling object handle #{}", id)))
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if nothing was allocated yet.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Renders a value for humans and tests: `{a: 1, b: [2, "x"]}`.
    pub fn render(&self, value: &Value) -> String {
        let mut out = String::new();
        self.render_into(value, 0, &mut out);
        out
    }

    fn render_into(&self, value: &Value, depth: usize, out: &mut String) {
        let Value::Object(id) = value else {
            match value {
                Value::String(s) => out.push_str(&format!("{:?}", s)),
                other => out.push_str(&other.to_string()),
            }
            return;
        };
        let Ok(object) = self.get(*id) else {
            out.push_str("<dangling>");
            return;
        };
        if depth > 4 {
            out.push_str("...");
            return;
        }

        match &object.kind {
            ObjectKind::Function { name, kind } => {
                let label = if *kind == FunctionKind::Class { "class" } else { "Function" };
                if name.is_empty() {
                    out.push_str(&format!("[{} (anonymous)]", label));
                } else {
                    out.push_str(&format!("[{}: {}]", label, name));
                }
            }
            ObjectKind::Iterable(spec) => out.push_str(&format!("[Iterable {}]", spec.label)),
            ObjectKind::Array(elements) => {
                out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.render_into(element, depth + 1, out);
                }
                out.push(']');
            }
            ObjectKind::Ordinary => {
                out.push('{');
                for (i, key) in object.own_enumerable_keys().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    let property = object.get_own(key).unwrap_or_default();
                    self.render_into(&property, depth + 1, out);
                }
                out.push('}');
            }
        }
    }
}
