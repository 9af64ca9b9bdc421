// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Environment records.

use rustc_hash::FxHashMap;

use super::object::Heap;
use super::value::Value;
use crate::Error;

/// How an environment record stores its bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    /// Bindings live in the record itself
    Declarative,
    /// Bindings are properties of a heap object (global, `with`)
    Object(usize),
}

/// One link of the scope chain.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Storage strategy
    pub kind: EnvironmentKind,
    /// Declarative bindings
    bindings: FxHashMap<String, Binding>,
    /// The enclosing environment
    pub outer: Option<usize>,
}

/// A declarative binding.
#[derive(Debug, Clone)]
struct Binding {
    /// The value
    value: Value,
    /// Whether the binding is mutable (let vs const)
    mutable: bool,
    /// Whether the binding has been initialized
    initialized: bool,
}

impl Environment {
    /// Creates a declarative environment.
    pub fn declarative(outer: Option<usize>) -> Self {
        Self {
            kind: EnvironmentKind::Declarative,
            bindings: FxHashMap::default(),
            outer,
        }
    }

    /// Creates an object environment backed by `object`.
    pub fn object(object: usize, outer: Option<usize>) -> Self {
        Self {
            kind: EnvironmentKind::Object(object),
            bindings: FxHashMap::default(),
            outer,
        }
    }

    /// Returns true if this record has a binding for `name`.
    pub fn has_binding(&self, name: &str, heap: &Heap) -> Result<bool, Error> {
        match self.kind {
            EnvironmentKind::Declarative => Ok(self.bindings.contains_key(name)),
            EnvironmentKind::Object(object) => Ok(heap.get(object)?.has_own(name)),
        }
    }

    /// Creates an uninitialized mutable binding.
    pub fn create_mutable_binding(&mut self, name: &str, heap: &mut Heap) -> Result<(), Error> {
        self.create_binding(name, true, heap)
    }

    /// Creates an uninitialized immutable binding.
    pub fn create_immutable_binding(&mut self, name: &str, heap: &mut Heap) -> Result<(), Error> {
        self.create_binding(name, false, heap)
    }

    fn create_binding(&mut self, name: &str, mutable: bool, heap: &mut Heap) -> Result<(), Error> {
        match self.kind {
            EnvironmentKind::Declarative => {
                if self.bindings.contains_key(name) {
                    return Err(Error::InternalError(format!(
                        "Binding '{}' already exists in this environment",
                        name
                    )));
                }
                self.bindings.insert(
                    name.to_string(),
                    Binding {
                        value: Value::Undefined,
                        mutable,
                        initialized: false,
                    },
                );
                Ok(())
            }
            EnvironmentKind::Object(object) => {
                let object = heap.get_mut(object)?;
                if !object.has_own(name) {
                    object.set(name, Value::Undefined);
                }
                Ok(())
            }
        }
    }

    /// Initializes a binding created earlier.
    pub fn initialize_binding(&mut self, name: &str, value: Value, heap: &mut Heap) -> Result<(), Error> {
        match self.kind {
            EnvironmentKind::Declarative => {
                let binding = self.bindings.get_mut(name).ok_or_else(|| {
                    Error::InternalError(format!("Initializing undeclared binding '{}'", name))
                })?;
                binding.value = value;
                binding.initialized = true;
                Ok(())
            }
            EnvironmentKind::Object(object) => {
                heap.get_mut(object)?.set(name, value);
                Ok(())
            }
        }
    }

    /// Writes an existing binding.
    pub fn set_mutable_binding(
        &mut self,
        name: &str,
        value: Value,
        strict: bool,
        heap: &mut Heap,
    ) -> Result<(), Error> {
        match self.kind {
            EnvironmentKind::Declarative => {
                let binding = self.bindings.get_mut(name).ok_or_else(|| {
                    Error::InternalError(format!("Writing undeclared binding '{}'", name))
                })?;
                if !binding.initialized {
                    return Err(Error::ReferenceError(format!(
                        "Cannot access '{}' before initialization",
                        name
                    )));
                }
                if !binding.mutable {
                    return Err(Error::TypeError("Assignment to constant variable.".into()));
                }
                binding.value = value;
                Ok(())
            }
            EnvironmentKind::Object(object) => {
                let object = heap.get_mut(object)?;
                if strict && !object.has_own(name) {
                    return Err(Error::ReferenceError(format!("{} is not defined", name)));
                }
                if !object.set(name, value) && strict {
                    return Err(Error::TypeError(format!(
                        "Cannot assign to read only property '{}'",
                        name
                    )));
                }
                Ok(())
            }
        }
    }

    /// Reads a binding.
    pub fn get_binding_value(&self, name: &str, heap: &Heap) -> Result<Value, Error> {
        match self.kind {
            EnvironmentKind::Declarative => match self.bindings.get(name) {
                Some(binding) if binding.initialized => Ok(binding.value.clone()),
                Some(_) => Err(Error::ReferenceError(format!(
                    "Cannot access '{}' before initialization",
                    name
                ))),
                None => Err(Error::InternalError(format!("Reading undeclared binding '{}'", name))),
            },
            EnvironmentKind::Object(object) => {
                Ok(heap.get(object)?.get_own(name).unwrap_or_default())
            }
        }
    }

    /// Names of the declarative bindings, sorted.
    pub fn binding_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().cloned().collect();
        names.sort();
        names
    }
}
