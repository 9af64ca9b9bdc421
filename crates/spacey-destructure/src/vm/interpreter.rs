// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::effects::Effect;
use crate::Error;
use crate::compiler::{Bytecode, EnvironmentHandle, Instruction, OpCode, Operand};
use crate::runtime::object::array_index;
use crate::runtime::{
    Environment, Heap, IterableSpec, IteratorRecord, IteratorSource, JsObject, ObjectKind,
    PropertyDescriptor, Reference, Step, Value,
};

/// The object environment over the global object; also the variable
/// environment.
const GLOBAL_ENV: usize = 0;
/// The declarative environment `let`/`const` bindings land in.
const LEXICAL_ENV: usize = 1;

/// An installed exception handler.
#[derive(Debug, Clone, Copy)]
struct Handler {
    /// Where execution resumes
    target: usize,
    /// Operand stack depth when the handler was installed
    depth: usize,
}

enum Flow {
    Continue,
    Halt,
}

/// The virtual machine that executes bytecode.
#[derive(Debug)]
pub struct VM {
    /// The value stack
    stack: Vec<Value>,
    /// Temporary slots of the running chunk
    temporaries: Vec<Value>,
    /// Instruction pointer
    ip: usize,
    /// Strictness of the running chunk
    strict: bool,
    /// Installed exception handlers, innermost last
    handlers: Vec<Handler>,
    /// The exception a handler is currently running for
    exception: Option<Error>,
    /// Heap for runtime objects
    heap: Heap,
    /// The global object
    global: usize,
    /// Environment records; see `GLOBAL_ENV` and `LEXICAL_ENV`
    environments: Vec<Environment>,
    /// Iterator records created by `GetIterator`
    iterators: Vec<IteratorRecord>,
    /// Consumed-key sets created by `NewKeySet`
    key_sets: Vec<FxHashSet<String>>,
    /// Observable steps, in order
    effects: Vec<Effect>,
}

impl VM {
    /// Creates a new VM with an empty global object and an empty lexical
    /// environment.
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let global = heap.alloc(JsObject::ordinary());
        Self {
            stack: Vec::with_capacity(64),
            temporaries: Vec::new(),
            ip: 0,
            strict: false,
            handlers: Vec::new(),
            exception: None,
            heap,
            global,
            environments: vec![
                Environment::object(global, None),
                Environment::declarative(Some(GLOBAL_ENV)),
            ],
            iterators: Vec::new(),
            key_sets: Vec::new(),
            effects: Vec::new(),
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Executes bytecode and returns the result.
    pub fn execute(&mut self, bytecode: &Bytecode) -> Result<Value, Error> {
        self.execute_with(bytecode, &[])
    }

    /// Executes bytecode with some temporaries preset by the caller, e.g. an
    /// argument cursor or a target environment.
    pub fn execute_with(
        &mut self,
        bytecode: &Bytecode,
        temporaries: &[(u16, Value)],
    ) -> Result<Value, Error> {
        self.ip = 0;
        self.strict = bytecode.strict;
        self.stack.clear();
        self.handlers.clear();
        self.exception = None;
        self.temporaries = vec![Value::Undefined; bytecode.temporaries as usize];
        for (slot, value) in temporaries {
            *self.temporary_mut(*slot as usize)? = value.clone();
        }

        while let Some(instruction) = bytecode.instructions.get(self.ip) {
            self.ip += 1;
            match self.dispatch(bytecode, instruction) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => break,
                Err(error) => self.unwind(error)?,
            }
        }

        // Return the top of stack, or undefined if empty
        Ok(self.stack.pop().unwrap_or_default())
    }

    /// Transfers control to the innermost handler, or gives the error back.
    fn unwind(&mut self, error: Error) -> Result<(), Error> {
        if !error.is_catchable() {
            return Err(error);
        }
        let Some(handler) = self.handlers.pop() else {
            debug!(%error, "uncaught exception");
            return Err(error);
        };
        debug!(%error, target = handler.target, "exception caught");
        self.stack.truncate(handler.depth);
        self.ip = handler.target;
        self.exception = Some(error);
        Ok(())
    }

    fn dispatch(&mut self, bytecode: &Bytecode, instruction: &Instruction) -> Result<Flow, Error> {
        match instruction.opcode {
            OpCode::LoadConst => {
                let value = match &instruction.operand {
                    Some(Operand::Constant(index)) => bytecode.constants.get(*index as usize).cloned(),
                    _ => None,
                }
                .ok_or_else(|| operand_error(instruction))?;
                self.stack.push(value);
            }
            OpCode::LoadUndefined => self.stack.push(Value::Undefined),
            OpCode::LoadNull => self.stack.push(Value::Null),
            OpCode::LoadTrue => self.stack.push(Value::Boolean(true)),
            OpCode::LoadFalse => self.stack.push(Value::Boolean(false)),

            OpCode::Pop => {
                self.pop()?;
            }
            OpCode::Dup => {
                let top = self.peek()?.clone();
                self.stack.push(top);
            }
            OpCode::Swap => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(b);
                self.stack.push(a);
            }
            OpCode::Over => {
                let below = self
                    .stack
                    .len()
                    .checked_sub(2)
                    .and_then(|index| self.stack.get(index))
                    .cloned()
                    .ok_or_else(underflow)?;
                self.stack.push(below);
            }

            // Temporaries
            OpCode::LoadLocal => {
                let value = self.temporary(local_slot(instruction)?)?.clone();
                self.stack.push(value);
            }
            OpCode::StoreLocal => {
                let slot = local_slot(instruction)?;
                let value = self.pop()?;
                *self.temporary_mut(slot)? = value;
            }

            // Control flow
            OpCode::Jump => self.ip = jump_target(instruction)?,
            OpCode::JumpIfNotUndefined => {
                if !self.peek()?.is_undefined() {
                    self.ip = jump_target(instruction)?;
                }
            }
            OpCode::EnterTry => {
                let target = jump_target(instruction)?;
                self.handlers.push(Handler {
                    target,
                    depth: self.stack.len(),
                });
            }
            OpCode::LeaveTry => {
                self.handlers
                    .pop()
                    .ok_or_else(|| Error::InternalError("LeaveTry without a handler".into()))?;
            }
            OpCode::Rethrow => {
                return Err(self
                    .exception
                    .take()
                    .unwrap_or_else(|| Error::InternalError("Rethrow outside a handler".into())));
            }
            OpCode::Halt => return Ok(Flow::Halt),

            // Expression support
            OpCode::LoadBinding => {
                let name = name_operand(bytecode, instruction)?;
                self.effects.push(Effect::Read(name.to_string()));
                let value = self.get_identifier_value(name)?;
                self.stack.push(value);
            }
            OpCode::GetV => {
                let key = match optional_name(bytecode, instruction)? {
                    Some(key) => key.to_string(),
                    None => self.pop_key()?,
                };
                let base = self.pop()?;
                self.effects.push(Effect::Get(key.clone()));
                let value = self.get_v(&base, &key)?;
                self.stack.push(value);
            }
            OpCode::ToPropertyKey => {
                let value = self.pop()?;
                let key = self.to_property_key(&value)?;
                self.effects.push(Effect::KeyCoercion(key.clone()));
                self.stack.push(Value::String(key));
            }
            OpCode::NewObject => {
                let id = self.heap.alloc(JsObject::ordinary());
                self.stack.push(Value::Object(id));
            }
            OpCode::InitProperty => {
                let value = self.pop()?;
                let key = match optional_name(bytecode, instruction)? {
                    Some(key) => key.to_string(),
                    None => self.pop_key()?,
                };
                let id = self.peek_object()?;
                self.heap.get_mut(id)?.set(&key, value);
            }
            OpCode::NewArray => {
                let count = match &instruction.operand {
                    Some(Operand::Count(count)) => *count as usize,
                    _ => return Err(operand_error(instruction)),
                };
                let start = self.stack.len().checked_sub(count).ok_or_else(underflow)?;
                let elements = self.stack.split_off(start);
                let id = self.heap.alloc_array(elements);
                self.stack.push(Value::Object(id));
            }
            OpCode::CreateFunction => {
                let (name, kind) = match &instruction.operand {
                    Some(Operand::Function { name, kind }) => (
                        name.map(|index| string_operand(bytecode, index)).transpose()?,
                        *kind,
                    ),
                    _ => return Err(operand_error(instruction)),
                };
                let function = JsObject::new(ObjectKind::Function {
                    name: name.unwrap_or_default().to_string(),
                    kind,
                });
                let id = self.heap.alloc(function);
                self.stack.push(Value::Object(id));
            }

            // Objects
            OpCode::RequireObjectCoercible => {
                let value = self.peek()?;
                if value.is_nullish() {
                    return Err(Error::TypeError(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value, value
                    )));
                }
            }
            OpCode::NewKeySet => {
                self.key_sets.push(FxHashSet::default());
                self.stack.push(Value::KeySet(self.key_sets.len() - 1));
            }
            OpCode::RecordKey => {
                let (slot, key) = match &instruction.operand {
                    Some(Operand::KeyedLocal { slot, key }) => {
                        (*slot as usize, string_operand(bytecode, *key)?.to_string())
                    }
                    Some(Operand::Local(slot)) => (*slot as usize, self.peek_key()?),
                    _ => return Err(operand_error(instruction)),
                };
                let set = self.key_set(slot)?;
                trace!(%key, "recording consumed key");
                if let Some(keys) = self.key_sets.get_mut(set) {
                    keys.insert(key);
                }
            }
            OpCode::CopyDataProperties => {
                let excluded = match &instruction.operand {
                    Some(Operand::Local(slot)) => Some(self.key_set(*slot as usize)?),
                    None => None,
                    _ => return Err(operand_error(instruction)),
                };
                let source = self.pop()?;
                let copy = self.copy_data_properties(&source, excluded)?;
                self.stack.push(copy);
            }

            // Iterators
            OpCode::GetIterator => {
                let value = self.pop()?;
                let record = self.get_iterator(&value)?;
                self.iterators.push(record);
                self.stack.push(Value::Iterator(self.iterators.len() - 1));
            }
            OpCode::IteratorStep => {
                let id = self.iterator(local_slot(instruction)?)?;
                let value = self.iterator_step(id)?.unwrap_or_default();
                self.stack.push(value);
            }
            OpCode::IteratorDrain => {
                let id = self.iterator(local_slot(instruction)?)?;
                let mut elements = Vec::new();
                while let Some(value) = self.iterator_step(id)? {
                    elements.push(value);
                }
                let array = self.heap.alloc_array(elements);
                self.stack.push(Value::Object(array));
            }
            OpCode::IteratorClose => {
                let id = self.iterator(local_slot(instruction)?)?;
                self.iterator_close(id)?;
            }
            OpCode::IteratorCloseOnThrow => {
                let id = self.iterator(local_slot(instruction)?)?;
                match self.iterator_close(id) {
                    Ok(()) => {}
                    Err(error) if error.is_catchable() => {
                        debug!(%error, "discarding error from iterator close");
                    }
                    Err(error) => return Err(error),
                }
            }
            OpCode::SetFunctionName => {
                let name = name_operand(bytecode, instruction)?;
                let id = self.peek_object()?;
                if let ObjectKind::Function { name: own, .. } = &mut self.heap.get_mut(id)?.kind
                    && own.is_empty()
                {
                    *own = name.to_string();
                }
            }

            // Bindings and references
            OpCode::CreateMutableBinding => {
                let (env, name) = binding_operand(bytecode, instruction)?;
                let index = self.environment_index(env)?;
                let environment = self.environments.get_mut(index).ok_or_else(|| dangling_env(index))?;
                environment.create_mutable_binding(name, &mut self.heap)?;
            }
            OpCode::InitializeBinding => {
                let (env, name) = binding_operand(bytecode, instruction)?;
                let value = self.pop()?;
                let index = self.environment_index(env)?;
                self.effects.push(Effect::Initialize(name.to_string()));
                let environment = self.environments.get_mut(index).ok_or_else(|| dangling_env(index))?;
                environment.initialize_binding(name, value, &mut self.heap)?;
            }
            OpCode::ResolveBinding => {
                let name = name_operand(bytecode, instruction)?;
                self.effects.push(Effect::Resolve(name.to_string()));
                let reference = self.resolve_binding(name)?;
                self.stack.push(Value::Reference(Box::new(reference)));
            }
            OpCode::MakeReference => {
                let key = match optional_name(bytecode, instruction)? {
                    Some(key) => key.to_string(),
                    None => self.pop_key()?,
                };
                let base = self.pop()?;
                self.effects.push(Effect::Resolve(key.clone()));
                self.stack.push(Value::Reference(Box::new(Reference::Property {
                    base,
                    key,
                    strict: self.strict,
                })));
            }
            OpCode::PutValue => {
                let value = self.pop()?;
                let reference = match self.pop()? {
                    Value::Reference(reference) => *reference,
                    other => {
                        return Err(Error::InternalError(format!(
                            "PutValue on {}",
                            other.type_of()
                        )));
                    }
                };
                self.effects.push(Effect::Put(reference.name().to_string()));
                self.put_value(reference, value)?;
            }
        }
        Ok(Flow::Continue)
    }

    // ========================================================================
    // Stack and slots
    // ========================================================================

    fn pop(&mut self) -> Result<Value, Error> {
        self.stack.pop().ok_or_else(underflow)
    }

    fn peek(&self) -> Result<&Value, Error> {
        self.stack.last().ok_or_else(underflow)
    }

    fn pop_key(&mut self) -> Result<String, Error> {
        match self.pop()? {
            Value::String(key) => Ok(key),
            other => Err(Error::InternalError(format!(
                "Expected a property key, found {}",
                other.type_of()
            ))),
        }
    }

    fn peek_key(&self) -> Result<String, Error> {
        match self.peek()? {
            Value::String(key) => Ok(key.clone()),
            other => Err(Error::InternalError(format!(
                "Expected a property key, found {}",
                other.type_of()
            ))),
        }
    }

    fn peek_object(&self) -> Result<usize, Error> {
        match self.peek()? {
            Value::Object(id) => Ok(*id),
            other => Err(Error::InternalError(format!(
                "Expected an object, found {}",
                other.type_of()
            ))),
        }
    }

    fn temporary(&self, slot: usize) -> Result<&Value, Error> {
        self.temporaries
            .get(slot)
            .ok_or_else(|| Error::InternalError(format!("No temporary slot t{}", slot)))
    }

    fn temporary_mut(&mut self, slot: usize) -> Result<&mut Value, Error> {
        self.temporaries
            .get_mut(slot)
            .ok_or_else(|| Error::InternalError(format!("No temporary slot t{}", slot)))
    }

    fn iterator(&self, slot: usize) -> Result<usize, Error> {
        match self.temporary(slot)? {
            Value::Iterator(id) if *id < self.iterators.len() => Ok(*id),
            other => Err(Error::InternalError(format!(
                "t{} holds {} instead of an iterator",
                slot,
                other.type_of()
            ))),
        }
    }

    fn key_set(&self, slot: usize) -> Result<usize, Error> {
        match self.temporary(slot)? {
            Value::KeySet(id) if *id < self.key_sets.len() => Ok(*id),
            other => Err(Error::InternalError(format!(
                "t{} holds {} instead of a key set",
                slot,
                other.type_of()
            ))),
        }
    }

    fn environment_index(&self, handle: EnvironmentHandle) -> Result<usize, Error> {
        match handle {
            EnvironmentHandle::Lexical => Ok(LEXICAL_ENV),
            EnvironmentHandle::Variable => Ok(GLOBAL_ENV),
            EnvironmentHandle::Slot(slot) => match self.temporary(slot as usize)? {
                Value::Environment(id) if *id < self.environments.len() => Ok(*id),
                other => Err(Error::InternalError(format!(
                    "t{} holds {} instead of an environment",
                    slot,
                    other.type_of()
                ))),
            },
        }
    }

    fn environment(&self, index: usize) -> Result<&Environment, Error> {
        self.environments.get(index).ok_or_else(|| dangling_env(index))
    }

    // ========================================================================
    // Object operations
    // ========================================================================

    fn get_v(&self, base: &Value, key: &str) -> Result<Value, Error> {
        match base {
            Value::Undefined | Value::Null => Err(Error::TypeError(format!(
                "Cannot read properties of {} (reading '{}')",
                base, key
            ))),
            Value::Object(id) => Ok(self.heap.get(*id)?.get_own(key).unwrap_or_default()),
            Value::String(s) => Ok(string_property(s, key)),
            Value::Boolean(_) | Value::Number(_) => Ok(Value::Undefined),
            other => Err(Error::InternalError(format!("GetV on {}", other.type_of()))),
        }
    }

    fn to_property_key(&self, value: &Value) -> Result<String, Error> {
        if let Some(key) = value.primitive_key() {
            return Ok(key);
        }
        match value {
            Value::Object(id) => match &self.heap.get(*id)?.kind {
                ObjectKind::Array(elements) => Ok(elements
                    .iter()
                    .map(|element| match element {
                        Value::Undefined | Value::Null => String::new(),
                        Value::Object(_) => "[object Object]".to_string(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",")),
                _ => Ok("[object Object]".to_string()),
            },
            other => Err(Error::InternalError(format!(
                "ToPropertyKey on {}",
                other.type_of()
            ))),
        }
    }

    fn copy_data_properties(&mut self, source: &Value, excluded: Option<usize>) -> Result<Value, Error> {
        let entries: Vec<(String, Value)> = match source {
            Value::Object(id) => {
                let object = self.heap.get(*id)?;
                object
                    .own_enumerable_keys()
                    .into_iter()
                    .filter_map(|key| object.get_own(&key).map(|value| (key, value)))
                    .collect()
            }
            Value::String(s) => s
                .chars()
                .enumerate()
                .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
                .collect(),
            _ => Vec::new(),
        };

        let excluded = match excluded {
            Some(set) => Some(
                self.key_sets
                    .get(set)
                    .ok_or_else(|| Error::InternalError(format!("Dangling key set #{}", set)))?,
            ),
            None => None,
        };

        let mut copy = JsObject::ordinary();
        for (key, value) in entries {
            if excluded.is_some_and(|keys| keys.contains(&key)) {
                continue;
            }
            self.effects.push(Effect::Get(key.clone()));
            copy.set(&key, value);
        }
        Ok(Value::Object(self.heap.alloc(copy)))
    }

    // ========================================================================
    // Iterators
    // ========================================================================

    fn get_iterator(&self, value: &Value) -> Result<IteratorRecord, Error> {
        let source = match value {
            Value::String(s) => IteratorSource::String(s.chars().collect()),
            Value::Object(id) => match &self.heap.get(*id)?.kind {
                ObjectKind::Array(_) => IteratorSource::Array(*id),
                ObjectKind::Iterable(_) => IteratorSource::Scripted(*id),
                _ => {
                    return Err(Error::TypeError(format!(
                        "{} is not iterable",
                        self.heap.render(value)
                    )));
                }
            },
            other => return Err(Error::TypeError(format!("{} is not iterable", other))),
        };
        Ok(IteratorRecord::new(source))
    }

    /// Advances once; `None` once the iterator is done. A done iterator is
    /// never asked again.
    fn iterator_step(&mut self, id: usize) -> Result<Option<Value>, Error> {
        let record = self
            .iterators
            .get_mut(id)
            .ok_or_else(|| Error::InternalError(format!("Dangling iterator #{}", id)))?;
        if record.done {
            return Ok(None);
        }
        self.effects.push(Effect::IteratorNext(record.label(&self.heap)));
        match record.step(&self.heap)? {
            Step::Value(value) => Ok(Some(value)),
            Step::Done => Ok(None),
        }
    }

    fn iterator_close(&mut self, id: usize) -> Result<(), Error> {
        let record = self
            .iterators
            .get_mut(id)
            .ok_or_else(|| Error::InternalError(format!("Dangling iterator #{}", id)))?;
        if record.done {
            return Ok(());
        }
        trace!(iterator = id, "closing iterator");
        if record.has_return_method() {
            self.effects.push(Effect::IteratorReturn(record.label(&self.heap)));
        }
        record.close(&self.heap)
    }

    // ========================================================================
    // Bindings and references
    // ========================================================================

    fn resolve_binding(&self, name: &str) -> Result<Reference, Error> {
        let mut current = Some(LEXICAL_ENV);
        while let Some(index) = current {
            let environment = self.environment(index)?;
            if environment.has_binding(name, &self.heap)? {
                return Ok(Reference::Binding {
                    env: index,
                    name: name.to_string(),
                    strict: self.strict,
                });
            }
            current = environment.outer;
        }
        Ok(Reference::Unresolvable {
            name: name.to_string(),
            strict: self.strict,
        })
    }

    fn get_identifier_value(&self, name: &str) -> Result<Value, Error> {
        match self.resolve_binding(name)? {
            Reference::Binding { env, .. } => self.environment(env)?.get_binding_value(name, &self.heap),
            _ => Err(Error::ReferenceError(format!("{} is not defined", name))),
        }
    }

    fn put_value(&mut self, reference: Reference, value: Value) -> Result<(), Error> {
        match reference {
            Reference::Binding { env, name, strict } => {
                let environment = self.environments.get_mut(env).ok_or_else(|| dangling_env(env))?;
                environment.set_mutable_binding(&name, value, strict, &mut self.heap)
            }
            Reference::Unresolvable { name, strict } => {
                if strict {
                    return Err(Error::ReferenceError(format!("{} is not defined", name)));
                }
                self.heap.get_mut(self.global)?.set(&name, value);
                Ok(())
            }
            Reference::Property { base, key, strict } => match base {
                Value::Object(id) => {
                    if !self.heap.get_mut(id)?.set(&key, value) && strict {
                        return Err(Error::TypeError(format!(
                            "Cannot assign to read only property '{}' of object",
                            key
                        )));
                    }
                    Ok(())
                }
                Value::Undefined | Value::Null => Err(Error::TypeError(format!(
                    "Cannot set properties of {} (setting '{}')",
                    base, key
                ))),
                _ if strict => Err(Error::TypeError(format!(
                    "Cannot create property '{}' on {} '{}'",
                    key,
                    base.type_of(),
                    base
                ))),
                _ => Ok(()),
            },
        }
    }

    // ========================================================================
    // Embedding and inspection
    // ========================================================================

    /// Defines a property on the global object.
    pub fn define_global(&mut self, name: &str, value: Value) -> Result<(), Error> {
        self.heap.get_mut(self.global)?.set(name, value);
        Ok(())
    }

    /// Declares and initializes a `let` binding in the lexical environment.
    pub fn declare_lexical(&mut self, name: &str, value: Value) -> Result<(), Error> {
        let environment = &mut self.environments[LEXICAL_ENV];
        environment.create_mutable_binding(name, &mut self.heap)?;
        environment.initialize_binding(name, value, &mut self.heap)
    }

    /// Declares and initializes a `const` binding in the lexical environment.
    pub fn declare_const(&mut self, name: &str, value: Value) -> Result<(), Error> {
        let environment = &mut self.environments[LEXICAL_ENV];
        environment.create_immutable_binding(name, &mut self.heap)?;
        environment.initialize_binding(name, value, &mut self.heap)
    }

    /// Declares a `let` binding that stays in its temporal dead zone.
    pub fn declare_uninitialized(&mut self, name: &str) -> Result<(), Error> {
        self.environments[LEXICAL_ENV].create_mutable_binding(name, &mut self.heap)
    }

    /// Creates a fresh declarative environment nested in the lexical one,
    /// for use with [`EnvironmentHandle::Slot`].
    pub fn new_environment(&mut self) -> Value {
        self.environments
            .push(Environment::declarative(Some(LEXICAL_ENV)));
        Value::Environment(self.environments.len() - 1)
    }

    /// Allocates a plain object.
    pub fn alloc_object<'a, I>(&mut self, properties: I) -> Value
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut object = JsObject::ordinary();
        for (key, value) in properties {
            object.set(key, value);
        }
        Value::Object(self.heap.alloc(object))
    }

    /// Allocates an array.
    pub fn alloc_array(&mut self, elements: Vec<Value>) -> Value {
        Value::Object(self.heap.alloc_array(elements))
    }

    /// Allocates a scripted iterable.
    pub fn alloc_iterable(&mut self, spec: IterableSpec) -> Value {
        Value::Object(self.heap.alloc(JsObject::new(ObjectKind::Iterable(spec))))
    }

    /// Creates an iterator over `value` for a caller-owned cursor slot.
    pub fn open_iterator(&mut self, value: &Value) -> Result<Value, Error> {
        let record = self.get_iterator(value)?;
        self.iterators.push(record);
        Ok(Value::Iterator(self.iterators.len() - 1))
    }

    /// Whether the iterator handle has finished (exhausted, failed or closed).
    pub fn iterator_done(&self, iterator: &Value) -> Option<bool> {
        match iterator {
            Value::Iterator(id) => self.iterators.get(*id).map(|record| record.done),
            _ => None,
        }
    }

    /// Defines a read-only enumerable property.
    pub fn define_read_only(&mut self, object: &Value, key: &str, value: Value) -> Result<(), Error> {
        let Value::Object(id) = object else {
            return Err(Error::TypeError(format!("{} is not an object", object)));
        };
        self.heap.get_mut(*id)?.define(
            key,
            PropertyDescriptor {
                value,
                writable: false,
                enumerable: true,
            },
        );
        Ok(())
    }

    /// Reads a binding the way an identifier reference would, without
    /// journaling. `None` if unresolvable or uninitialized.
    pub fn binding(&self, name: &str) -> Option<Value> {
        self.get_identifier_value(name).ok()
    }

    /// Reads a binding from an environment made by [`VM::new_environment`].
    pub fn binding_in(&self, environment: &Value, name: &str) -> Option<Value> {
        let Value::Environment(id) = environment else {
            return None;
        };
        let environment = self.environments.get(*id)?;
        environment.get_binding_value(name, &self.heap).ok()
    }

    /// Reads an own property of an object value.
    pub fn property(&self, object: &Value, key: &str) -> Option<Value> {
        match object {
            Value::Object(id) => self.heap.get(*id).ok()?.get_own(key),
            _ => None,
        }
    }

    /// Initialized lexical bindings (sorted) followed by global properties.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let lexical = &self.environments[LEXICAL_ENV];
        let mut bindings: Vec<(String, Value)> = lexical
            .binding_names()
            .into_iter()
            .filter_map(|name| {
                let value = lexical.get_binding_value(&name, &self.heap).ok()?;
                Some((name, value))
            })
            .collect();
        if let Ok(global) = self.heap.get(self.global) {
            for key in global.own_enumerable_keys() {
                let value = global.get_own(&key).unwrap_or_default();
                bindings.push((key, value));
            }
        }
        bindings
    }

    /// Renders a value, following object handles.
    pub fn render(&self, value: &Value) -> String {
        self.heap.render(value)
    }

    /// The effect journal.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// The effect journal as display strings.
    pub fn effect_log(&self) -> Vec<String> {
        self.effects.iter().map(ToString::to_string).collect()
    }

    /// Empties the effect journal.
    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    /// The object heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Operand decoding
// ============================================================================

fn underflow() -> Error {
    Error::InternalError("Stack underflow".into())
}

fn dangling_env(index: usize) -> Error {
    Error::InternalError(format!("Dangling environment #{}", index))
}

fn operand_error(instruction: &Instruction) -> Error {
    Error::InternalError(format!(
        "Bad operand for {}: {:?}",
        instruction.opcode, instruction.operand
    ))
}

fn local_slot(instruction: &Instruction) -> Result<usize, Error> {
    match &instruction.operand {
        Some(Operand::Local(slot)) => Ok(*slot as usize),
        _ => Err(operand_error(instruction)),
    }
}

fn jump_target(instruction: &Instruction) -> Result<usize, Error> {
    match &instruction.operand {
        Some(Operand::Jump(target)) => {
            usize::try_from(*target).map_err(|_| operand_error(instruction))
        }
        _ => Err(operand_error(instruction)),
    }
}

fn string_operand(bytecode: &Bytecode, index: u16) -> Result<&str, Error> {
    bytecode
        .string(index)
        .ok_or_else(|| Error::InternalError(format!("Constant #{} is not a string", index)))
}

fn name_operand<'b>(bytecode: &'b Bytecode, instruction: &Instruction) -> Result<&'b str, Error> {
    match &instruction.operand {
        Some(Operand::Property(index) | Operand::Constant(index)) => string_operand(bytecode, *index),
        _ => Err(operand_error(instruction)),
    }
}

fn optional_name<'b>(
    bytecode: &'b Bytecode,
    instruction: &Instruction,
) -> Result<Option<&'b str>, Error> {
    match &instruction.operand {
        None => Ok(None),
        Some(Operand::Property(index)) => string_operand(bytecode, *index).map(Some),
        _ => Err(operand_error(instruction)),
    }
}

fn binding_operand<'b>(
    bytecode: &'b Bytecode,
    instruction: &Instruction,
) -> Result<(EnvironmentHandle, &'b str), Error> {
    match &instruction.operand {
        Some(Operand::Binding { env, name }) => Ok((*env, string_operand(bytecode, *name)?)),
        _ => Err(operand_error(instruction)),
    }
}

/// Primitive string property reads: `length` and code point indices.
fn string_property(s: &str, key: &str) -> Value {
    if key == "length" {
        return Value::Number(s.chars().count() as f64);
    }
    array_index(key)
        .and_then(|index| s.chars().nth(index as usize))
        .map(|c| Value::String(c.to_string()))
        .unwrap_or_default()
}
