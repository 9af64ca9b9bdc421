// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Instruction emission with operand-stack bookkeeping.

use rustc_hash::FxHashMap;
use tracing::trace;

use super::stack::{StackEntry, StackModel};
use crate::ast::FunctionKind;
use crate::compiler::bytecode::{Bytecode, EnvironmentHandle, Instruction, OpCode, Operand};
use crate::compiler::error::{CompileError, CompileResult};
use crate::runtime::value::Value;

/// A temporary slot owned by one compile step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temp {
    slot: u16,
    kind: StackEntry,
}

impl Temp {
    /// The slot number.
    pub fn slot(&self) -> u16 {
        self.slot
    }

    /// What the slot holds.
    pub fn kind(&self) -> StackEntry {
        self.kind
    }
}

/// An open try region, closed by [`Emitter::begin_handler`].
#[derive(Debug)]
#[must_use]
pub struct TryRegion {
    enter: usize,
    stack: Vec<StackEntry>,
}

/// Builds one bytecode chunk.
#[derive(Debug, Default)]
pub struct Emitter {
    bytecode: Bytecode,
    stack: StackModel,
    strings: FxHashMap<String, u16>,
    free_temps: Vec<u16>,
    next_temp: u16,
    open_regions: usize,
}

impl Emitter {
    /// Creates an empty emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The operand stack model.
    pub fn stack(&self) -> &StackModel {
        &self.stack
    }

    /// Index the next instruction will get.
    pub fn position(&self) -> usize {
        self.bytecode.instructions.len()
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        trace!(opcode = %instruction.opcode, depth = self.stack.depth(), "emit");
        self.bytecode.emit(instruction)
    }

    fn simple(&mut self, opcode: OpCode) -> usize {
        self.emit(Instruction::simple(opcode))
    }

    fn with_operand(&mut self, opcode: OpCode, operand: Operand) -> usize {
        self.emit(Instruction::with_operand(opcode, operand))
    }

    // ========================================================================
    // Constants
    // ========================================================================

    /// Interns a string constant.
    pub fn string_constant(&mut self, s: &str) -> CompileResult<u16> {
        if let Some(&index) = self.strings.get(s) {
            return Ok(index);
        }
        let index = self
            .bytecode
            .add_constant(Value::String(s.to_string()))
            .ok_or(CompileError::TooManyConstants)?;
        self.strings.insert(s.to_string(), index);
        Ok(index)
    }

    /// Pushes a primitive constant: `[] -> [v]`.
    pub fn load_constant(&mut self, value: Value) -> CompileResult<()> {
        let index = match &value {
            Value::String(s) => self.string_constant(s)?,
            Value::Undefined => return self.load_undefined(),
            Value::Null => {
                self.simple(OpCode::LoadNull);
                self.stack.push(StackEntry::Value);
                return Ok(());
            }
            Value::Boolean(b) => return self.load_boolean(*b),
            Value::Number(n) => self
                .bytecode
                .add_constant(Value::Number(*n))
                .ok_or(CompileError::TooManyConstants)?,
            other => {
                return Err(CompileError::Internal(format!(
                    "{} cannot be a constant",
                    other.type_of()
                )));
            }
        };
        self.with_operand(OpCode::LoadConst, Operand::Constant(index));
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// Pushes undefined.
    pub fn load_undefined(&mut self) -> CompileResult<()> {
        self.simple(OpCode::LoadUndefined);
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// Pushes a boolean.
    pub fn load_boolean(&mut self, b: bool) -> CompileResult<()> {
        self.simple(if b { OpCode::LoadTrue } else { OpCode::LoadFalse });
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    // ========================================================================
    // Stack shuffling
    // ========================================================================

    /// Drops the top entry.
    pub fn pop(&mut self) -> CompileResult<()> {
        self.stack.pop_any("Pop")?;
        self.simple(OpCode::Pop);
        Ok(())
    }

    /// `[a] -> [a, a]`
    pub fn dup(&mut self) -> CompileResult<()> {
        let top = self.stack.at(0).ok_or(CompileError::StackMismatch {
            context: "Dup",
            expected: StackEntry::Value,
            found: None,
        })?;
        self.simple(OpCode::Dup);
        self.stack.push(top);
        Ok(())
    }

    /// `[a, b] -> [b, a]`
    pub fn swap(&mut self) -> CompileResult<()> {
        let b = self.stack.pop_any("Swap")?;
        let a = self.stack.pop_any("Swap")?;
        self.simple(OpCode::Swap);
        self.stack.push(b);
        self.stack.push(a);
        Ok(())
    }

    /// `[a, b] -> [a, b, a]`
    pub fn over(&mut self) -> CompileResult<()> {
        let a = self.stack.at(1).ok_or(CompileError::StackMismatch {
            context: "Over",
            expected: StackEntry::Value,
            found: None,
        })?;
        self.simple(OpCode::Over);
        self.stack.push(a);
        Ok(())
    }

    // ========================================================================
    // Temporaries
    // ========================================================================

    /// Reserves a temporary slot for an entry of the given kind.
    pub fn alloc_temp(&mut self, kind: StackEntry) -> CompileResult<Temp> {
        let slot = match self.free_temps.pop() {
            Some(slot) => slot,
            None => {
                let slot = self.next_temp;
                self.next_temp = slot
                    .checked_add(1)
                    .ok_or(CompileError::TooManyTemporaries)?;
                slot
            }
        };
        Ok(Temp { slot, kind })
    }

    /// Returns a slot to the pool.
    pub fn free_temp(&mut self, temp: Temp) {
        self.free_temps.push(temp.slot);
    }

    /// `[] -> [t]`
    pub fn load_local(&mut self, temp: Temp) -> CompileResult<()> {
        self.with_operand(OpCode::LoadLocal, Operand::Local(temp.slot));
        self.stack.push(temp.kind);
        Ok(())
    }

    /// `[t] -> []`
    pub fn store_local(&mut self, temp: Temp) -> CompileResult<()> {
        self.stack.pop(temp.kind, "StoreLocal")?;
        self.with_operand(OpCode::StoreLocal, Operand::Local(temp.slot));
        Ok(())
    }

    fn expect_temp(temp: Temp, expected: StackEntry, context: &'static str) -> CompileResult<()> {
        if temp.kind == expected {
            Ok(())
        } else {
            Err(CompileError::TemporaryMismatch {
                context,
                slot: temp.slot,
                expected,
                found: temp.kind,
            })
        }
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    /// Emits a forward jump to be patched later.
    pub fn jump(&mut self) -> usize {
        self.with_operand(OpCode::Jump, Operand::Jump(0))
    }

    /// Emits a forward jump taken when the top value is not undefined. The
    /// value stays on the stack on both paths.
    pub fn jump_if_not_undefined(&mut self) -> CompileResult<usize> {
        self.stack.peek(StackEntry::Value, "JumpIfNotUndefined")?;
        Ok(self.with_operand(OpCode::JumpIfNotUndefined, Operand::Jump(0)))
    }

    /// Points the jump at `index` to the next instruction.
    pub fn patch_jump(&mut self, index: usize) -> CompileResult<()> {
        let target = i32::try_from(self.position())
            .map_err(|_| CompileError::Internal("Jump target out of range".into()))?;
        match self.bytecode.instructions.get_mut(index) {
            Some(instruction) => {
                instruction.operand = Some(Operand::Jump(target));
                Ok(())
            }
            None => Err(CompileError::Internal(format!(
                "Patching missing jump at {}",
                index
            ))),
        }
    }

    /// Opens a try region. The handler sees the stack as it is now.
    pub fn enter_try(&mut self) -> TryRegion {
        let enter = self.with_operand(OpCode::EnterTry, Operand::Jump(0));
        self.open_regions += 1;
        TryRegion {
            enter,
            stack: self.stack.snapshot(),
        }
    }

    /// Removes the innermost handler on the normal path.
    pub fn leave_try(&mut self) -> CompileResult<()> {
        if self.open_regions == 0 {
            return Err(CompileError::Internal("LeaveTry without EnterTry".into()));
        }
        self.open_regions -= 1;
        self.simple(OpCode::LeaveTry);
        Ok(())
    }

    /// Places the handler for `region` at the next instruction.
    pub fn begin_handler(&mut self, region: TryRegion) -> CompileResult<()> {
        self.patch_jump(region.enter)?;
        self.stack.restore(region.stack);
        Ok(())
    }

    /// Re-raises the exception being handled.
    pub fn rethrow(&mut self) {
        self.simple(OpCode::Rethrow);
    }

    /// Saves the stack shape at a jump so it can be restored at the label.
    pub fn stack_snapshot(&self) -> Vec<StackEntry> {
        self.stack.snapshot()
    }

    /// Restores a shape saved with [`Emitter::stack_snapshot`].
    pub fn restore_stack(&mut self, entries: Vec<StackEntry>) {
        self.stack.restore(entries);
    }

    // ========================================================================
    // Expression support
    // ========================================================================

    /// `[] -> [v]`
    pub fn load_binding(&mut self, name: &str) -> CompileResult<()> {
        let index = self.string_constant(name)?;
        self.with_operand(OpCode::LoadBinding, Operand::Property(index));
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// `[base] -> [v]` with a literal key, `[base, key] -> [v]` otherwise.
    pub fn get_v(&mut self, key: Option<&str>) -> CompileResult<()> {
        match key {
            Some(key) => {
                let index = self.string_constant(key)?;
                self.stack.pop(StackEntry::Value, "GetV")?;
                self.with_operand(OpCode::GetV, Operand::Property(index));
            }
            None => {
                self.stack.pop(StackEntry::Key, "GetV")?;
                self.stack.pop(StackEntry::Value, "GetV")?;
                self.simple(OpCode::GetV);
            }
        }
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// `[v] -> [key]`
    pub fn to_property_key(&mut self) -> CompileResult<()> {
        self.stack.pop(StackEntry::Value, "ToPropertyKey")?;
        self.simple(OpCode::ToPropertyKey);
        self.stack.push(StackEntry::Key);
        Ok(())
    }

    /// `[] -> [obj]`
    pub fn new_object(&mut self) -> CompileResult<()> {
        self.simple(OpCode::NewObject);
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// `[obj, v] -> [obj]` with a literal key, `[obj, key, v] -> [obj]` otherwise.
    pub fn init_property(&mut self, key: Option<&str>) -> CompileResult<()> {
        self.stack.pop(StackEntry::Value, "InitProperty")?;
        match key {
            Some(key) => {
                let index = self.string_constant(key)?;
                self.with_operand(OpCode::InitProperty, Operand::Property(index));
            }
            None => {
                self.stack.pop(StackEntry::Key, "InitProperty")?;
                self.simple(OpCode::InitProperty);
            }
        }
        self.stack.peek(StackEntry::Value, "InitProperty")
    }

    /// `[v1 .. vn] -> [array]`
    pub fn new_array(&mut self, count: usize) -> CompileResult<()> {
        let operand = u16::try_from(count).map_err(|_| CompileError::TooManyElements(count))?;
        for _ in 0..count {
            self.stack.pop(StackEntry::Value, "NewArray")?;
        }
        self.with_operand(OpCode::NewArray, Operand::Count(operand));
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// `[] -> [fn]`
    pub fn create_function(&mut self, name: Option<&str>, kind: FunctionKind) -> CompileResult<()> {
        let name = name.map(|n| self.string_constant(n)).transpose()?;
        self.with_operand(OpCode::CreateFunction, Operand::Function { name, kind });
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// Names the anonymous function on top of the stack; `[fn] -> [fn]`.
    pub fn set_function_name(&mut self, name: &str) -> CompileResult<()> {
        self.stack.peek(StackEntry::Value, "SetFunctionName")?;
        let index = self.string_constant(name)?;
        self.with_operand(OpCode::SetFunctionName, Operand::Constant(index));
        Ok(())
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Throws on null/undefined; `[v] -> [v]`.
    pub fn require_object_coercible(&mut self) -> CompileResult<()> {
        self.stack.peek(StackEntry::Value, "RequireObjectCoercible")?;
        self.simple(OpCode::RequireObjectCoercible);
        Ok(())
    }

    /// Allocates a consumed-key set in a fresh temporary.
    pub fn new_key_set(&mut self) -> CompileResult<Temp> {
        let set = self.alloc_temp(StackEntry::KeySet)?;
        self.simple(OpCode::NewKeySet);
        self.stack.push(StackEntry::KeySet);
        self.store_local(set)?;
        Ok(set)
    }

    /// Records a literal key, or peeks the computed key on top of the stack.
    pub fn record_key(&mut self, set: Temp, key: Option<&str>) -> CompileResult<()> {
        Self::expect_temp(set, StackEntry::KeySet, "RecordKey")?;
        match key {
            Some(key) => {
                let key = self.string_constant(key)?;
                self.with_operand(
                    OpCode::RecordKey,
                    Operand::KeyedLocal {
                        slot: set.slot,
                        key,
                    },
                );
            }
            None => {
                self.stack.peek(StackEntry::Key, "RecordKey")?;
                self.with_operand(OpCode::RecordKey, Operand::Local(set.slot));
            }
        }
        Ok(())
    }

    /// `[source] -> [copy]`, excluding the keys in `set`.
    pub fn copy_data_properties(&mut self, set: Option<Temp>) -> CompileResult<()> {
        self.stack.pop(StackEntry::Value, "CopyDataProperties")?;
        match set {
            Some(set) => {
                Self::expect_temp(set, StackEntry::KeySet, "CopyDataProperties")?;
                self.with_operand(OpCode::CopyDataProperties, Operand::Local(set.slot));
            }
            None => {
                self.simple(OpCode::CopyDataProperties);
            }
        }
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    // ========================================================================
    // Iterators
    // ========================================================================

    /// `[v] -> []`, with the iterator stored in a fresh temporary.
    pub fn get_iterator(&mut self) -> CompileResult<Temp> {
        self.stack.pop(StackEntry::Value, "GetIterator")?;
        self.simple(OpCode::GetIterator);
        self.stack.push(StackEntry::Iterator);
        let cursor = self.alloc_temp(StackEntry::Iterator)?;
        self.store_local(cursor)?;
        Ok(cursor)
    }

    /// `[] -> [v]`
    pub fn iterator_step(&mut self, cursor: Temp) -> CompileResult<()> {
        Self::expect_temp(cursor, StackEntry::Iterator, "IteratorStep")?;
        self.with_operand(OpCode::IteratorStep, Operand::Local(cursor.slot));
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// `[] -> [array]`
    pub fn iterator_drain(&mut self, cursor: Temp) -> CompileResult<()> {
        Self::expect_temp(cursor, StackEntry::Iterator, "IteratorDrain")?;
        self.with_operand(OpCode::IteratorDrain, Operand::Local(cursor.slot));
        self.stack.push(StackEntry::Value);
        Ok(())
    }

    /// Closes the iterator on the normal path.
    pub fn iterator_close(&mut self, cursor: Temp) -> CompileResult<()> {
        Self::expect_temp(cursor, StackEntry::Iterator, "IteratorClose")?;
        self.with_operand(OpCode::IteratorClose, Operand::Local(cursor.slot));
        Ok(())
    }

    /// Closes the iterator while an exception is pending.
    pub fn iterator_close_on_throw(&mut self, cursor: Temp) -> CompileResult<()> {
        Self::expect_temp(cursor, StackEntry::Iterator, "IteratorCloseOnThrow")?;
        self.with_operand(OpCode::IteratorCloseOnThrow, Operand::Local(cursor.slot));
        Ok(())
    }

    // ========================================================================
    // Bindings and references
    // ========================================================================

    /// Creates an uninitialized binding in a known environment.
    pub fn create_mutable_binding(&mut self, env: EnvironmentHandle, name: &str) -> CompileResult<()> {
        let name = self.string_constant(name)?;
        self.with_operand(OpCode::CreateMutableBinding, Operand::Binding { env, name });
        Ok(())
    }

    /// `[v] -> []`
    pub fn initialize_binding(&mut self, env: EnvironmentHandle, name: &str) -> CompileResult<()> {
        let name = self.string_constant(name)?;
        self.stack.pop(StackEntry::Value, "InitializeBinding")?;
        self.with_operand(OpCode::InitializeBinding, Operand::Binding { env, name });
        Ok(())
    }

    /// `[] -> [ref]`
    pub fn resolve_binding(&mut self, name: &str) -> CompileResult<()> {
        let index = self.string_constant(name)?;
        self.with_operand(OpCode::ResolveBinding, Operand::Property(index));
        self.stack.push(StackEntry::Reference);
        Ok(())
    }

    /// `[base] -> [ref]` with a literal key, `[base, key] -> [ref]` otherwise.
    pub fn make_reference(&mut self, key: Option<&str>) -> CompileResult<()> {
        match key {
            Some(key) => {
                let index = self.string_constant(key)?;
                self.stack.pop(StackEntry::Value, "MakeReference")?;
                self.with_operand(OpCode::MakeReference, Operand::Property(index));
            }
            None => {
                self.stack.pop(StackEntry::Key, "MakeReference")?;
                self.stack.pop(StackEntry::Value, "MakeReference")?;
                self.simple(OpCode::MakeReference);
            }
        }
        self.stack.push(StackEntry::Reference);
        Ok(())
    }

    /// `[ref, v] -> []`
    pub fn put_value(&mut self) -> CompileResult<()> {
        self.stack.pop(StackEntry::Value, "PutValue")?;
        self.stack.pop(StackEntry::Reference, "PutValue")?;
        self.simple(OpCode::PutValue);
        Ok(())
    }

    // ========================================================================
    // Finishing
    // ========================================================================

    /// Appends `Halt` and hands out the chunk.
    pub fn finish(mut self, strict: bool) -> CompileResult<Bytecode> {
        if self.open_regions != 0 {
            return Err(CompileError::Internal(format!(
                "{} try regions left open",
                self.open_regions
            )));
        }
        self.simple(OpCode::Halt);
        self.bytecode.temporaries = self.next_temp;
        self.bytecode.strict = strict;
        Ok(self.bytecode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_are_interned() {
        let mut emitter = Emitter::new();
        let a = emitter.string_constant("a").unwrap();
        let b = emitter.string_constant("b").unwrap();
        assert_eq!(emitter.string_constant("a").unwrap(), a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_temporaries_are_reused() {
        let mut emitter = Emitter::new();
        let first = emitter.alloc_temp(StackEntry::Value).unwrap();
        let second = emitter.alloc_temp(StackEntry::Key).unwrap();
        assert_ne!(first.slot(), second.slot());
        emitter.free_temp(second);
        let third = emitter.alloc_temp(StackEntry::Iterator).unwrap();
        assert_eq!(third.slot(), second.slot());
        assert_eq!(third.kind(), StackEntry::Iterator);

        let bytecode = emitter.finish(false).unwrap();
        assert_eq!(bytecode.temporaries, 2);
    }

    #[test]
    fn test_get_v_needs_a_key_for_computed_reads() {
        let mut emitter = Emitter::new();
        emitter.load_undefined().unwrap();
        emitter.load_undefined().unwrap();
        let err = emitter.get_v(None).unwrap_err();
        assert!(matches!(
            err,
            CompileError::StackMismatch {
                context: "GetV",
                expected: StackEntry::Key,
                ..
            }
        ));
    }

    #[test]
    fn test_put_value_needs_reference_below_value() {
        let mut emitter = Emitter::new();
        emitter.resolve_binding("x").unwrap();
        emitter.load_undefined().unwrap();
        emitter.put_value().unwrap();
        assert_eq!(emitter.stack().depth(), 0);

        emitter.load_undefined().unwrap();
        emitter.load_undefined().unwrap();
        assert!(emitter.put_value().is_err());
    }

    #[test]
    fn test_iterator_ops_check_temp_kind() {
        let mut emitter = Emitter::new();
        let not_an_iterator = emitter.alloc_temp(StackEntry::Value).unwrap();
        assert!(matches!(
            emitter.iterator_step(not_an_iterator),
            Err(CompileError::TemporaryMismatch { .. })
        ));
    }

    #[test]
    fn test_jump_patching() {
        let mut emitter = Emitter::new();
        emitter.load_undefined().unwrap();
        let jump = emitter.jump_if_not_undefined().unwrap();
        emitter.pop().unwrap();
        emitter.load_constant(Value::Number(1.0)).unwrap();
        emitter.patch_jump(jump).unwrap();
        let bytecode = emitter.finish(false).unwrap();
        assert_eq!(bytecode.instructions[jump].operand, Some(Operand::Jump(4)));
    }

    #[test]
    fn test_unclosed_try_region_is_rejected() {
        let mut emitter = Emitter::new();
        let _region = emitter.enter_try();
        assert!(emitter.finish(false).is_err());
    }

    #[test]
    fn test_handler_restores_region_stack() {
        let mut emitter = Emitter::new();
        emitter.load_undefined().unwrap();
        let region = emitter.enter_try();
        emitter.load_undefined().unwrap();
        emitter.leave_try().unwrap();
        emitter.begin_handler(region).unwrap();
        assert_eq!(emitter.stack().entries(), &[StackEntry::Value]);
    }
}
