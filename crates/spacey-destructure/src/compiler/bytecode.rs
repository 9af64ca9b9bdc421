// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.
//!
//! Opcode docs use `[before] -> [after]` for the top of the operand stack.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::FunctionKind;
use crate::runtime::value::Value;

/// A compiled bytecode chunk.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
    /// The constant pool (primitives only)
    pub constants: Vec<Value>,
    /// Number of temporary slots an activation needs
    pub temporaries: u16,
    /// Whether references created by this chunk follow strict-mode rules
    pub strict: bool,
}

impl Bytecode {
    /// Creates a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    /// Adds a constant and returns its index, or None once the pool is full.
    pub fn add_constant(&mut self, value: Value) -> Option<u16> {
        let index = u16::try_from(self.constants.len()).ok()?;
        self.constants.push(value);
        Some(index)
    }

    /// Reads a string constant.
    pub fn string(&self, index: u16) -> Option<&str> {
        match self.constants.get(index as usize) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Counts instructions with the given opcode.
    pub fn count(&self, opcode: OpCode) -> usize {
        self.instructions
            .iter()
            .filter(|i| i.opcode == opcode)
            .count()
    }

    /// The opcode sequence, handy for shape assertions.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions.iter().map(|i| i.opcode).collect()
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }
}

/// The environment record a direct-mode binding is created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentHandle {
    /// The running lexical environment
    Lexical,
    /// The running variable environment
    Variable,
    /// An environment record held in a temporary slot
    Slot(u16),
}

impl fmt::Display for EnvironmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentHandle::Lexical => write!(f, "lexical"),
            EnvironmentHandle::Variable => write!(f, "variable"),
            EnvironmentHandle::Slot(slot) => write!(f, "env@t{}", slot),
        }
    }
}

/// Instruction operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Constant pool index
    Constant(u16),
    /// Temporary slot index
    Local(u16),
    /// Absolute jump target
    Jump(i32),
    /// Element count
    Count(u16),
    /// Property name index in constant pool
    Property(u16),
    /// A name in a statically known environment
    Binding {
        /// Target environment
        env: EnvironmentHandle,
        /// Name index in constant pool
        name: u16,
    },
    /// Function creation data
    Function {
        /// Own name index in constant pool
        name: Option<u16>,
        /// Syntactic flavour
        kind: FunctionKind,
    },
    /// A temporary slot paired with a literal key
    KeyedLocal {
        /// Temporary slot index
        slot: u16,
        /// Key index in constant pool
        key: u16,
    },
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // Stack operations
    /// Push a constant: `[] -> [v]`
    LoadConst,
    /// Push undefined
    LoadUndefined,
    /// Push null
    LoadNull,
    /// Push true
    LoadTrue,
    /// Push false
    LoadFalse,
    /// Pop the top value
    Pop,
    /// Duplicate the top value: `[a] -> [a, a]`
    Dup,
    /// Swap top two values: `[a, b] -> [b, a]`
    Swap,
    /// Copy the second value: `[a, b] -> [a, b, a]`
    Over,

    // Temporaries
    /// Push a temporary slot
    LoadLocal,
    /// Pop into a temporary slot
    StoreLocal,

    // Control flow
    /// Unconditional jump
    Jump,
    /// Jump if the top value is not undefined; never pops
    JumpIfNotUndefined,
    /// Install an exception handler at the jump target
    EnterTry,
    /// Remove the innermost exception handler
    LeaveTry,
    /// Re-raise the exception caught by the current handler
    Rethrow,
    /// Stop execution; the top value (if any) is the result
    Halt,

    // Expression support
    /// Read an identifier through the scope chain: `[] -> [v]`
    LoadBinding,
    /// GetV with a literal key (operand) or a key on the stack:
    /// `[base] -> [v]` or `[base, key] -> [v]`
    GetV,
    /// ToPropertyKey: `[v] -> [key]`
    ToPropertyKey,
    /// Create an empty object
    NewObject,
    /// Define a property on the object below the value:
    /// `[obj, v] -> [obj]` or `[obj, key, v] -> [obj]`
    InitProperty,
    /// Collect the top `Count` values into a new array
    NewArray,
    /// Create a function object
    CreateFunction,

    // Destructuring primitives
    /// Throw TypeError if the top value is null or undefined; never pops
    RequireObjectCoercible,
    /// Create an empty consumed-key set: `[] -> [set]`
    NewKeySet,
    /// Record a key in the set held in `Local`; computed form peeks `[key]`
    RecordKey,
    /// Copy own enumerable properties except the keys in the set held in
    /// `Local` (or none): `[source] -> [copy]`
    CopyDataProperties,
    /// GetIterator: `[v] -> [iterator]`
    GetIterator,
    /// Advance the iterator in `Local`: `[] -> [v]`, undefined once done
    IteratorStep,
    /// Drain the iterator in `Local` into a new array: `[] -> [array]`
    IteratorDrain,
    /// Close the iterator in `Local` unless done; errors propagate
    IteratorClose,
    /// Close the iterator in `Local` unless done; errors are discarded
    IteratorCloseOnThrow,
    /// Give an anonymous function on top of the stack its inferred name
    SetFunctionName,
    /// Create an uninitialized mutable binding
    CreateMutableBinding,
    /// Initialize a binding: `[v] -> []`
    InitializeBinding,
    /// Resolve a name through the scope chain: `[] -> [ref]`
    ResolveBinding,
    /// Build a property reference: `[base] -> [ref]` or `[base, key] -> [ref]`
    MakeReference,
    /// Write through a reference: `[ref, v] -> []`
    PutValue,
}

impl OpCode {
    /// Mnemonic for disassembly.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::LoadConst => "LoadConst",
            OpCode::LoadUndefined => "LoadUndefined",
            OpCode::LoadNull => "LoadNull",
            OpCode::LoadTrue => "LoadTrue",
            OpCode::LoadFalse => "LoadFalse",
            OpCode::Pop => "Pop",
            OpCode::Dup => "Dup",
            OpCode::Swap => "Swap",
            OpCode::Over => "Over",
            OpCode::LoadLocal => "LoadLocal",
            OpCode::StoreLocal => "StoreLocal",
            OpCode::Jump => "Jump",
            OpCode::JumpIfNotUndefined => "JumpIfNotUndefined",
            OpCode::EnterTry => "EnterTry",
            OpCode::LeaveTry => "LeaveTry",
            OpCode::Rethrow => "Rethrow",
            OpCode::Halt => "Halt",
            OpCode::LoadBinding => "LoadBinding",
            OpCode::GetV => "GetV",
            OpCode::ToPropertyKey => "ToPropertyKey",
            OpCode::NewObject => "NewObject",
            OpCode::InitProperty => "InitProperty",
            OpCode::NewArray => "NewArray",
            OpCode::CreateFunction => "CreateFunction",
            OpCode::RequireObjectCoercible => "RequireObjectCoercible",
            OpCode::NewKeySet => "NewKeySet",
            OpCode::RecordKey => "RecordKey",
            OpCode::CopyDataProperties => "CopyDataProperties",
            OpCode::GetIterator => "GetIterator",
            OpCode::IteratorStep => "IteratorStep",
            OpCode::IteratorDrain => "IteratorDrain",
            OpCode::IteratorClose => "IteratorClose",
            OpCode::IteratorCloseOnThrow => "IteratorCloseOnThrow",
            OpCode::SetFunctionName => "SetFunctionName",
            OpCode::CreateMutableBinding => "CreateMutableBinding",
            OpCode::InitializeBinding => "InitializeBinding",
            OpCode::ResolveBinding => "ResolveBinding",
            OpCode::MakeReference => "MakeReference",
            OpCode::PutValue => "PutValue",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Disassembly
// ============================================================================

impl Bytecode {
    fn constant_text(&self, index: u16) -> String {
        match self.constants.get(index as usize) {
            Some(Value::String(s)) => format!("{:?}", s),
            Some(other) => other.to_string(),
            None => format!("#{}?", index),
        }
    }

    /// Renders one operand with constants resolved.
    pub fn describe_operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Constant(idx) | Operand::Property(idx) => self.constant_text(*idx),
            Operand::Local(slot) => format!("t{}", slot),
            Operand::Jump(target) => format!("-> {}", target),
            Operand::Count(n) => n.to_string(),
            Operand::Binding { env, name } => format!("{} {}", env, self.constant_text(*name)),
            Operand::Function { name, kind } => match name {
                Some(name) => format!("{:?} {}", kind, self.constant_text(*name)),
                None => format!("{:?} <anonymous>", kind),
            },
            Operand::KeyedLocal { slot, key } => format!("t{} {}", slot, self.constant_text(*key)),
        }
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "; {} instructions, {} constants, {} temporaries{}",
            self.instructions.len(),
            self.constants.len(),
            self.temporaries,
            if self.strict { ", strict" } else { "" }
        )?;
        for (index, instruction) in self.instructions.iter().enumerate() {
            match &instruction.operand {
                Some(operand) => writeln!(
                    f,
                    "{:>4}  {:<22} {}",
                    index,
                    instruction.opcode.name(),
                    self.describe_operand(operand)
                )?,
                None => writeln!(f, "{:>4}  {}", index, instruction.opcode.name())?,
            }
        }
        Ok(())
    }
}
