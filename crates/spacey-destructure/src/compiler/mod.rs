// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Pattern compiler.
//!
//! # Module Structure
//!
//! - `bytecode`: Instructions, operands and disassembly
//! - `codegen`: The recursive pattern compiler
//!   - `codegen::emitter`: Emission with operand-stack bookkeeping
//!   - `codegen::scope`: Static scope facts
//! - `options`: Compiler configuration
//! - `batch`: Self-contained units and (parallel) batch compilation

pub mod batch;
pub mod bytecode;
pub mod codegen;
pub mod error;
pub mod options;

pub use batch::{CompileUnit, UnitTarget, compile_batch, compile_unit};
pub use bytecode::{Bytecode, EnvironmentHandle, Instruction, OpCode, Operand};
pub use codegen::{BasicExpressions, BindingMode, Compiler, ExpressionCompiler, Scope, StackEntry, Temp};
pub use error::{CompileError, CompileResult};
pub use options::CompileOptions;
