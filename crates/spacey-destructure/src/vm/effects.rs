// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Observable side effects, recorded in execution order.

use std::fmt;

/// One observable step taken by compiled code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// An identifier was read through the scope chain
    Read(String),
    /// A property was read (`GetV` or a rest copy)
    Get(String),
    /// A binding name or property key was resolved to a reference
    Resolve(String),
    /// A value was written through a reference
    Put(String),
    /// A binding was initialized in a known environment
    Initialize(String),
    /// A computed key was coerced to this property key
    KeyCoercion(String),
    /// `next` was called on the labelled iterator
    IteratorNext(String),
    /// `return` was called on the labelled iterator
    IteratorReturn(String),
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Read(name) => write!(f, "read {}", name),
            Effect::Get(key) => write!(f, "get {}", key),
            Effect::Resolve(name) => write!(f, "resolve {}", name),
            Effect::Put(name) => write!(f, "put {}", name),
            Effect::Initialize(name) => write!(f, "init {}", name),
            Effect::KeyCoercion(key) => write!(f, "key {}", key),
            Effect::IteratorNext(label) => write!(f, "next {}", label),
            Effect::IteratorReturn(label) => write!(f, "return {}", label),
        }
    }
}
