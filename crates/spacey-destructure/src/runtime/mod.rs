// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime collaborators the compiled patterns talk to: values, objects,
//! environment records, references and iterators.

pub mod environment;
pub mod iterator;
pub mod object;
pub mod reference;
pub mod value;

pub use environment::{Environment, EnvironmentKind};
pub use iterator::{IterableSpec, IteratorRecord, IteratorSource, Step};
pub use object::{Heap, JsObject, ObjectKind, PropertyDescriptor};
pub use reference::Reference;
pub use value::Value;
