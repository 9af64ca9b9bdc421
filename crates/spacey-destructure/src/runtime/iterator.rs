// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Iterator records and the iterables the interpreter knows how to walk.

use super::object::{Heap, ObjectKind};
use super::value::Value;
use crate::Error;

/// A scripted iterable whose behaviour is fixed up front, so tests can
/// observe every `next` and `return` call.
#[derive(Debug, Clone, Default)]
pub struct IterableSpec {
    /// Name used in the effect journal
    pub label: String,
    /// Values produced before the iterator reports done
    pub values: Vec<Value>,
    /// `next` throws on this call (0-based) instead of producing a value
    pub throw_on_step: Option<usize>,
    /// `return` throws when called
    pub throw_on_return: bool,
}

impl IterableSpec {
    /// An iterable that yields `values` and then completes.
    pub fn new(label: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            label: label.into(),
            values,
            ..Self::default()
        }
    }
}

/// Where an iterator record pulls its values from.
#[derive(Debug, Clone)]
pub enum IteratorSource {
    /// Built-in array iterator; reads `length` on every step
    Array(usize),
    /// Built-in string iterator over code points
    String(Vec<char>),
    /// A scripted iterable object
    Scripted(usize),
}

/// Iterator state for one `GetIterator` call.
#[derive(Debug, Clone)]
pub struct IteratorRecord {
    /// The value source
    pub source: IteratorSource,
    /// Number of `next` calls made so far
    pub position: usize,
    /// Set once `next` reported completion or threw
    pub done: bool,
}

/// Outcome of advancing an iterator once.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The iterator produced a value
    Value(Value),
    /// The iterator is exhausted
    Done,
}

impl IteratorRecord {
    /// Creates an iterator record positioned before the first value.
    pub fn new(source: IteratorSource) -> Self {
        Self {
            source,
            position: 0,
            done: false,
        }
    }

    /// Returns true if closing this iterator calls a scripted `return`.
    pub fn has_return_method(&self) -> bool {
        matches!(self.source, IteratorSource::Scripted(_))
    }

    /// Label for the effect journal.
    pub fn label(&self, heap: &Heap) -> String {
        match &self.source {
            IteratorSource::Array(id) => format!("array#{}", id),
            IteratorSource::String(_) => "string".to_string(),
            IteratorSource::Scripted(id) => match heap.get(*id).map(|o| &o.kind) {
                Ok(ObjectKind::Iterable(spec)) => spec.label.clone(),
                _ => format!("iterable#{}", id),
            },
        }
    }

    /// Calls `next` once. Must not be called after the record is done.
    ///
    /// A throwing `next` marks the record done before the error propagates,
    /// so nobody closes an iterator whose `next` just failed.
    pub fn step(&mut self, heap: &Heap) -> Result<Step, Error> {
        let index = self.position;
        self.position += 1;

        let produced = match &self.source {
            IteratorSource::Array(id) => {
                let array = heap.get(*id)?;
                (index < array.array_length())
                    .then(|| array.get_own(&index.to_string()).unwrap_or_default())
            }
            IteratorSource::String(chars) => {
                chars.get(index).map(|c| Value::String(c.to_string()))
            }
            IteratorSource::Scripted(id) => match &heap.get(*id)?.kind {
                ObjectKind::Iterable(spec) => {
                    if spec.throw_on_step == Some(index) {
                        self.done = true;
                        return Err(Error::Thrown(format!("{}.next() failed", spec.label)));
                    }
                    spec.values.get(index).cloned()
                }
                _ => None,
            },
        };

        match produced {
            Some(value) => Ok(Step::Value(value)),
            None => {
                self.done = true;
                Ok(Step::Done)
            }
        }
    }

    /// Calls `return` if there is one. The caller checks `done` first.
    pub fn close(&mut self, heap: &Heap) -> Result<(), Error> {
        self.done = true;
        if let IteratorSource::Scripted(id) = &self.source {
            if let ObjectKind::Iterable(spec) = &heap.get(*id)?.kind {
                if spec.throw_on_return {
                    return Err(Error::Thrown(format!("{}.return() failed", spec.label)));
                }
            }
        }
        Ok(())
    }
}
