// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resolved references.

use super::value::Value;

/// A resolved, not yet written handle to a binding or property.
#[derive(Debug, Clone)]
pub enum Reference {
    /// A binding in a specific environment record
    Binding {
        /// Environment record index
        env: usize,
        /// Binding name
        name: String,
        /// Whether the reference was created by strict code
        strict: bool,
    },
    /// A property of some base value
    Property {
        /// The base value (already evaluated)
        base: Value,
        /// The property key (already coerced)
        key: String,
        /// Whether the reference was created by strict code
        strict: bool,
    },
    /// A name that no environment in the chain knows about
    Unresolvable {
        /// Binding name
        name: String,
        /// Whether the reference was created by strict code
        strict: bool,
    },
}

impl Reference {
    /// The referenced name or property key.
    pub fn name(&self) -> &str {
        match self {
            Reference::Binding { name, .. } | Reference::Unresolvable { name, .. } => name,
            Reference::Property { key, .. } => key,
        }
    }

    /// Whether writes through this reference follow strict-mode rules.
    pub fn is_strict(&self) -> bool {
        match self {
            Reference::Binding { strict, .. }
            | Reference::Property { strict, .. }
            | Reference::Unresolvable { strict, .. } => *strict,
        }
    }
}
