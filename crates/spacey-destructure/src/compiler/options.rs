// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiler configuration.

use serde::{Deserialize, Serialize};

/// Knobs for one compilation.
///
/// The two optimization switches only change the shape of the emitted code;
/// turning them off must never change what a program observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Strict mode code: writes to unresolvable references throw.
    pub strict: bool,
    /// Resolve an identifier target before its property key when key
    /// evaluation cannot observe the difference.
    pub hoist_references: bool,
    /// Skip the iterator-close handler around array patterns whose elements
    /// cannot throw after the last advance.
    pub elide_close_guards: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            strict: false,
            hoist_references: true,
            elide_close_guards: true,
        }
    }
}

impl CompileOptions {
    /// Default options in strict mode.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Every optimization off; the reference shape of the emitted code.
    pub fn unoptimized(self) -> Self {
        Self {
            hoist_references: false,
            elide_close_guards: false,
            ..self
        }
    }
}
