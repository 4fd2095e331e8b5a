// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Collision-free name allocation.

use std::collections::HashSet;

/// Hands out names that are unique within one model.
///
/// Explicit names are reserved first; generated names then take the first
/// free candidate among `base`, `base_1`, `base_2`, ...
#[derive(Debug, Default)]
pub(crate) struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as taken. Returns `false` if it already was.
    pub(crate) fn reserve(&mut self, name: &str) -> bool {
        self.used.insert(name.to_string())
    }

    /// Allocates a fresh name derived from `base`.
    pub(crate) fn fresh(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
