// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Requested/bound pairs for plain stage state such as topology or blend factor.

/// A piece of fixed-function state, bound only when it differs from the last bound value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarState<T: Copy + PartialEq> {
    requested: T,
    bound: Option<T>,
}

impl<T: Copy + PartialEq> ScalarState<T> {
    pub fn new(initial: T) -> Self {
        ScalarState {
            requested: initial,
            bound: None,
        }
    }

    pub fn set(&mut self, value: T) {
        self.requested = value;
    }

    pub fn get(&self) -> T {
        self.requested
    }

    /// Returns the value to send if it differs from what was last bound.
    ///
    /// The first call after construction or [`Self::reset`] always returns the value.
    pub fn bind(&mut self) -> Option<T> {
        if self.bound == Some(self.requested) {
            return None;
        }
        self.bound = Some(self.requested);
        self.bound
    }

    /// Forgets the bound value, so the next [`Self::bind`] resends it.
    pub fn reset(&mut self) {
        self.bound = None;
    }
}
