// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Brain lifecycle
//!
//! ```text
//! Uninitialized -> Initializing -> Running <-> Paused
//!                        |            |          |
//!                        +------> Resetting <----+      (reset, then Paused)
//! any state -> Shutdown
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::error::{BrainError, BrainResult};

/// Global brain state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum BrainState {
    Uninitialized = 0,
    Initializing = 1,
    Running = 2,
    Paused = 3,
    Resetting = 4,
    Shutdown = 5,
}

impl BrainState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => BrainState::Uninitialized,
            1 => BrainState::Initializing,
            2 => BrainState::Running,
            3 => BrainState::Paused,
            4 => BrainState::Resetting,
            _ => BrainState::Shutdown,
        }
    }

    /// Whether regions may still be added
    pub fn is_building(self) -> bool {
        matches!(self, BrainState::Uninitialized | BrainState::Initializing)
    }
}

impl fmt::Display for BrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrainState::Uninitialized => "uninitialized",
            BrainState::Initializing => "initializing",
            BrainState::Running => "running",
            BrainState::Paused => "paused",
            BrainState::Resetting => "resetting",
            BrainState::Shutdown => "shut down",
        };
        f.write_str(name)
    }
}

/// Atomic state cell with validated transitions
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new(initial: BrainState) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> BrainState {
        BrainState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `to` if the current state is one of `from`
    pub fn transition(
        &self,
        operation: &'static str,
        from: &[BrainState],
        to: BrainState,
    ) -> BrainResult<BrainState> {
        let mut current = self.get();
        loop {
            if !from.contains(&current) {
                return Err(BrainError::InvalidTransition {
                    operation,
                    state: current,
                });
            }
            match self.state.compare_exchange(
                current as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current),
                Err(actual) => current = BrainState::from_u8(actual),
            }
        }
    }

    /// Unconditional store (shutdown and internal completion steps)
    pub fn force(&self, to: BrainState) {
        self.state.store(to as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_and_invalid_transitions() {
        let lifecycle = Lifecycle::new(BrainState::Uninitialized);
        assert!(lifecycle
            .transition("start", &[BrainState::Initializing], BrainState::Running)
            .is_err());
        assert_eq!(
            lifecycle
                .transition("initialize", &[BrainState::Uninitialized], BrainState::Initializing)
                .unwrap(),
            BrainState::Uninitialized
        );
        assert_eq!(lifecycle.get(), BrainState::Initializing);

        let err = lifecycle
            .transition("resume", &[BrainState::Paused], BrainState::Running)
            .unwrap_err();
        assert!(matches!(
            err,
            BrainError::InvalidTransition {
                state: BrainState::Initializing,
                ..
            }
        ));
    }

    #[test]
    fn test_state_roundtrip_through_u8() {
        for state in [
            BrainState::Uninitialized,
            BrainState::Initializing,
            BrainState::Running,
            BrainState::Paused,
            BrainState::Resetting,
            BrainState::Shutdown,
        ] {
            assert_eq!(BrainState::from_u8(state as u8), state);
        }
    }
}
