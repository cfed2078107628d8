//! # Exit code and its set-once latch.
//!
//! [`ExitCode`] is the only thing the lifecycle reports to its caller.
//! `ExitState` holds it: unset until the first `set`, fixed afterwards.
//! Failures call `set(Failure)` as they happen; teardown finally calls
//! `set(Success)`, which is a no-op if any failure got there first.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Final outcome of a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitCode {
    /// No runner or closer failed. Process exit code `0`.
    Success,
    /// At least one runner or closer failed or panicked. Process exit code `1`.
    Failure,
}

impl ExitCode {
    /// Numeric process exit code.
    #[inline]
    pub fn as_i32(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Failure => 1,
        }
    }

    /// Returns `true` for [`ExitCode::Success`].
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => std::process::ExitCode::SUCCESS,
            ExitCode::Failure => std::process::ExitCode::FAILURE,
        }
    }
}

const UNSET: u8 = 0;
const SUCCESS: u8 = 1;
const FAILURE: u8 = 2;

/// Tri-state latch: unset, then fixed forever by the first setter.
#[derive(Debug)]
pub(crate) struct ExitState(AtomicU8);

impl ExitState {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(UNSET))
    }

    /// Fixes the state to `code` unless already set. Returns `true` if this call won.
    pub(crate) fn set(&self, code: ExitCode) -> bool {
        let raw = match code {
            ExitCode::Success => SUCCESS,
            ExitCode::Failure => FAILURE,
        };
        self.0
            .compare_exchange(UNSET, raw, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn get(&self) -> Option<ExitCode> {
        match self.0.load(Ordering::Acquire) {
            SUCCESS => Some(ExitCode::Success),
            FAILURE => Some(ExitCode::Failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_setter_wins() {
        let state = ExitState::new();
        assert_eq!(state.get(), None);
        assert!(state.set(ExitCode::Failure));
        assert!(!state.set(ExitCode::Success));
        assert!(!state.set(ExitCode::Failure));
        assert_eq!(state.get(), Some(ExitCode::Failure));
    }

    #[test]
    fn test_exactly_one_concurrent_winner() {
        let state = Arc::new(ExitState::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    let code = if i % 2 == 0 {
                        ExitCode::Success
                    } else {
                        ExitCode::Failure
                    };
                    state.set(code)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(state.get().is_some());
    }

    #[test]
    fn test_numeric_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(ExitCode::Failure.as_i32(), 1);
        assert_eq!(ExitCode::Failure.to_string(), "1");
        assert!(ExitCode::Success.is_success());
    }
}
