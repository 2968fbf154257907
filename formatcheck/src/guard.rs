//! Per-thread reentrancy guard for check-and-report.
//!
//! Reporting is itself formatted output, so inside the preloaded library it
//! lands right back in the printf hooks. The guard makes that nested call
//! skip its own check and go straight to the real implementation.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static CHECKING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside check-and-report until dropped.
///
/// Not `Send`: the mark belongs to the thread that set it.
pub struct ReentrancyGuard {
    _thread_bound: PhantomData<*const ()>,
}

impl ReentrancyGuard {
    /// Enters check-and-report on this thread.
    ///
    /// Returns `None` if this thread is already inside it, or if its
    /// thread-local storage has already been torn down (hooks called from
    /// TLS destructors during thread exit). Either way the caller skips the
    /// check and only delegates.
    pub fn enter() -> Option<Self> {
        CHECKING
            .try_with(|checking| {
                if checking.replace(true) {
                    None
                } else {
                    Some(Self {
                        _thread_bound: PhantomData,
                    })
                }
            })
            .unwrap_or(None)
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        let _ = CHECKING.try_with(|checking| checking.set(false));
    }
}

/// Whether the current thread is inside check-and-report.
pub fn is_entered() -> bool {
    CHECKING.try_with(Cell::get).unwrap_or(false)
}
