//! Check-and-report: the step every core hook runs before delegating.

use std::ffi::{c_char, c_int};
use std::io::Write;

use crate::config::{self, Mode};
use crate::guard::ReentrancyGuard;
use crate::maps;
use crate::report::{self, Family};

#[cfg(test)]
use self::capture::Sink;
#[cfg(not(test))]
use crate::report::StderrSink as Sink;

/// Classifies `format` and reports it to `stderr`.
///
/// Never fails and never changes what the caller's call does next: a
/// nested call on the same thread is skipped, errors while reporting are
/// dropped, and `errno` is left as the caller set it.
///
/// # Safety
///
/// `format` must be null or point to a NUL-terminated string.
pub unsafe fn check_format(format: *const c_char, family: Family) {
    unsafe { check_format_into(&mut Sink, format, family) }
}

/// Like [`check_format`], but reports into `out`.
///
/// # Safety
///
/// `format` must be null or point to a NUL-terminated string.
pub unsafe fn check_format_into<W: Write>(out: &mut W, format: *const c_char, family: Family) {
    unsafe { check_with_mode(out, format, family, config::mode()) }
}

unsafe fn check_with_mode<W: Write>(
    out: &mut W,
    format: *const c_char,
    family: Family,
    mode: Mode,
) {
    let _errno = SavedErrno::save();

    if !mode.checks_enabled() {
        return;
    }

    let Some(_guard) = ReentrancyGuard::enter() else {
        return;
    };

    let classification = maps::classify(format as usize);
    if mode.reports(classification) {
        let _ = unsafe { report::report(out, classification, format, family) };
    }
}

/// Puts `errno` back on drop. Reading `/proc/self/maps` and a failed
/// write to `stderr` both set it, and the delegated call (`%m`) or its
/// caller may read it afterwards.
struct SavedErrno(c_int);

impl SavedErrno {
    fn save() -> Self {
        Self(unsafe { *libc::__errno_location() })
    }
}

impl Drop for SavedErrno {
    fn drop(&mut self) {
        unsafe { *libc::__errno_location() = self.0 };
    }
}
