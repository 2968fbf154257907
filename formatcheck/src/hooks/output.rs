//! The printf family.
//!
//! `vfprintf` and `vsprintf` are the core hooks. `vsnprintf` binds the
//! caller's buffer to a bounded stream and goes through `vfprintf`;
//! `vsprintf` can't do the same, since there's no bound to give the stream,
//! so it checks and delegates on its own.

use std::ffi::{c_char, c_int, VaList};

use formatcheck_macros::interpose;
use libc::{size_t, FILE};

use crate::check::check_format;
use crate::report::Family;
use crate::stdio::{self, BoundedBuffer};

#[interpose(real_vfprintf)]
unsafe fn vfprintf(stream: *mut FILE, format: *const c_char, ap: VaList) -> c_int {
    unsafe {
        check_format(format, Family::Printf);
        real_vfprintf(stream, format, ap)
    }
}

#[interpose(real_vsprintf)]
unsafe fn vsprintf(s: *mut c_char, format: *const c_char, ap: VaList) -> c_int {
    unsafe {
        check_format(format, Family::Printf);
        real_vsprintf(s, format, ap)
    }
}

#[interpose(real_vsnprintf)]
unsafe fn vsnprintf(s: *mut c_char, size: size_t, format: *const c_char, ap: VaList) -> c_int {
    let mut buffer = BoundedBuffer::new(s, size);

    // The stream has to be closed (and the buffer terminated) before
    // `buffer` goes away, so the result is bound first.
    let rc = match unsafe { buffer.open() } {
        Some(stream) => unsafe { vfprintf(stream.as_ptr(), format, ap) },
        // Out of memory for the stream: still check, and let the C library
        // deal with the call itself.
        None => unsafe {
            check_format(format, Family::Printf);
            real_vsnprintf(s, size, format, ap)
        },
    };
    rc
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn vprintf(format: *const c_char, ap: VaList) -> c_int {
    unsafe { vfprintf(stdio::stdout(), format, ap) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn printf(format: *const c_char, mut args: ...) -> c_int {
    unsafe { vfprintf(stdio::stdout(), format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn fprintf(stream: *mut FILE, format: *const c_char, mut args: ...) -> c_int {
    unsafe { vfprintf(stream, format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn sprintf(s: *mut c_char, format: *const c_char, mut args: ...) -> c_int {
    unsafe { vsprintf(s, format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn snprintf(
    s: *mut c_char,
    size: size_t,
    format: *const c_char,
    mut args: ...
) -> c_int {
    unsafe { vsnprintf(s, size, format, args.as_va_list()) }
}
