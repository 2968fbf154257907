//! The scanf family.
//!
//! `vfscanf` and `vsscanf` are the core hooks. glibc headers redirect most
//! scanf calls to the `__isoc99_` entry points, which differ from the plain
//! ones in how `%a` is read; those get core hooks of their own instead of
//! being folded into the plain ones. Since glibc 2.38, `_GNU_SOURCE` builds
//! (every C++ program) go to `__isoc23_` instead, which also reads `%b`
//! and `0b` prefixes, so those get a third set.

use std::ffi::{c_char, c_int, VaList};

use formatcheck_macros::interpose;
use libc::FILE;

use crate::check::check_format;
use crate::report::Family;
use crate::stdio;

#[interpose(real_vfscanf)]
unsafe fn vfscanf(stream: *mut FILE, format: *const c_char, ap: VaList) -> c_int {
    unsafe {
        check_format(format, Family::Scanf);
        real_vfscanf(stream, format, ap)
    }
}

#[interpose(real_vsscanf)]
unsafe fn vsscanf(s: *const c_char, format: *const c_char, ap: VaList) -> c_int {
    unsafe {
        check_format(format, Family::Scanf);
        real_vsscanf(s, format, ap)
    }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn vscanf(format: *const c_char, ap: VaList) -> c_int {
    unsafe { vfscanf(stdio::stdin(), format, ap) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn scanf(format: *const c_char, mut args: ...) -> c_int {
    unsafe { vfscanf(stdio::stdin(), format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn fscanf(stream: *mut FILE, format: *const c_char, mut args: ...) -> c_int {
    unsafe { vfscanf(stream, format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn sscanf(s: *const c_char, format: *const c_char, mut args: ...) -> c_int {
    unsafe { vsscanf(s, format, args.as_va_list()) }
}

#[interpose(real_isoc99_vfscanf)]
unsafe fn __isoc99_vfscanf(stream: *mut FILE, format: *const c_char, ap: VaList) -> c_int {
    unsafe {
        check_format(format, Family::Scanf);
        real_isoc99_vfscanf(stream, format, ap)
    }
}

#[interpose(real_isoc99_vsscanf)]
unsafe fn __isoc99_vsscanf(s: *const c_char, format: *const c_char, ap: VaList) -> c_int {
    unsafe {
        check_format(format, Family::Scanf);
        real_isoc99_vsscanf(s, format, ap)
    }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn __isoc99_vscanf(format: *const c_char, ap: VaList) -> c_int {
    unsafe { __isoc99_vfscanf(stdio::stdin(), format, ap) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn __isoc99_scanf(format: *const c_char, mut args: ...) -> c_int {
    unsafe { __isoc99_vfscanf(stdio::stdin(), format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn __isoc99_fscanf(
    stream: *mut FILE,
    format: *const c_char,
    mut args: ...
) -> c_int {
    unsafe { __isoc99_vfscanf(stream, format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn __isoc99_sscanf(
    s: *const c_char,
    format: *const c_char,
    mut args: ...
) -> c_int {
    unsafe { __isoc99_vsscanf(s, format, args.as_va_list()) }
}

#[interpose(real_isoc23_vfscanf)]
unsafe fn __isoc23_vfscanf(stream: *mut FILE, format: *const c_char, ap: VaList) -> c_int {
    unsafe {
        check_format(format, Family::Scanf);
        real_isoc23_vfscanf(stream, format, ap)
    }
}

#[interpose(real_isoc23_vsscanf)]
unsafe fn __isoc23_vsscanf(s: *const c_char, format: *const c_char, ap: VaList) -> c_int {
    unsafe {
        check_format(format, Family::Scanf);
        real_isoc23_vsscanf(s, format, ap)
    }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn __isoc23_vscanf(format: *const c_char, ap: VaList) -> c_int {
    unsafe { __isoc23_vfscanf(stdio::stdin(), format, ap) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn __isoc23_scanf(format: *const c_char, mut args: ...) -> c_int {
    unsafe { __isoc23_vfscanf(stdio::stdin(), format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn __isoc23_fscanf(
    stream: *mut FILE,
    format: *const c_char,
    mut args: ...
) -> c_int {
    unsafe { __isoc23_vfscanf(stream, format, args.as_va_list()) }
}

#[cfg_attr(not(test), no_mangle)]
pub unsafe extern "C" fn __isoc23_sscanf(
    s: *const c_char,
    format: *const c_char,
    mut args: ...
) -> c_int {
    unsafe { __isoc23_vsscanf(s, format, args.as_va_list()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::capture;
    use std::ffi::{c_double, CStr, CString};

    fn text(buf: &[c_char]) -> &[u8] {
        unsafe { CStr::from_ptr(buf.as_ptr()) }.to_bytes()
    }

    #[test]
    fn sscanf_matches_libc() {
        let input = c"17 widgets 2.5";
        let format = c"%d %15s %lf";

        let (mut n, mut word, mut x) = (0 as c_int, [0 as c_char; 16], 0.0 as c_double);
        let ours = unsafe {
            sscanf(
                input.as_ptr(),
                format.as_ptr(),
                &mut n as *mut c_int,
                word.as_mut_ptr(),
                &mut x as *mut c_double,
            )
        };

        let (mut n2, mut word2, mut x2) = (0 as c_int, [0 as c_char; 16], 0.0 as c_double);
        let theirs = unsafe {
            libc::sscanf(
                input.as_ptr(),
                format.as_ptr(),
                &mut n2 as *mut c_int,
                word2.as_mut_ptr(),
                &mut x2 as *mut c_double,
            )
        };

        assert_eq!(ours, 3);
        assert_eq!(ours, theirs);
        assert_eq!((n, text(&word), x), (17, &b"widgets"[..], 2.5));
        assert_eq!((n, text(&word), x), (n2, text(&word2), x2));
    }

    #[test]
    fn sscanf_with_writable_format() {
        // The unsafe pattern from the wild: a format string assembled at runtime.
        let mut format = [0 as c_char; 4];
        let rc = unsafe { crate::hooks::output::sprintf(format.as_mut_ptr(), c"%%s".as_ptr()) };
        assert_eq!(rc, 2);

        let mut buf = [0 as c_char; 16];
        let (rc, out) = capture::diagnostics(|| unsafe {
            sscanf(c"%d. unsafe".as_ptr(), format.as_ptr(), buf.as_mut_ptr())
        });
        assert_eq!(rc, 1);
        assert_eq!(text(&buf), b"%d.");
        assert_eq!(out.matches("ATTENTION: scanf format string").count(), 1);
        assert!(out.contains(r#"VALUE: "%s""#));
    }

    #[test]
    fn literal_scanf_formats_report_nothing() {
        let mut n: c_int = 0;
        let (rc, out) = capture::diagnostics(|| unsafe {
            sscanf(c"5".as_ptr(), c"%d".as_ptr(), &mut n as *mut c_int);
            __isoc99_sscanf(c"6".as_ptr(), c"%d".as_ptr(), &mut n as *mut c_int)
        });
        assert_eq!(rc, 1);
        assert_eq!(n, 6);
        assert_eq!(out, "");
    }

    #[test]
    fn sscanf_input_failure_matches_libc() {
        let mut n: c_int = 0;
        let ours = unsafe { sscanf(c"".as_ptr(), c"%d".as_ptr(), &mut n as *mut c_int) };
        let theirs = unsafe { libc::sscanf(c"".as_ptr(), c"%d".as_ptr(), &mut n as *mut c_int) };
        assert_eq!(ours, libc::EOF);
        assert_eq!(ours, theirs);

        let ours = unsafe { sscanf(c"abc".as_ptr(), c"%d".as_ptr(), &mut n as *mut c_int) };
        assert_eq!(ours, 0);
    }

    #[test]
    fn isoc99_sscanf_parses() {
        let (mut a, mut b) = (0 as c_int, 0 as c_int);
        let rc = unsafe {
            __isoc99_sscanf(
                c"10:20".as_ptr(),
                c"%d:%d".as_ptr(),
                &mut a as *mut c_int,
                &mut b as *mut c_int,
            )
        };
        assert_eq!(rc, 2);
        assert_eq!((a, b), (10, 20));
    }

    // Older glibc has no `__isoc23_` entry points to delegate to.
    fn has_isoc23() -> bool {
        !unsafe { libc::dlsym(libc::RTLD_DEFAULT, c"__isoc23_vsscanf".as_ptr()) }.is_null()
    }

    #[test]
    fn isoc23_sscanf_reads_binary() {
        if !has_isoc23() {
            return;
        }

        let (mut a, mut b) = (0 as c_int, 0 as c_int);
        let format = CString::new("%d:%b").unwrap();
        let (rc, out) = capture::diagnostics(|| unsafe {
            __isoc23_sscanf(
                c"10:101".as_ptr(),
                format.as_ptr(),
                &mut a as *mut c_int,
                &mut b as *mut c_int,
            )
        });
        assert_eq!(rc, 2);
        assert_eq!((a, b), (10, 5));
        assert_eq!(out.matches("ATTENTION: scanf").count(), 1);
    }

    #[test]
    fn isoc23_fscanf_reads_from_the_stream() {
        if !has_isoc23() {
            return;
        }

        let file = unsafe { libc::tmpfile() };
        assert!(!file.is_null());
        let contents = b"answer 42\n";
        unsafe {
            libc::fwrite(contents.as_ptr().cast(), 1, contents.len(), file);
            libc::rewind(file);
        }

        let mut n: c_int = 0;
        let (rc, out) = capture::diagnostics(|| unsafe {
            __isoc23_fscanf(file, c"answer %d".as_ptr(), &mut n as *mut c_int)
        });
        assert_eq!(rc, 1);
        assert_eq!(n, 42);
        assert_eq!(out, "");

        unsafe { libc::fclose(file) };
    }

    #[test]
    fn fscanf_reads_from_the_stream() {
        let file = unsafe { libc::tmpfile() };
        assert!(!file.is_null());

        let contents = b"answer 42\n";
        unsafe {
            libc::fwrite(contents.as_ptr().cast(), 1, contents.len(), file);
            libc::rewind(file);
        }

        let format = CString::new("answer %d").unwrap();
        let mut n: c_int = 0;
        let (rc, out) =
            capture::diagnostics(|| unsafe { fscanf(file, format.as_ptr(), &mut n as *mut c_int) });
        assert_eq!(rc, 1);
        assert_eq!(n, 42);
        assert_eq!(out.matches("ATTENTION: scanf").count(), 1);

        unsafe { libc::rewind(file) };
        n = 0;
        let (rc, out) = capture::diagnostics(|| unsafe {
            __isoc99_fscanf(file, format.as_ptr(), &mut n as *mut c_int)
        });
        assert_eq!(rc, 1);
        assert_eq!(n, 42);
        assert_eq!(out.matches("ATTENTION: scanf").count(), 1);

        unsafe { libc::fclose(file) };
    }
}
