//! Diagnostic rendering and the stderr sink.

use std::ffi::{c_char, c_int, CStr};
use std::fmt::{self, Write as _};
use std::io::{self, Write};

use crate::maps::Classification;
use crate::stdio;

/// Which family of entry points a format string was handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Printf,
    Scanf,
}

impl Family {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Printf => "printf",
            Self::Scanf => "scanf",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Renders the diagnostic for one classified format string into `out`.
///
/// `NotWritable` renders nothing. Everything else is rendered up front and
/// handed to `out` in a single `write_all`, so concurrent reports don't
/// interleave mid-line on a shared stream.
///
/// # Safety
///
/// If `classification` is `Writable`, `format` must point to a NUL-terminated
/// string. Every hooked entry point requires that of its callers anyway.
pub unsafe fn report<W: Write>(
    out: &mut W,
    classification: Classification,
    format: *const c_char,
    family: Family,
) -> io::Result<()> {
    let mut msg = Vec::with_capacity(128);

    match classification {
        Classification::NotWritable => return Ok(()),
        Classification::Unknown => {
            writeln!(
                msg,
                "FORMATCHECK: ERROR could not determine if {format:p} is writable"
            )?;
        }
        Classification::Writable => {
            let text = unsafe { CStr::from_ptr(format) }.to_bytes();
            writeln!(
                msg,
                "FORMATCHECK: ATTENTION: {family} format string at {format:p} is writable!"
            )?;
            writeln!(msg, "FORMATCHECK:    VALUE: \"{}\"", Quoted(text))?;
        }
    }

    out.write_all(&msg)
}

/// Format string text as written, except for what would break the quoted
/// line on a terminal: control characters, `"` and `\` are escaped, and
/// bytes that aren't UTF-8 show up as `\xNN`.
struct Quoted<'a>(&'a [u8]);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0.utf8_chunks() {
            for c in chunk.valid().chars() {
                match c {
                    '"' | '\\' => write!(f, "\\{c}")?,
                    c if c.is_ascii_control() => write!(f, "{}", (c as u8).escape_ascii())?,
                    c if c.is_control() => write!(f, "{}", c.escape_unicode())?,
                    c => f.write_char(c)?,
                }
            }
            for byte in chunk.invalid() {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

/// Writes to the C library's `stderr` stream.
///
/// Going through stdio rather than fd 2 keeps diagnostics ordered with
/// whatever the monitored program itself writes to `stderr`. Inside the
/// preloaded library the `fprintf` below lands in our own hook, where the
/// reentrancy guard turns it into a plain pass-through.
pub struct StderrSink;

impl Write for StderrSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let len = c_int::try_from(buf.len()).unwrap_or(c_int::MAX);
        let written = unsafe {
            libc::fprintf(
                stdio::stderr(),
                c"%.*s".as_ptr(),
                len,
                buf.as_ptr().cast::<c_char>(),
            )
        };

        if written < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(written as usize)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if unsafe { libc::fflush(stdio::stderr()) } == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}
