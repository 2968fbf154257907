#![feature(c_variadic)]
#![allow(clippy::missing_safety_doc)]
//! # `formatcheck`
//!
//! An `LD_PRELOAD` library that finds writable `printf`/`scanf` format
//! strings at runtime.
//!
//! A format string that lives in read-only memory (a literal in the program
//! image) can't be tampered with. One that lives in writable memory might
//! be, and then `%n` and friends turn it into a memory disclosure or an
//! arbitrary write. `formatcheck` doesn't know
//! where a format string *came from*; it only knows whether the memory it
//! sits in is writable right now, according to `/proc/self/maps`.
//!
//! ```text
//! $ LD_PRELOAD=$PWD/target/release/libformatcheck.so ./some-program
//! FORMATCHECK: ATTENTION: printf format string at 0x7ffc2e0a1b20 is writable!
//! FORMATCHECK:    VALUE: "%d. unsafe\n"
//! ```
//!
//! Diagnostics go to `stderr`. The intercepted calls themselves return and
//! write exactly what they would without the library, and nothing is ever
//! blocked.
//!
//! Set `FORMATCHECK_MODE` to `writable` to only hear about writable format
//! strings, or to `off` to turn checking off. See [`config`].
//!
//! WARNING: like every interposition library, this one runs inside code
//! paths that the C library assumes it has to itself. It can't be made
//! fully safe. The exported hooks take whatever pointers C callers hand
//! them, under the same contract as the C functions they replace.

pub mod check;
pub mod config;
pub mod guard;
pub mod hooks;
pub mod maps;
pub mod report;
pub mod stdio;
