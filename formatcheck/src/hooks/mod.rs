//! The interposed `<stdio.h>` entry points.
//!
//! Each family has core hooks, which check the format string and then
//! delegate to the next definition of the same symbol, and adapters, which
//! only repackage their arguments for a core hook. Nothing in here changes
//! what the caller gets back.
//!
//! In test builds nothing is exported: the hooks are plain Rust functions
//! that still delegate to the C library.

pub mod input;
pub mod output;
