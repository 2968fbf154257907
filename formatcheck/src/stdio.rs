//! Bits of `<stdio.h>` that the `libc` crate doesn't carry: the standard
//! stream globals and `fopencookie`, plus the size-bounded buffer stream
//! that `vsnprintf` is routed through.

use std::ffi::{c_char, c_int, c_void};
use std::marker::PhantomData;
use std::ptr;

use libc::{off64_t, size_t, ssize_t, FILE};

mod sys {
    use super::*;

    pub type CookieRead = unsafe extern "C" fn(*mut c_void, *mut c_char, size_t) -> ssize_t;
    pub type CookieWrite = unsafe extern "C" fn(*mut c_void, *const c_char, size_t) -> ssize_t;
    pub type CookieSeek = unsafe extern "C" fn(*mut c_void, *mut off64_t, c_int) -> c_int;
    pub type CookieClose = unsafe extern "C" fn(*mut c_void) -> c_int;

    /// `cookie_io_functions_t`
    #[repr(C)]
    pub struct CookieIoFunctions {
        pub read: Option<CookieRead>,
        pub write: Option<CookieWrite>,
        pub seek: Option<CookieSeek>,
        pub close: Option<CookieClose>,
    }

    extern "C" {
        pub static mut stdin: *mut FILE;
        pub static mut stdout: *mut FILE;
        pub static mut stderr: *mut FILE;

        pub fn fopencookie(
            cookie: *mut c_void,
            mode: *const c_char,
            io_funcs: CookieIoFunctions,
        ) -> *mut FILE;
    }
}

pub fn stdin() -> *mut FILE {
    unsafe { sys::stdin }
}

pub fn stdout() -> *mut FILE {
    unsafe { sys::stdout }
}

pub fn stderr() -> *mut FILE {
    unsafe { sys::stderr }
}

/// A caller-supplied `char` buffer of `size` bytes, written with `snprintf`
/// semantics: at most `size - 1` bytes of output are kept, the rest is
/// dropped without error, and the result is always NUL-terminated unless
/// `size` is zero.
pub struct BoundedBuffer {
    dst: *mut c_char,
    size: usize,
    len: usize,
}

impl BoundedBuffer {
    pub fn new(dst: *mut c_char, size: usize) -> Self {
        Self { dst, size, len: 0 }
    }

    fn capacity(&self) -> usize {
        self.size.saturating_sub(1)
    }

    fn push(&mut self, bytes: &[u8]) {
        let take = bytes.len().min(self.capacity() - self.len);
        if take > 0 {
            unsafe {
                ptr::copy_nonoverlapping(bytes.as_ptr(), self.dst.add(self.len).cast::<u8>(), take)
            };
            self.len += take;
        }
    }

    fn terminate(&mut self) {
        if self.size > 0 {
            unsafe { *self.dst.add(self.len) = 0 };
        }
    }

    /// Binds a write-only stream to this buffer.
    ///
    /// Output reaches the buffer when the returned stream is dropped, which
    /// also terminates it. Returns `None` if the stream couldn't be created.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for `size` bytes of writes, or `size` must be 0.
    pub unsafe fn open(&mut self) -> Option<BoundedStream<'_>> {
        let funcs = sys::CookieIoFunctions {
            read: None,
            write: Some(bounded_write),
            seek: None,
            close: None,
        };

        let buffer: *mut Self = self;
        let stream = unsafe { sys::fopencookie(buffer.cast::<c_void>(), c"w".as_ptr(), funcs) };
        if stream.is_null() {
            return None;
        }

        Some(BoundedStream {
            stream,
            buffer,
            _buffer: PhantomData,
        })
    }
}

/// An open stream over a [`BoundedBuffer`]. Closed and flushed on drop.
pub struct BoundedStream<'a> {
    stream: *mut FILE,
    buffer: *mut BoundedBuffer,
    _buffer: PhantomData<&'a mut BoundedBuffer>,
}

impl BoundedStream<'_> {
    pub fn as_ptr(&self) -> *mut FILE {
        self.stream
    }
}

impl Drop for BoundedStream<'_> {
    fn drop(&mut self) {
        // Can't fail: the write callback never reports an error.
        unsafe {
            libc::fclose(self.stream);
            (*self.buffer).terminate();
        }
    }
}

unsafe extern "C" fn bounded_write(cookie: *mut c_void, buf: *const c_char, size: size_t) -> ssize_t {
    let sink = unsafe { &mut *cookie.cast::<BoundedBuffer>() };
    if size > 0 {
        sink.push(unsafe { std::slice::from_raw_parts(buf.cast::<u8>(), size) });
    }
    // Claim everything, kept or not: truncation isn't a stream error.
    size as ssize_t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_all(stream: *mut FILE, bytes: &[u8]) -> usize {
        unsafe { libc::fwrite(bytes.as_ptr().cast::<c_void>(), 1, bytes.len(), stream) }
    }

    #[test]
    fn standard_streams_are_bound() {
        assert!(!stdin().is_null());
        assert!(!stdout().is_null());
        assert!(!stderr().is_null());
    }

    #[test]
    fn keeps_everything_that_fits() {
        let mut buf = [0x55 as c_char; 16];
        let mut bounded = BoundedBuffer::new(buf.as_mut_ptr(), buf.len());

        let stream = unsafe { bounded.open() }.unwrap();
        assert_eq!(write_all(stream.as_ptr(), b"hello"), 5);
        drop(stream);

        let bytes: Vec<u8> = buf[..6].iter().map(|&c| c as u8).collect();
        assert_eq!(bytes, b"hello\0");
        assert_eq!(buf[6], 0x55);
    }

    #[test]
    fn truncates_and_terminates() {
        let mut buf = [0x55 as c_char; 4];
        let mut bounded = BoundedBuffer::new(buf.as_mut_ptr(), buf.len());

        let stream = unsafe { bounded.open() }.unwrap();
        // Every byte is accepted by the stream, even the dropped ones.
        assert_eq!(write_all(stream.as_ptr(), b"12"), 2);
        assert_eq!(write_all(stream.as_ptr(), b"345"), 3);
        assert_eq!(unsafe { libc::fflush(stream.as_ptr()) }, 0);
        drop(stream);

        let bytes: Vec<u8> = buf.iter().map(|&c| c as u8).collect();
        assert_eq!(bytes, b"123\0");
    }

    #[test]
    fn zero_size_touches_nothing() {
        let mut bounded = BoundedBuffer::new(ptr::null_mut(), 0);
        let stream = unsafe { bounded.open() }.unwrap();
        assert_eq!(write_all(stream.as_ptr(), b"discarded"), 9);
        assert_eq!(unsafe { libc::fflush(stream.as_ptr()) }, 0);
    }

    #[test]
    fn size_one_is_just_a_terminator() {
        let mut buf = [0x55 as c_char; 2];
        let mut bounded = BoundedBuffer::new(buf.as_mut_ptr(), 1);
        let stream = unsafe { bounded.open() }.unwrap();
        write_all(stream.as_ptr(), b"abc");
        drop(stream);
        assert_eq!(buf, [0, 0x55]);
    }
}
