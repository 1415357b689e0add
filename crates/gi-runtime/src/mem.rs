//! Native memory helpers
//!
//! Strings and arrays handed to native code are allocated with the C
//! allocator so that the native side may release them with `g_free`.

use std::ffi::{c_void, CStr};

use libc::c_char;

/// Allocator used for memory that crosses the native boundary
pub trait NativeAllocator: Send + Sync {
    /// Allocate `size` uninitialized bytes
    ///
    /// # Safety
    ///
    /// The returned memory must be released with [`NativeAllocator::free`]
    /// of the same allocator.
    unsafe fn malloc(&self, size: usize) -> *mut c_void;

    /// Release memory from [`NativeAllocator::malloc`]; null is ignored
    ///
    /// # Safety
    ///
    /// `p` must be null or come from this allocator and not be freed yet.
    unsafe fn free(&self, p: *mut c_void);
}

/// The C runtime allocator (`malloc`/`free`), compatible with `g_free`
#[derive(Debug, Clone, Copy, Default)]
pub struct LibcAllocator;

impl NativeAllocator for LibcAllocator {
    unsafe fn malloc(&self, size: usize) -> *mut c_void {
        // malloc(0) may return null; callers treat null as "no buffer"
        libc::malloc(size.max(1))
    }

    unsafe fn free(&self, p: *mut c_void) {
        if !p.is_null() {
            libc::free(p);
        }
    }
}

/// Allocate `size` bytes with the C allocator
pub fn malloc(size: usize) -> *mut c_void {
    unsafe { LibcAllocator.malloc(size) }
}

/// Allocate `size` zeroed bytes with the C allocator
pub fn malloc0(size: usize) -> *mut c_void {
    unsafe { libc::calloc(1, size.max(1)) }
}

/// Free memory from the C allocator; null is ignored
///
/// # Safety
///
/// `p` must be null or a live allocation of the C allocator.
pub unsafe fn free<T>(p: *mut T) {
    LibcAllocator.free(p as *mut c_void)
}

/// Copy `s` into a newly allocated NUL-terminated native buffer.
///
/// Bytes after an interior NUL are invisible to native code.
pub fn c_string(s: &str) -> *mut c_char {
    c_string_in(&LibcAllocator, s)
}

/// [`c_string`] mapping `None` to null
pub fn c_string_opt(s: Option<&str>) -> *mut c_char {
    match s {
        Some(s) => c_string(s),
        None => std::ptr::null_mut(),
    }
}

/// [`c_string`] with an explicit allocator
pub fn c_string_in(alloc: &dyn NativeAllocator, s: &str) -> *mut c_char {
    let bytes = s.as_bytes();
    unsafe {
        let p = alloc.malloc(bytes.len() + 1) as *mut u8;
        if p.is_null() {
            return std::ptr::null_mut();
        }
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), p, bytes.len());
        *p.add(bytes.len()) = 0;
        p as *mut c_char
    }
}

/// A borrowed or owned native string pointer.
///
/// Decoding picks the ownership rule: [`StrPtr::copy`] leaves the native
/// buffer alone, [`StrPtr::take`] releases it after copying.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrPtr(*const c_char);

impl StrPtr {
    pub fn new(p: *const c_char) -> Self {
        StrPtr(p)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.0
    }

    /// Copy the string without freeing it; null decodes as empty
    ///
    /// # Safety
    ///
    /// The pointer must be null or point to a NUL-terminated string.
    pub unsafe fn copy(self) -> String {
        if self.0.is_null() {
            return String::new();
        }
        CStr::from_ptr(self.0).to_string_lossy().into_owned()
    }

    /// Copy the string and free the native buffer
    ///
    /// # Safety
    ///
    /// The pointer must be null or an owned NUL-terminated string from the C
    /// allocator that nothing else frees.
    pub unsafe fn take(self) -> String {
        self.take_in(&LibcAllocator)
    }

    /// [`StrPtr::take`] with an explicit allocator
    ///
    /// # Safety
    ///
    /// As for [`StrPtr::take`], with `alloc` owning the buffer.
    pub unsafe fn take_in(self, alloc: &dyn NativeAllocator) -> String {
        let s = self.copy();
        alloc.free(self.0 as *mut c_void);
        s
    }

    /// Nullable decoding: `None` for null, otherwise [`StrPtr::copy`]
    ///
    /// # Safety
    ///
    /// As for [`StrPtr::copy`].
    pub unsafe fn copy_opt(self) -> Option<String> {
        if self.0.is_null() {
            None
        } else {
            Some(self.copy())
        }
    }

    /// Nullable decoding: `None` for null, otherwise [`StrPtr::take`]
    ///
    /// # Safety
    ///
    /// As for [`StrPtr::take`].
    pub unsafe fn take_opt(self) -> Option<String> {
        if self.0.is_null() {
            None
        } else {
            Some(self.take())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingAllocator {
        allocs: AtomicUsize,
        frees: AtomicUsize,
    }

    impl NativeAllocator for CountingAllocator {
        unsafe fn malloc(&self, size: usize) -> *mut c_void {
            self.allocs.fetch_add(1, Ordering::SeqCst);
            LibcAllocator.malloc(size)
        }

        unsafe fn free(&self, p: *mut c_void) {
            if !p.is_null() {
                self.frees.fetch_add(1, Ordering::SeqCst);
            }
            LibcAllocator.free(p)
        }
    }

    #[test]
    fn test_take_frees_exactly_once() {
        let alloc = CountingAllocator::default();
        let p = c_string_in(&alloc, "owned by caller");
        let s = unsafe { StrPtr::new(p).take_in(&alloc) };
        assert_eq!(s, "owned by caller");
        assert_eq!(alloc.allocs.load(Ordering::SeqCst), 1);
        assert_eq!(alloc.frees.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_copy_never_frees() {
        let alloc = CountingAllocator::default();
        let p = c_string_in(&alloc, "owned by callee");
        let s = unsafe { StrPtr::new(p).copy() };
        assert_eq!(s, "owned by callee");
        assert_eq!(alloc.frees.load(Ordering::SeqCst), 0);

        unsafe { alloc.free(p as *mut c_void) };
        assert_eq!(alloc.frees.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_null_string() {
        let alloc = CountingAllocator::default();
        let null = StrPtr::new(std::ptr::null());
        assert_eq!(unsafe { null.copy() }, "");
        assert_eq!(unsafe { null.take_in(&alloc) }, "");
        assert_eq!(unsafe { null.copy_opt() }, None);
        assert_eq!(alloc.frees.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_c_string_round_trip() {
        let p = c_string("héllo");
        assert_eq!(unsafe { StrPtr::new(p).take() }, "héllo");
        assert!(c_string_opt(None).is_null());
    }

    #[test]
    fn test_malloc0_is_zeroed() {
        let p = malloc0(16) as *mut u8;
        let bytes = unsafe { std::slice::from_raw_parts(p, 16) };
        assert!(bytes.iter().all(|&b| b == 0));
        unsafe { free(p) };
    }
}
