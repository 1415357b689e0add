//! Native C arrays
//!
//! Each array is a `{pointer, length}` pair. The length comes from a sibling
//! length argument, a fixed size, or a scan for the zero sentinel
//! ([`NativeArray::set_len_zt`]).

use std::ffi::c_void;
use std::marker::PhantomData;

use libc::c_char;

use crate::argument::bool_to_int;
use crate::mem::{self, StrPtr};

fn is_zero<T>(v: &T) -> bool {
    let bytes =
        unsafe { std::slice::from_raw_parts(v as *const T as *const u8, std::mem::size_of::<T>()) };
    bytes.iter().all(|&b| b == 0)
}

/// C array of plain values
#[derive(Debug)]
pub struct NativeArray<T: Copy> {
    pub p: *mut T,
    pub len: usize,
    _marker: PhantomData<T>,
}

impl<T: Copy> Clone for NativeArray<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Copy> Copy for NativeArray<T> {}

impl<T: Copy> Default for NativeArray<T> {
    fn default() -> Self {
        Self::new(std::ptr::null_mut(), 0)
    }
}

impl<T: Copy> NativeArray<T> {
    /// View an existing native array
    pub fn new(p: *mut c_void, len: usize) -> Self {
        Self {
            p: p as *mut T,
            len,
            _marker: PhantomData,
        }
    }

    /// Allocate a zeroed array of `len` elements
    pub fn make(len: usize) -> Self {
        let p = mem::malloc0(len * std::mem::size_of::<T>());
        Self::new(p, len)
    }

    /// Allocate a native copy of `values`
    pub fn from_slice(values: &[T]) -> Self {
        let arr = Self::make(values.len());
        if !arr.p.is_null() {
            unsafe { std::ptr::copy_nonoverlapping(values.as_ptr(), arr.p, values.len()) };
        }
        arr
    }

    /// Allocate a native copy of `values` followed by a zero element
    pub fn from_slice_zt(values: &[T]) -> Self {
        let mut arr = Self::make(values.len() + 1);
        if !arr.p.is_null() {
            unsafe { std::ptr::copy_nonoverlapping(values.as_ptr(), arr.p, values.len()) };
        }
        arr.len = values.len();
        arr
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.p as *mut c_void
    }

    pub fn is_null(&self) -> bool {
        self.p.is_null()
    }

    /// Set the length from a length argument; negative lengths mean empty
    pub fn set_len(&mut self, len: i64) {
        self.len = usize::try_from(len).unwrap_or(0);
    }

    /// Discover the length by scanning for the first all-zero element
    ///
    /// # Safety
    ///
    /// The array must be null or terminated by an all-zero element.
    pub unsafe fn set_len_zt(&mut self) {
        let mut n = 0;
        if !self.p.is_null() {
            while !is_zero(&*self.p.add(n)) {
                n += 1;
            }
        }
        self.len = n;
    }

    /// # Safety
    ///
    /// `p` must be valid for `len` elements for the lifetime of the view.
    pub unsafe fn as_slice(&self) -> &[T] {
        if self.p.is_null() || self.len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.p, self.len)
    }

    /// Copy the elements into host memory
    ///
    /// # Safety
    ///
    /// As for [`NativeArray::as_slice`].
    pub unsafe fn copy(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Release the array memory
    ///
    /// # Safety
    ///
    /// The array must be owned and allocated with the C allocator.
    pub unsafe fn free(self) {
        mem::free(self.p)
    }
}

/// C array of `gboolean`
pub type BoolArray = NativeArray<i32>;

impl NativeArray<i32> {
    /// Allocate a `gboolean` array from host bools
    pub fn from_bools(values: &[bool]) -> Self {
        let ints: Vec<i32> = values.iter().map(|&b| bool_to_int(b)).collect();
        Self::from_slice(&ints)
    }

    /// Decode as host bools
    ///
    /// # Safety
    ///
    /// As for [`NativeArray::as_slice`].
    pub unsafe fn copy_bools(&self) -> Vec<bool> {
        self.as_slice().iter().map(|&v| v != 0).collect()
    }
}

/// C array of opaque pointers
pub type PointerArray = NativeArray<*mut c_void>;

/// C array of `char*`
#[derive(Debug, Clone, Copy)]
pub struct CStrArray {
    pub p: *mut *mut c_char,
    pub len: usize,
}

impl Default for CStrArray {
    fn default() -> Self {
        Self::new(std::ptr::null_mut(), 0)
    }
}

impl CStrArray {
    pub fn new(p: *mut c_void, len: usize) -> Self {
        Self {
            p: p as *mut *mut c_char,
            len,
        }
    }

    /// Allocate native copies of `values`
    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Self {
        Self::alloc(values, false)
    }

    /// Allocate native copies of `values` followed by a null sentinel
    pub fn from_strings_zt<S: AsRef<str>>(values: &[S]) -> Self {
        Self::alloc(values, true)
    }

    fn alloc<S: AsRef<str>>(values: &[S], zero_terminated: bool) -> Self {
        let n = values.len() + usize::from(zero_terminated);
        let p = mem::malloc0(n * std::mem::size_of::<*mut c_char>()) as *mut *mut c_char;
        if !p.is_null() {
            for (i, s) in values.iter().enumerate() {
                unsafe { *p.add(i) = mem::c_string(s.as_ref()) };
            }
        }
        Self {
            p,
            len: values.len(),
        }
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.p as *mut c_void
    }

    pub fn set_len(&mut self, len: i64) {
        self.len = usize::try_from(len).unwrap_or(0);
    }

    /// Discover the length by scanning for the null sentinel
    ///
    /// # Safety
    ///
    /// The array must be null or null-terminated.
    pub unsafe fn set_len_zt(&mut self) {
        let mut n = 0;
        if !self.p.is_null() {
            while !(*self.p.add(n)).is_null() {
                n += 1;
            }
        }
        self.len = n;
    }

    /// # Safety
    ///
    /// `p` must be valid for `len` elements.
    pub unsafe fn as_slice(&self) -> &[StrPtr] {
        if self.p.is_null() || self.len == 0 {
            return &[];
        }
        // StrPtr is a transparent wrapper over a string pointer
        std::slice::from_raw_parts(self.p as *const StrPtr, self.len)
    }

    /// Copy every element without freeing anything
    ///
    /// # Safety
    ///
    /// Every element must be null or a NUL-terminated string.
    pub unsafe fn copy(&self) -> Vec<String> {
        self.as_slice().iter().map(|s| s.copy()).collect()
    }

    /// Release the array but not its elements
    ///
    /// # Safety
    ///
    /// The array must be owned and allocated with the C allocator.
    pub unsafe fn free(self) {
        mem::free(self.p)
    }

    /// Release every element and then the array
    ///
    /// # Safety
    ///
    /// Array and elements must be owned and allocated with the C allocator.
    pub unsafe fn free_all(self) {
        for s in self.as_slice() {
            mem::free(s.as_ptr() as *mut c_char);
        }
        mem::free(self.p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_terminated_strings() {
        let arr = CStrArray::from_strings_zt(&["a", "b", "c"]);
        let mut view = CStrArray::new(arr.as_ptr(), 0);
        unsafe {
            view.set_len_zt();
            assert_eq!(view.len, 3);
            assert_eq!(view.copy(), vec!["a", "b", "c"]);
            arr.free_all();
        }
    }

    #[test]
    fn test_explicit_length_ignores_trailing_elements() {
        let arr = CStrArray::from_strings(&["a", "b", "c", "not-a-sentinel"]);
        let mut view = CStrArray::new(arr.as_ptr(), 0);
        view.set_len(3);
        unsafe {
            assert_eq!(view.copy(), vec!["a", "b", "c"]);
            arr.free_all();
        }
    }

    #[test]
    fn test_null_array() {
        let mut view = CStrArray::default();
        unsafe {
            view.set_len_zt();
            assert_eq!(view.len, 0);
            assert!(view.copy().is_empty());
        }
    }

    #[test]
    fn test_primitive_array() {
        let arr = NativeArray::<i32>::from_slice(&[1, 2, 3]);
        assert_eq!(arr.len, 3);
        unsafe {
            assert_eq!(arr.as_slice(), &[1, 2, 3]);
            arr.free();
        }
    }

    #[test]
    fn test_primitive_array_zt() {
        let arr = NativeArray::<u16>::from_slice_zt(&[7, 8]);
        let mut view = NativeArray::<u16>::new(arr.as_ptr(), 0);
        unsafe {
            view.set_len_zt();
            assert_eq!(view.copy(), vec![7, 8]);
            arr.free();
        }
    }

    #[test]
    fn test_bool_array_uses_native_width() {
        let arr = BoolArray::from_bools(&[true, false, true]);
        unsafe {
            assert_eq!(arr.as_slice(), &[1, 0, 1]);
            assert_eq!(arr.copy_bools(), vec![true, false, true]);
            arr.free();
        }
    }

    #[test]
    fn test_negative_length_is_empty() {
        let mut arr = NativeArray::<f64>::default();
        arr.set_len(-1);
        assert_eq!(arr.len, 0);
    }

    #[test]
    fn test_pointer_array_zt() {
        let mut a = 1u8;
        let mut b = 2u8;
        let ptrs = [&mut a as *mut u8 as *mut c_void, &mut b as *mut u8 as *mut c_void];
        let arr = PointerArray::from_slice_zt(&ptrs);
        let mut view = PointerArray::new(arr.as_ptr(), 0);
        unsafe {
            view.set_len_zt();
            assert_eq!(view.len, 2);
            assert_eq!(view.as_slice()[1], ptrs[1]);
            arr.free();
        }
    }
}
