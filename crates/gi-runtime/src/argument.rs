//! Generic argument slot
//!
//! An [`Argument`] is the 8-byte cell passed across the FFI boundary. It is
//! layout compatible with `GIArgument`: every value is stored at offset 0 with
//! the width the native ABI expects, and must be read back with that same
//! width.

use std::ffi::c_void;

use crate::closure::Handle;
use crate::mem::StrPtr;
use crate::wrapper::GType;

/// Native `gboolean` true
pub const TRUE: i32 = 1;
/// Native `gboolean` false
pub const FALSE: i32 = 0;

/// Fixed-width argument cell
#[repr(C, align(8))]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Argument([u8; 8]);

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Argument({:#018x})", u64::from_ne_bytes(self.0))
    }
}

macro_rules! slot_accessors {
    ($($from:ident / $as:ident : $ty:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $from(v: $ty) -> Self {
                let mut arg = Self::ZERO;
                let bytes = v.to_ne_bytes();
                arg.0[..bytes.len()].copy_from_slice(&bytes);
                arg
            }

            #[inline]
            pub fn $as(&self) -> $ty {
                const N: usize = std::mem::size_of::<$ty>();
                let mut bytes = [0u8; N];
                bytes.copy_from_slice(&self.0[..N]);
                <$ty>::from_ne_bytes(bytes)
            }
        )*
    };
}

impl Argument {
    /// All-zero slot, also the null pointer
    pub const ZERO: Argument = Argument([0; 8]);

    slot_accessors! {
        from_i8 / as_i8: i8,
        from_u8 / as_u8: u8,
        from_i16 / as_i16: i16,
        from_u16 / as_u16: u16,
        from_i32 / as_i32: i32,
        from_u32 / as_u32: u32,
        from_i64 / as_i64: i64,
        from_u64 / as_u64: u64,
        from_f32 / as_f32: f32,
        from_f64 / as_f64: f64,
        from_usize / as_usize: usize,
    }

    /// Store a host bool as a 0/1 `gboolean`
    #[inline]
    pub fn from_bool(v: bool) -> Self {
        Self::from_i32(bool_to_int(v))
    }

    /// Read a `gboolean`; any non-zero value is true
    #[inline]
    pub fn as_bool(&self) -> bool {
        self.as_i32() != FALSE
    }

    /// Store a code point as `gunichar`
    #[inline]
    pub fn from_char(v: char) -> Self {
        Self::from_u32(u32::from(v))
    }

    /// Read a `gunichar`; invalid code points decode as U+FFFD
    #[inline]
    pub fn as_char(&self) -> char {
        char::from_u32(self.as_u32()).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    #[inline]
    pub fn from_gtype(v: GType) -> Self {
        Self::from_usize(v.0)
    }

    #[inline]
    pub fn as_gtype(&self) -> GType {
        GType(self.as_usize())
    }

    #[inline]
    pub fn from_ptr<T>(p: *mut T) -> Self {
        Self::from_usize(p as usize)
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut c_void {
        self.as_usize() as *mut c_void
    }

    /// Read the slot as a native string pointer
    #[inline]
    pub fn as_str(&self) -> StrPtr {
        StrPtr::new(self.as_ptr() as *const libc::c_char)
    }

    /// Store a closure handle as `gpointer` user data
    #[inline]
    pub fn from_handle(h: Handle) -> Self {
        Self::from_usize(h)
    }

    /// Address of this slot, passed for out and inout arguments
    #[inline]
    pub fn addr(&mut self) -> *mut c_void {
        self as *mut Argument as *mut c_void
    }
}

/// Convert a host bool to a native `gboolean`
#[inline]
pub fn bool_to_int(v: bool) -> i32 {
    if v {
        TRUE
    } else {
        FALSE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_size() {
        assert_eq!(std::mem::size_of::<Argument>(), 8);
        assert_eq!(std::mem::align_of::<Argument>(), 8);
    }

    #[test]
    fn test_scalar_round_trip() {
        assert_eq!(Argument::from_i8(-5).as_i8(), -5);
        assert_eq!(Argument::from_u8(250).as_u8(), 250);
        assert_eq!(Argument::from_i16(-30000).as_i16(), -30000);
        assert_eq!(Argument::from_u16(65000).as_u16(), 65000);
        assert_eq!(Argument::from_i32(i32::MIN).as_i32(), i32::MIN);
        assert_eq!(Argument::from_u32(u32::MAX).as_u32(), u32::MAX);
        assert_eq!(Argument::from_i64(-1).as_i64(), -1);
        assert_eq!(Argument::from_u64(u64::MAX).as_u64(), u64::MAX);
        assert_eq!(Argument::from_f32(1.5).as_f32(), 1.5);
        assert_eq!(Argument::from_f64(-2.25).as_f64(), -2.25);
    }

    #[test]
    fn test_bool_is_native_int() {
        let t = Argument::from_bool(true);
        assert_eq!(t.as_i32(), 1);
        assert!(t.as_bool());
        let f = Argument::from_bool(false);
        assert_eq!(f.as_i32(), 0);
        assert!(!f.as_bool());
        assert!(Argument::from_i32(7).as_bool());
    }

    #[test]
    fn test_narrow_write_leaves_upper_bytes_zero() {
        let arg = Argument::from_i8(-1);
        assert_eq!(arg.0[0], 0xff);
        assert!(arg.0[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_narrow_read_of_wide_slot() {
        let wide = Argument::from_i64(-1);
        assert_eq!(wide.as_i16(), -1);
        assert_eq!(wide.as_u8(), 0xff);
        assert_eq!(Argument::from_f64(2.5).as_f64(), 2.5);
    }

    #[test]
    fn test_char_round_trip() {
        assert_eq!(Argument::from_char('é').as_char(), 'é');
        assert_eq!(Argument::from_char('🦀').as_u32(), 0x1F980);
        assert_eq!(Argument::from_u32(0xD800).as_char(), char::REPLACEMENT_CHARACTER);
    }

    #[test]
    fn test_pointer_identity() {
        let mut value = 42i32;
        let p = &mut value as *mut i32;
        let arg = Argument::from_ptr(p);
        assert_eq!(arg.as_ptr() as *mut i32, p);
        assert!(Argument::ZERO.as_ptr().is_null());
    }

    #[test]
    fn test_gtype_round_trip() {
        let t = GType(0x5555_aaaa);
        assert_eq!(Argument::from_gtype(t).as_gtype(), t);
    }

    #[test]
    fn test_slot_address() {
        let mut slots = [Argument::ZERO; 2];
        let base = slots.as_mut_ptr() as usize;
        assert_eq!(slots[1].addr() as usize, base + 8);
    }
}
