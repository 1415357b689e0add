//! Runtime errors and `GError` conversion

use std::ffi::c_void;

use libc::c_char;
use thiserror::Error;

use crate::loader::LoadError;
use crate::mem::{self, StrPtr};
use crate::repository::InfoType;

/// Errors surfaced by the runtime to generated code
#[derive(Debug, Error)]
pub enum GiError {
    /// Top-level symbol missing from the namespace
    #[error("not found {name:?} in namespace {namespace}")]
    NotFound {
        /// Symbol name
        name: String,
        /// Namespace searched
        namespace: String,
    },

    /// Method missing from its container
    #[error("not found {method:?} in {kind} {container} in namespace {namespace}")]
    MethodNotFound {
        /// Method name
        method: String,
        /// Container type name
        container: String,
        /// Kind of the container
        kind: InfoType,
        /// Namespace searched
        namespace: String,
    },

    /// The descriptor kind has no invoker
    #[error("unsupported info type {0}")]
    UnsupportedInfo(InfoType),

    /// Native symbol could not be resolved
    #[error(transparent)]
    Symbol(#[from] LoadError),

    /// The call signature could not be prepared
    #[error("failed to prepare invoker for {symbol}: {reason}")]
    Prepare {
        /// Native symbol
        symbol: String,
        /// What went wrong
        reason: String,
    },

    /// Error reported by native code through `GError`
    #[error("{message}")]
    Native {
        /// `GQuark` of the error domain
        domain: u32,
        /// Domain specific code
        code: i32,
        /// Human readable message
        message: String,
    },

    /// Bindings used before their namespace was initialized
    #[error("namespace {0} is not initialized")]
    Uninitialized(String),
}

impl GiError {
    pub fn native(domain: u32, code: i32, message: impl Into<String>) -> Self {
        GiError::Native {
            domain,
            code,
            message: message.into(),
        }
    }
}

/// Result type of runtime operations
pub type GiResult<T> = Result<T, GiError>;

/// Native `GError` layout
#[repr(C)]
#[derive(Debug)]
pub struct GError {
    pub domain: u32,
    pub code: i32,
    pub message: *mut c_char,
}

/// Convert an out `GError*` into a host error and free it; null means success.
///
/// # Safety
///
/// `p` must be null or an owned `GError` whose struct and message were
/// allocated with the C allocator.
pub unsafe fn to_error(p: *mut c_void) -> Option<GiError> {
    if p.is_null() {
        return None;
    }
    let err = p as *mut GError;
    let message = StrPtr::new((*err).message).take();
    let out = GiError::native((*err).domain, (*err).code, message);
    mem::free(err);
    Some(out)
}

/// Pointer-only handle for `GError*` values passed as ordinary arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRef {
    pub p: *mut c_void,
}

impl Default for ErrorRef {
    fn default() -> Self {
        Self {
            p: std::ptr::null_mut(),
        }
    }
}

impl ErrorRef {
    /// Read the error fields without taking ownership
    ///
    /// # Safety
    ///
    /// `p` must be null or point to a live `GError`.
    pub unsafe fn describe(&self) -> Option<GiError> {
        if self.p.is_null() {
            return None;
        }
        let err = self.p as *const GError;
        Some(GiError::native(
            (*err).domain,
            (*err).code,
            StrPtr::new((*err).message).copy(),
        ))
    }
}
