//! Invoker / FFI call engine
//!
//! An [`Invoker`] pairs a resolved native function pointer with a prepared
//! libffi call interface. Calls take a vector of [`Argument`] slots whose
//! layout is fixed at generation time; there is no runtime arity check beyond
//! a debug assertion.

use std::ffi::c_void;
use std::sync::Arc;

use gi_types::{Direction, FunctionDescriptor, InterfaceKind, TypeDescriptor, TypeTag};
use libffi::middle::{Cif, CodePtr, Type};
use libffi::raw;

use crate::argument::Argument;
use crate::error::GiError;

struct Prepared {
    cif: Cif,
    code: CodePtr,
    symbol: String,
    n_args: usize,
    /// Native argument positions fed from the out-argument block, in block order
    out_positions: Vec<usize>,
}

// The call interface and code pointer are immutable after preparation
unsafe impl Send for Prepared {}
unsafe impl Sync for Prepared {}

/// A prepared, resolved native function
#[derive(Clone)]
pub struct Invoker {
    inner: Arc<Prepared>,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("symbol", &self.inner.symbol)
            .field("n_args", &self.inner.n_args)
            .finish()
    }
}

impl Invoker {
    /// Prepare a call to `fn_ptr` with the signature of `func`.
    ///
    /// Native arguments are laid out as: instance pointer for methods, the
    /// declared arguments (out and inout ones as pointers), and a trailing
    /// `GError**` for throwing functions. Only arguments backed by an out
    /// slot are patched by [`Invoker::call`].
    pub fn prepare(func: &FunctionDescriptor, fn_ptr: *mut c_void) -> Result<Self, GiError> {
        let prepare_err = |reason: String| GiError::Prepare {
            symbol: func.symbol.clone(),
            reason,
        };

        let mut params = Vec::with_capacity(func.n_native_args());
        let mut out_positions = Vec::new();
        if func.flags.is_method {
            params.push(Type::pointer());
        }
        for arg in &func.args {
            if arg.uses_out_slot() {
                out_positions.push(params.len());
                params.push(Type::pointer());
                continue;
            }
            match arg.direction {
                Direction::In => params.push(ffi_type(&arg.ty).map_err(prepare_err)?),
                // Caller allocated memory, passed as given
                Direction::Out | Direction::InOut => params.push(Type::pointer()),
            }
        }
        if func.flags.throws {
            out_positions.push(params.len());
            params.push(Type::pointer());
        }
        let ret = ffi_type(&func.return_type).map_err(prepare_err)?;

        Self::with_signature(&func.symbol, fn_ptr, params, ret, out_positions)
    }

    /// Prepare a call from an explicit libffi signature
    pub fn with_signature(
        symbol: &str,
        fn_ptr: *mut c_void,
        params: Vec<Type>,
        ret: Type,
        out_positions: Vec<usize>,
    ) -> Result<Self, GiError> {
        if fn_ptr.is_null() {
            return Err(GiError::Prepare {
                symbol: symbol.to_string(),
                reason: "null function pointer".to_string(),
            });
        }
        if let Some(&bad) = out_positions.iter().find(|&&i| i >= params.len()) {
            return Err(GiError::Prepare {
                symbol: symbol.to_string(),
                reason: format!("out position {} outside {} arguments", bad, params.len()),
            });
        }
        let n_args = params.len();
        let cif = Cif::new(params, ret);
        log::debug!("prepared invoker for {} with {} arguments", symbol, n_args);
        Ok(Self {
            inner: Arc::new(Prepared {
                cif,
                code: CodePtr(fn_ptr),
                symbol: symbol.to_string(),
                n_args,
                out_positions,
            }),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.inner.symbol
    }

    /// Number of native arguments the call expects
    pub fn n_args(&self) -> usize {
        self.inner.n_args
    }

    /// Number of slots the out-argument block must hold
    pub fn n_out_args(&self) -> usize {
        self.inner.out_positions.len()
    }

    /// Perform the native call.
    ///
    /// When `out_args` is non-null, the argument at each out position is set
    /// to the address of the next slot of the block, so the block must hold
    /// [`Invoker::n_out_args`] slots. Inout slots must be filled before the
    /// call. The result is written to `ret` when present.
    ///
    /// # Safety
    ///
    /// `args` must match the prepared signature exactly and every pointer in
    /// it must be valid for the callee. A mismatch is undefined behavior.
    pub unsafe fn call(&self, args: &mut [Argument], ret: Option<&mut Argument>, out_args: *mut Argument) {
        debug_assert_eq!(
            args.len(),
            self.inner.n_args,
            "argument count mismatch calling {}",
            self.inner.symbol
        );

        if !out_args.is_null() {
            for (slot, &pos) in self.inner.out_positions.iter().enumerate() {
                args[pos] = Argument::from_ptr(out_args.add(slot));
            }
        }

        let mut avalue: Vec<*mut c_void> = args
            .iter_mut()
            .map(|a| a as *mut Argument as *mut c_void)
            .collect();

        let mut discard = Argument::ZERO;
        let rvalue = match ret {
            Some(r) => r as *mut Argument as *mut c_void,
            None => &mut discard as *mut Argument as *mut c_void,
        };

        raw::ffi_call(
            self.inner.cif.as_raw_ptr(),
            Some(*self.inner.code.as_safe_fun()),
            rvalue,
            avalue.as_mut_ptr(),
        );
    }
}

/// libffi type of a native value
fn ffi_type(ty: &TypeDescriptor) -> Result<Type, String> {
    if ty.is_pointer {
        return Ok(Type::pointer());
    }
    let t = match ty.tag {
        TypeTag::Void => Type::void(),
        TypeTag::Boolean => Type::i32(),
        TypeTag::Int8 => Type::i8(),
        TypeTag::UInt8 => Type::u8(),
        TypeTag::Int16 => Type::i16(),
        TypeTag::UInt16 => Type::u16(),
        TypeTag::Int32 => Type::i32(),
        TypeTag::UInt32 => Type::u32(),
        TypeTag::Int64 => Type::i64(),
        TypeTag::UInt64 => Type::u64(),
        TypeTag::Float => Type::f32(),
        TypeTag::Double => Type::f64(),
        TypeTag::GType => Type::usize(),
        TypeTag::Unichar => Type::u32(),
        TypeTag::Utf8
        | TypeTag::Filename
        | TypeTag::Array
        | TypeTag::GList
        | TypeTag::GSList
        | TypeTag::GHash
        | TypeTag::Error => Type::pointer(),
        TypeTag::Interface => match ty.interface_kind() {
            Some(InterfaceKind::Enum) => Type::i32(),
            Some(InterfaceKind::Flags) => Type::u32(),
            Some(InterfaceKind::Callback) => Type::pointer(),
            Some(kind) => {
                return Err(format!(
                    "{:?} {} passed by value",
                    kind,
                    ty.interface_name().unwrap_or("?")
                ))
            }
            None => return Err("interface type without a reference".to_string()),
        },
    };
    Ok(t)
}
