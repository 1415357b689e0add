//! Argument slots into host values

use gi_types::{InterfaceKind, Transfer, TypeDescriptor, TypeTag};

use super::{array_host, describe, numeric_type, ArrayHost, OutValue, TypeNames, C_VOID};
use crate::names::VarReg;

/// Where the length of a decoded array comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayLen {
    /// Expression of the correlated length value
    Expr(String),
    Fixed(usize),
    ZeroTerminated,
    Unknown,
}

impl ArrayLen {
    /// Length source of `ty`; a correlated length argument takes precedence
    pub fn of(ty: &TypeDescriptor, len_expr: Option<String>) -> Self {
        match (len_expr, ty.array_fixed_size) {
            (Some(expr), _) => ArrayLen::Expr(expr),
            (None, Some(n)) => ArrayLen::Fixed(n),
            (None, None) if ty.zero_terminated => ArrayLen::ZeroTerminated,
            (None, None) => ArrayLen::Unknown,
        }
    }
}

/// Annotations that affect how an output is decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutOptions {
    pub transfer: Transfer,
    pub nullable: bool,
    /// Wrap objects with their declared type instead of the runtime one
    pub static_object: bool,
}

/// Decode the slot expression `slot` holding a value of type `ty`
pub fn decode(
    names: &TypeNames<'_>,
    ty: &TypeDescriptor,
    slot: &str,
    len: ArrayLen,
    opts: OutOptions,
    reg: &mut VarReg,
) -> OutValue {
    match ty.tag {
        TypeTag::Void => {
            if ty.is_pointer {
                OutValue::new(C_VOID, format!("{}.as_ptr()", slot))
            } else {
                OutValue::todo("void value")
            }
        }
        TypeTag::Boolean => value(ty, "bool", format!("{}.as_bool()", slot)),
        TypeTag::Int8
        | TypeTag::UInt8
        | TypeTag::Int16
        | TypeTag::UInt16
        | TypeTag::Int32
        | TypeTag::UInt32
        | TypeTag::Int64
        | TypeTag::UInt64
        | TypeTag::Float
        | TypeTag::Double => match numeric_type(ty.tag) {
            Some(t) => value(ty, t, format!("{}.as_{}()", slot, t)),
            None => OutValue::todo(&describe(ty)),
        },
        TypeTag::GType => value(ty, "gi::GType", format!("{}.as_gtype()", slot)),
        TypeTag::Unichar => value(ty, "char", format!("{}.as_char()", slot)),
        TypeTag::Utf8 | TypeTag::Filename => string(slot, opts),
        TypeTag::Array => array(names, ty, slot, len, reg),
        TypeTag::Interface => interface(names, ty, slot, opts),
        TypeTag::GList => instance("gi::List", slot),
        TypeTag::GSList => instance("gi::SList", slot),
        TypeTag::GHash => instance("gi::HashTable", slot),
        TypeTag::Error => instance("gi::ErrorRef", slot),
    }
}

fn value(ty: &TypeDescriptor, host: &str, expr: String) -> OutValue {
    if ty.is_pointer {
        OutValue::todo(&describe(ty))
    } else {
        OutValue::new(host, expr)
    }
}

fn string(slot: &str, opts: OutOptions) -> OutValue {
    let owned = match opts.transfer {
        Transfer::Nothing => false,
        Transfer::Container | Transfer::Everything => true,
    };
    let (host, method) = match (opts.nullable, owned) {
        (false, false) => ("String", "copy"),
        (false, true) => ("String", "take"),
        (true, false) => ("Option<String>", "copy_opt"),
        (true, true) => ("Option<String>", "take_opt"),
    };
    OutValue::new(host, format!("unsafe {{ {}.as_str().{}() }}", slot, method))
}

fn instance(host: &str, slot: &str) -> OutValue {
    OutValue::new(host, format!("{} {{ p: {}.as_ptr() }}", host, slot))
}

fn interface(names: &TypeNames<'_>, ty: &TypeDescriptor, slot: &str, opts: OutOptions) -> OutValue {
    let Some(iref) = ty.interface.as_ref() else {
        return OutValue::todo("interface without reference");
    };
    let host = names.interface(iref);
    match names.kind(iref) {
        InterfaceKind::Struct | InterfaceKind::Union | InterfaceKind::Interface => {
            if ty.is_pointer {
                instance(&host, slot)
            } else {
                OutValue::todo(&format!("{} by value", iref.name))
            }
        }
        InterfaceKind::Object if !ty.is_pointer => OutValue::todo(&format!("{} by value", iref.name)),
        InterfaceKind::Object if opts.static_object => instance(&host, slot),
        InterfaceKind::Object => OutValue {
            host_type: "Option<gi::DynObject>".to_string(),
            expr: format!(
                "unsafe {{ ctx.wrappers.wrap({}.as_ptr(), {}::wrap_object) }}",
                slot, host
            ),
            needs_ctx: true,
        },
        InterfaceKind::Enum => value(ty, &host, format!("{}::from_bits({}.as_i32())", host, slot)),
        InterfaceKind::Flags => value(ty, &host, format!("{}::from_bits({}.as_u32())", host, slot)),
        InterfaceKind::Callback | InterfaceKind::Unresolved => OutValue::todo(&describe(ty)),
    }
}

fn array(names: &TypeNames<'_>, ty: &TypeDescriptor, slot: &str, len: ArrayLen, reg: &mut VarReg) -> OutValue {
    let (host, path) = match array_host(names, ty) {
        ArrayHost::View { ty, path } => (ty, path),
        ArrayHost::Opaque => return OutValue::new(C_VOID, format!("{}.as_ptr()", slot)),
        ArrayHost::Todo(what) => return OutValue::todo(&what),
    };
    let expr = match len {
        ArrayLen::Expr(n) => {
            let arr = reg.alloc("arr");
            format!(
                "{{ let mut {arr} = {path}::new({slot}.as_ptr(), 0); {arr}.set_len({n} as i64); {arr} }}"
            )
        }
        ArrayLen::Fixed(n) => format!("{}::new({}.as_ptr(), {})", path, slot, n),
        ArrayLen::ZeroTerminated => {
            let arr = reg.alloc("arr");
            format!(
                "{{ let mut {arr} = {path}::new({slot}.as_ptr(), 0); unsafe {{ {arr}.set_len_zt() }}; {arr} }}"
            )
        }
        ArrayLen::Unknown => format!("{}::new({}.as_ptr(), 0)", path, slot),
    };
    OutValue::new(host, expr)
}
