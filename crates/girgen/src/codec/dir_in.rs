//! Host values into argument slots

use gi_types::{InterfaceKind, Transfer, TypeDescriptor, TypeTag};

use super::{array_host, describe, numeric_type, ArrayHost, InArg, TypeNames, C_VOID};
use crate::names::VarReg;

/// Annotations that affect how an input is passed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InOptions {
    pub nullable: bool,
    pub transfer: Transfer,
}

/// Marshal host variable `var` of type `ty` into a slot
pub fn encode(
    names: &TypeNames<'_>,
    ty: &TypeDescriptor,
    var: &str,
    opts: InOptions,
    reg: &mut VarReg,
) -> InArg {
    match ty.tag {
        TypeTag::Void => {
            if ty.is_pointer {
                InArg::simple(C_VOID, format!("gi::Argument::from_ptr({})", var))
            } else {
                InArg::todo("void value")
            }
        }
        TypeTag::Boolean => value(ty, "bool", format!("gi::Argument::from_bool({})", var)),
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
            Some(t) => value(ty, t, format!("gi::Argument::from_{}({})", t, var)),
            None => InArg::todo(&describe(ty)),
        },
        TypeTag::GType => value(ty, "gi::GType", format!("gi::Argument::from_gtype({})", var)),
        TypeTag::Unichar => value(ty, "char", format!("gi::Argument::from_char({})", var)),
        TypeTag::Utf8 | TypeTag::Filename => string(var, opts, reg),
        TypeTag::Array => match array_host(names, ty) {
            ArrayHost::View { ty, .. } => InArg::simple(ty, format!("gi::Argument::from_ptr({}.p)", var)),
            ArrayHost::Opaque => InArg::simple(C_VOID, format!("gi::Argument::from_ptr({})", var)),
            ArrayHost::Todo(what) => InArg::todo(&what),
        },
        TypeTag::Interface => interface(names, ty, var, opts),
        TypeTag::GList => instance("gi::List", var, false),
        TypeTag::GSList => instance("gi::SList", var, false),
        TypeTag::GHash => instance("gi::HashTable", var, false),
        TypeTag::Error => instance("gi::ErrorRef", var, false),
    }
}

/// A by-value scalar; pointers to scalars have no mapping
fn value(ty: &TypeDescriptor, host: &str, slot: String) -> InArg {
    if ty.is_pointer {
        InArg::todo(&describe(ty))
    } else {
        InArg::simple(host, slot)
    }
}

fn string(var: &str, opts: InOptions, reg: &mut VarReg) -> InArg {
    let c_var = reg.alloc(&format!("c_{}", var));
    let (host_type, convert) = if opts.nullable {
        ("Option<&str>", "gi::c_string_opt")
    } else {
        ("&str", "gi::c_string")
    };
    // A transferred string is released by the callee
    let after = match opts.transfer {
        Transfer::Nothing => vec![format!("unsafe {{ gi::free({}) }};", c_var)],
        Transfer::Container | Transfer::Everything => Vec::new(),
    };
    InArg {
        host_type: host_type.to_string(),
        before: vec![format!("let {} = {}({});", c_var, convert, var)],
        slot: format!("gi::Argument::from_ptr({})", c_var),
        after,
    }
}

fn instance(host: &str, var: &str, nullable: bool) -> InArg {
    if nullable {
        InArg::simple(
            format!("Option<{}>", host),
            format!(
                "gi::Argument::from_ptr({}.map_or(std::ptr::null_mut(), |v| v.p))",
                var
            ),
        )
    } else {
        InArg::simple(host, format!("gi::Argument::from_ptr({}.p)", var))
    }
}

fn interface(names: &TypeNames<'_>, ty: &TypeDescriptor, var: &str, opts: InOptions) -> InArg {
    let Some(iref) = ty.interface.as_ref() else {
        return InArg::todo("interface without reference");
    };
    let host = names.interface(iref);
    match names.kind(iref) {
        InterfaceKind::Struct | InterfaceKind::Union | InterfaceKind::Object | InterfaceKind::Interface => {
            if ty.is_pointer {
                instance(&host, var, opts.nullable)
            } else {
                InArg::todo(&format!("{} by value", iref.name))
            }
        }
        InterfaceKind::Enum => value(ty, &host, format!("gi::Argument::from_i32({}.bits())", var)),
        InterfaceKind::Flags => value(ty, &host, format!("gi::Argument::from_u32({}.bits())", var)),
        // Callbacks paired with user data are handled by the function emitter
        InterfaceKind::Callback => InArg::todo(&format!("callback {}", iref.name)),
        InterfaceKind::Unresolved => InArg::todo(&describe(ty)),
    }
}
