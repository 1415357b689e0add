//! Native signatures of callback trampolines

use gi_types::{InterfaceKind, TypeDescriptor, TypeTag};

use super::{numeric_type, TypeNames, C_VOID};

/// Native parameter type of a trampoline and the slot constructor wrapping it
pub fn native_param(names: &TypeNames<'_>, ty: &TypeDescriptor) -> Option<(String, &'static str)> {
    if ty.is_pointer {
        return Some((C_VOID.to_string(), "from_ptr"));
    }
    let (native, from) = match ty.tag {
        TypeTag::Void => return None,
        TypeTag::Boolean => ("i32", "from_i32"),
        TypeTag::Int8 => ("i8", "from_i8"),
        TypeTag::UInt8 => ("u8", "from_u8"),
        TypeTag::Int16 => ("i16", "from_i16"),
        TypeTag::UInt16 => ("u16", "from_u16"),
        TypeTag::Int32 => ("i32", "from_i32"),
        TypeTag::UInt32 => ("u32", "from_u32"),
        TypeTag::Int64 => ("i64", "from_i64"),
        TypeTag::UInt64 => ("u64", "from_u64"),
        TypeTag::Float => ("f32", "from_f32"),
        TypeTag::Double => ("f64", "from_f64"),
        TypeTag::GType => ("gi::GType", "from_gtype"),
        TypeTag::Unichar => ("u32", "from_u32"),
        TypeTag::Utf8
        | TypeTag::Filename
        | TypeTag::Array
        | TypeTag::GList
        | TypeTag::GSList
        | TypeTag::GHash
        | TypeTag::Error => (C_VOID, "from_ptr"),
        TypeTag::Interface => match ty.interface.as_ref().map(|iref| names.kind(iref)) {
            Some(InterfaceKind::Enum) => ("i32", "from_i32"),
            Some(InterfaceKind::Flags) => ("u32", "from_u32"),
            Some(InterfaceKind::Callback) => (C_VOID, "from_ptr"),
            Some(
                InterfaceKind::Struct
                | InterfaceKind::Union
                | InterfaceKind::Object
                | InterfaceKind::Interface
                | InterfaceKind::Unresolved,
            )
            | None => return None,
        },
    };
    Some((native.to_string(), from))
}

/// How a host callback result is handed back to native code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeReturn {
    /// Native return type, empty for `void`
    pub native_type: String,
    /// Result type of the host callable
    pub host_type: String,
    /// Conversion of the host result; `{}` stands for the result expression
    pub convert: String,
    /// Value returned when no callable is registered
    pub default: String,
}

impl NativeReturn {
    fn new(native: &str, host: &str, convert: &str, default: &str) -> Self {
        Self {
            native_type: native.to_string(),
            host_type: host.to_string(),
            convert: convert.to_string(),
            default: default.to_string(),
        }
    }

    pub fn is_void(&self) -> bool {
        self.native_type.is_empty()
    }

    pub fn apply(&self, expr: &str) -> String {
        self.convert.replace("{}", expr)
    }
}

/// Return mapping of a callback, `None` when the type has none
pub fn native_return(names: &TypeNames<'_>, ty: &TypeDescriptor) -> Option<NativeReturn> {
    const NULL: &str = "std::ptr::null_mut()";
    let ret = match ty.tag {
        TypeTag::Void if ty.is_pointer => NativeReturn::new(C_VOID, C_VOID, "{}", NULL),
        TypeTag::Void => NativeReturn::new("", "()", "{}", ""),
        TypeTag::Boolean => NativeReturn::new("i32", "bool", "gi::bool_to_int({})", "0"),
        TypeTag::Int8
        | TypeTag::UInt8
        | TypeTag::Int16
        | TypeTag::UInt16
        | TypeTag::Int32
        | TypeTag::UInt32
        | TypeTag::Int64
        | TypeTag::UInt64 => {
            let t = numeric_type(ty.tag)?;
            NativeReturn::new(t, t, "{}", "0")
        }
        TypeTag::Float | TypeTag::Double => {
            let t = numeric_type(ty.tag)?;
            NativeReturn::new(t, t, "{}", "0.0")
        }
        TypeTag::GType => NativeReturn::new("gi::GType", "gi::GType", "{}", "gi::GType::INVALID"),
        TypeTag::Unichar => NativeReturn::new("u32", "char", "u32::from({})", "0"),
        // The native side owns the returned copy
        TypeTag::Utf8 | TypeTag::Filename => {
            NativeReturn::new(C_VOID, "String", "gi::c_string(&{}) as *mut c_void", NULL)
        }
        TypeTag::Interface => {
            let iref = ty.interface.as_ref()?;
            let host = names.interface(iref);
            match names.kind(iref) {
                InterfaceKind::Enum => NativeReturn::new("i32", &host, "{}.bits()", "0"),
                InterfaceKind::Flags => NativeReturn::new("u32", &host, "{}.bits()", "0"),
                InterfaceKind::Struct
                | InterfaceKind::Union
                | InterfaceKind::Object
                | InterfaceKind::Interface
                    if ty.is_pointer =>
                {
                    NativeReturn::new(C_VOID, &host, "{}.p", NULL)
                }
                InterfaceKind::Struct
                | InterfaceKind::Union
                | InterfaceKind::Object
                | InterfaceKind::Interface
                | InterfaceKind::Callback
                | InterfaceKind::Unresolved => return None,
            }
        }
        TypeTag::Array | TypeTag::GList | TypeTag::GSList | TypeTag::GHash | TypeTag::Error => {
            return None
        }
    };
    if ty.is_pointer && !ret.native_type.starts_with("*mut") {
        return None;
    }
    Some(ret)
}
