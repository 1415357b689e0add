//! Argument codec
//!
//! Translates a [`TypeDescriptor`] into the host type of a generated binding
//! and into the expressions that move a value between a host variable and a
//! `gi::Argument` slot. Every translation is an exhaustive match over
//! [`TypeTag`]; a type without a mapping yields a placeholder carrying a
//! `TODO` marker, which the completeness statistics count.

pub mod cb;
pub mod dir_in;
pub mod dir_out;

use gi_types::{ArrayKind, InterfaceKind, InterfaceRef, NamespaceDescriptor, TypeDescriptor, TypeTag};

use crate::config::Config;
use crate::names::{enum_type_name, flags_type_name};

/// Host spelling of `gpointer`
pub const C_VOID: &str = "*mut c_void/*use:std::ffi::c_void*/";

/// Host type of unmapped values
pub const TODO_TYPE: &str = "gi::Todo";

/// Resolves host names of the types a namespace refers to
pub struct TypeNames<'a> {
    namespace: &'a NamespaceDescriptor,
    config: &'a Config,
}

impl<'a> TypeNames<'a> {
    pub fn new(namespace: &'a NamespaceDescriptor, config: &'a Config) -> Self {
        Self { namespace, config }
    }

    pub fn namespace(&self) -> &'a NamespaceDescriptor {
        self.namespace
    }

    /// Module holding the bindings of namespace `ns`, e.g. `glib_2_0` for
    /// `GLib` when the config lists `GLib-2.0`
    pub fn module_of(&self, ns: &str) -> String {
        self.config
            .dep_for(ns)
            .unwrap_or(ns)
            .to_lowercase()
            .replace(['-', '.'], "_")
    }

    pub fn is_foreign(&self, iref: &InterfaceRef) -> bool {
        iref.namespace
            .as_deref()
            .is_some_and(|ns| ns != self.namespace.namespace)
    }

    /// Kind of a referenced type; local references the source left
    /// unresolved are looked up by name
    pub fn kind(&self, iref: &InterfaceRef) -> InterfaceKind {
        match iref.kind {
            InterfaceKind::Unresolved if !self.is_foreign(iref) => self
                .namespace
                .kind_of(&iref.name)
                .unwrap_or(InterfaceKind::Unresolved),
            kind => kind,
        }
    }

    /// Host type name of a referenced type, module qualified when foreign
    pub fn interface(&self, iref: &InterfaceRef) -> String {
        let local = match self.kind(iref) {
            InterfaceKind::Enum => enum_type_name(&iref.name),
            InterfaceKind::Flags => flags_type_name(&iref.name),
            _ => iref.name.clone(),
        };
        match iref.namespace.as_deref() {
            Some(ns) if ns != self.namespace.namespace => {
                let module = self.module_of(ns);
                format!("{}::{}/*use:super::{}*/", module, local, module)
            }
            _ => local,
        }
    }
}

/// Host type and slot accessor suffix of a fixed-width numeric tag
pub fn numeric_type(tag: TypeTag) -> Option<&'static str> {
    match tag {
        TypeTag::Int8 => Some("i8"),
        TypeTag::UInt8 => Some("u8"),
        TypeTag::Int16 => Some("i16"),
        TypeTag::UInt16 => Some("u16"),
        TypeTag::Int32 => Some("i32"),
        TypeTag::UInt32 => Some("u32"),
        TypeTag::Int64 => Some("i64"),
        TypeTag::UInt64 => Some("u64"),
        TypeTag::Float => Some("f32"),
        TypeTag::Double => Some("f64"),
        _ => None,
    }
}

/// Short description of a type for placeholder markers
pub fn describe(ty: &TypeDescriptor) -> String {
    let base = match (ty.tag, ty.interface.as_ref(), ty.elem()) {
        (TypeTag::Interface, Some(iref), _) => format!("{:?} {}", iref.kind, iref.name),
        (TypeTag::Array, _, Some(elem)) => format!("array of {}", describe(elem)),
        (tag, _, _) => tag.name().to_string(),
    };
    if ty.is_pointer && ty.tag != TypeTag::Array {
        format!("{} pointer", base)
    } else {
        base
    }
}

/// How a C array is represented on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayHost {
    /// A `gi` array view; `path` is the expression form of `ty`
    View { ty: String, path: String },
    /// An untyped pointer
    Opaque,
    /// No mapping
    Todo(String),
}

impl ArrayHost {
    fn view(ty: &str) -> Self {
        ArrayHost::View {
            ty: ty.to_string(),
            path: ty.to_string(),
        }
    }

    fn native(elem: &str) -> Self {
        ArrayHost::View {
            ty: format!("gi::NativeArray<{}>", elem),
            path: format!("gi::NativeArray::<{}>", elem),
        }
    }
}

/// Host representation of an array type
pub fn array_host(names: &TypeNames<'_>, ty: &TypeDescriptor) -> ArrayHost {
    match ty.array_kind {
        ArrayKind::C => {}
        ArrayKind::Array | ArrayKind::PtrArray | ArrayKind::ByteArray => return ArrayHost::Opaque,
    }
    let Some(elem) = ty.elem() else {
        return ArrayHost::Todo("array without element type".to_string());
    };
    let todo = || ArrayHost::Todo(describe(ty));
    match elem.tag {
        TypeTag::Void if elem.is_pointer => ArrayHost::view("gi::PointerArray"),
        TypeTag::Void => todo(),
        TypeTag::Boolean if !elem.is_pointer => ArrayHost::view("gi::BoolArray"),
        TypeTag::Int8
        | TypeTag::UInt8
        | TypeTag::Int16
        | TypeTag::UInt16
        | TypeTag::Int32
        | TypeTag::UInt32
        | TypeTag::Int64
        | TypeTag::UInt64
        | TypeTag::Float
        | TypeTag::Double
            if !elem.is_pointer =>
        {
            numeric_type(elem.tag).map_or_else(todo, ArrayHost::native)
        }
        TypeTag::GType if !elem.is_pointer => ArrayHost::native("gi::GType"),
        TypeTag::Unichar if !elem.is_pointer => ArrayHost::native("u32"),
        TypeTag::Boolean
        | TypeTag::Int8
        | TypeTag::UInt8
        | TypeTag::Int16
        | TypeTag::UInt16
        | TypeTag::Int32
        | TypeTag::UInt32
        | TypeTag::Int64
        | TypeTag::UInt64
        | TypeTag::Float
        | TypeTag::Double
        | TypeTag::GType
        | TypeTag::Unichar => todo(),
        TypeTag::Utf8 | TypeTag::Filename => ArrayHost::view("gi::CStrArray"),
        TypeTag::Array | TypeTag::GList | TypeTag::GSList | TypeTag::GHash | TypeTag::Error => {
            if elem.is_pointer {
                ArrayHost::view("gi::PointerArray")
            } else {
                todo()
            }
        }
        TypeTag::Interface => {
            let Some(iref) = elem.interface.as_ref() else {
                return todo();
            };
            match names.kind(iref) {
                InterfaceKind::Struct
                | InterfaceKind::Union
                | InterfaceKind::Object
                | InterfaceKind::Interface => {
                    if elem.is_pointer {
                        ArrayHost::view("gi::PointerArray")
                    } else {
                        // Inline structs have no element view
                        ArrayHost::Opaque
                    }
                }
                InterfaceKind::Enum => ArrayHost::native("i32"),
                InterfaceKind::Flags => ArrayHost::native("u32"),
                InterfaceKind::Callback => ArrayHost::view("gi::PointerArray"),
                InterfaceKind::Unresolved => todo(),
            }
        }
    }
}

/// Marshaling of one value passed into a native call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InArg {
    /// Host parameter type
    pub host_type: String,
    /// Statements run before the call
    pub before: Vec<String>,
    /// Expression of the argument slot
    pub slot: String,
    /// Statements run after the call
    pub after: Vec<String>,
}

impl InArg {
    pub fn simple(host_type: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            host_type: host_type.into(),
            slot: slot.into(),
            ..Self::default()
        }
    }

    pub fn todo(what: &str) -> Self {
        Self::simple(TODO_TYPE, format!("gi::Argument::ZERO/*TODO {}*/", what))
    }
}

/// A value decoded from a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutValue {
    pub host_type: String,
    pub expr: String,
    /// The expression refers to the runtime context `ctx`
    pub needs_ctx: bool,
}

impl OutValue {
    pub fn new(host_type: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            host_type: host_type.into(),
            expr: expr.into(),
            needs_ctx: false,
        }
    }

    pub fn todo(what: &str) -> Self {
        Self::new(TODO_TYPE, format!("gi::Todo/*TODO {}*/", what))
    }

    pub fn is_todo(&self) -> bool {
        self.host_type == TODO_TYPE
    }
}

/// Early-return value of a host type
pub fn zero_value(host_type: &str) -> String {
    if host_type.starts_with("*mut") {
        "std::ptr::null_mut()".to_string()
    } else {
        "Default::default()".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gi_types::InfoDescriptor;

    pub(crate) fn namespace() -> NamespaceDescriptor {
        let mut ns = NamespaceDescriptor::new("Demo", "1.0");
        ns.infos.push(InfoDescriptor::Enum(gi_types::EnumDescriptor {
            name: "Orientation".to_string(),
            type_init: None,
            values: Vec::new(),
            deprecated: false,
        }));
        ns
    }

    #[test]
    fn test_interface_names() {
        let ns = namespace();
        let cfg = Config {
            deps: vec!["GLib-2.0".to_string()],
            ..Config::default()
        };
        let names = TypeNames::new(&ns, &cfg);

        let local = TypeDescriptor::interface(InterfaceKind::Object, "Widget");
        assert_eq!(names.interface(local.interface.as_ref().unwrap()), "Widget");

        let flags = TypeDescriptor::interface(InterfaceKind::Flags, "IOCondition").in_namespace("GLib");
        assert_eq!(
            names.interface(flags.interface.as_ref().unwrap()),
            "glib_2_0::IOConditionFlags/*use:super::glib_2_0*/"
        );

        let other = TypeDescriptor::interface(InterfaceKind::Struct, "Value").in_namespace("GObject");
        assert_eq!(
            names.interface(other.interface.as_ref().unwrap()),
            "gobject::Value/*use:super::gobject*/"
        );
    }

    #[test]
    fn test_unresolved_local_reference() {
        let ns = namespace();
        let cfg = Config::default();
        let names = TypeNames::new(&ns, &cfg);
        let iref = InterfaceRef {
            kind: InterfaceKind::Unresolved,
            name: "Orientation".to_string(),
            namespace: None,
        };
        assert_eq!(names.kind(&iref), InterfaceKind::Enum);
        assert_eq!(names.interface(&iref), "OrientationEnum");
    }

    #[test]
    fn test_array_hosts() {
        let ns = namespace();
        let cfg = Config::default();
        let names = TypeNames::new(&ns, &cfg);

        let ints = TypeDescriptor::c_array(TypeDescriptor::scalar(TypeTag::Int32), None, false);
        assert_eq!(
            array_host(&names, &ints),
            ArrayHost::View {
                ty: "gi::NativeArray<i32>".to_string(),
                path: "gi::NativeArray::<i32>".to_string(),
            }
        );

        let strs = TypeDescriptor::c_array(TypeDescriptor::utf8(), None, true);
        assert!(matches!(array_host(&names, &strs), ArrayHost::View { ty, .. } if ty == "gi::CStrArray"));

        let mut garray = ints.clone();
        garray.array_kind = ArrayKind::Array;
        assert_eq!(array_host(&names, &garray), ArrayHost::Opaque);

        let mut inline_rect = TypeDescriptor::interface(InterfaceKind::Struct, "Rect");
        inline_rect.is_pointer = false;
        let rects = TypeDescriptor::c_array(inline_rect, None, false);
        assert_eq!(array_host(&names, &rects), ArrayHost::Opaque);

        let rect_ptrs = TypeDescriptor::c_array(
            TypeDescriptor::interface(InterfaceKind::Struct, "Rect"),
            None,
            false,
        );
        assert_eq!(array_host(&names, &rect_ptrs), ArrayHost::view("gi::PointerArray"));

        let ptrs = TypeDescriptor::c_array(TypeDescriptor::scalar(TypeTag::Int32).pointer(), None, false);
        assert!(matches!(array_host(&names, &ptrs), ArrayHost::Todo(_)));
    }

    #[test]
    fn test_describe_and_zero() {
        let ty = TypeDescriptor::scalar(TypeTag::Int32).pointer();
        assert_eq!(describe(&ty), "int32 pointer");
        let arr = TypeDescriptor::c_array(TypeDescriptor::utf8(), None, true);
        assert_eq!(describe(&arr), "array of utf8 pointer");
        assert_eq!(zero_value("*mut c_void"), "std::ptr::null_mut()");
        assert_eq!(zero_value("(i32, String)"), "Default::default()");
    }
}
