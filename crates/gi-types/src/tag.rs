//! Type tags and type descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Basic classification of an introspected type.
///
/// The set is closed: every consumer matches it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Void,
    Boolean,
    Int8,
    #[serde(rename = "uint8")]
    UInt8,
    Int16,
    #[serde(rename = "uint16")]
    UInt16,
    Int32,
    #[serde(rename = "uint32")]
    UInt32,
    Int64,
    #[serde(rename = "uint64")]
    UInt64,
    Float,
    Double,
    #[serde(rename = "gtype")]
    GType,
    Utf8,
    Filename,
    Array,
    Interface,
    #[serde(rename = "glist")]
    GList,
    #[serde(rename = "gslist")]
    GSList,
    #[serde(rename = "ghash")]
    GHash,
    Error,
    Unichar,
}

impl TypeTag {
    /// Lowercase name as used in GIR data
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Void => "void",
            TypeTag::Boolean => "boolean",
            TypeTag::Int8 => "int8",
            TypeTag::UInt8 => "uint8",
            TypeTag::Int16 => "int16",
            TypeTag::UInt16 => "uint16",
            TypeTag::Int32 => "int32",
            TypeTag::UInt32 => "uint32",
            TypeTag::Int64 => "int64",
            TypeTag::UInt64 => "uint64",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::GType => "gtype",
            TypeTag::Utf8 => "utf8",
            TypeTag::Filename => "filename",
            TypeTag::Array => "array",
            TypeTag::Interface => "interface",
            TypeTag::GList => "glist",
            TypeTag::GSList => "gslist",
            TypeTag::GHash => "ghash",
            TypeTag::Error => "error",
            TypeTag::Unichar => "unichar",
        }
    }

    /// Fixed-width numeric tags (booleans excluded)
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
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
        )
    }

    /// String tags
    pub fn is_string(self) -> bool {
        matches!(self, TypeTag::Utf8 | TypeTag::Filename)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a named type referenced through [`TypeTag::Interface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    Struct,
    Union,
    Object,
    Interface,
    Enum,
    Flags,
    Callback,
    /// The descriptor source could not resolve the reference
    Unresolved,
}

impl InterfaceKind {
    /// Kinds that are passed around as an opaque instance pointer
    pub fn is_instance(self) -> bool {
        matches!(
            self,
            InterfaceKind::Struct
                | InterfaceKind::Union
                | InterfaceKind::Object
                | InterfaceKind::Interface
        )
    }
}

/// Storage kind of an array type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayKind {
    /// Plain C array
    #[default]
    C,
    /// `GArray`
    Array,
    /// `GPtrArray`
    PtrArray,
    /// `GByteArray`
    ByteArray,
}

/// Reference to a named type in some namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRef {
    pub kind: InterfaceKind,
    pub name: String,

    /// Owning namespace, `None` for the namespace being generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Native shape of a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub tag: TypeTag,

    #[serde(default)]
    pub is_pointer: bool,

    /// Element type of an array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elem_type: Option<Box<TypeDescriptor>>,

    /// Index of the argument carrying the array length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_length: Option<usize>,

    /// Fixed number of elements of an array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_fixed_size: Option<usize>,

    #[serde(default)]
    pub zero_terminated: bool,

    #[serde(default)]
    pub array_kind: ArrayKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<InterfaceRef>,
}

impl TypeDescriptor {
    /// A non-pointer value of the given tag
    pub fn scalar(tag: TypeTag) -> Self {
        Self {
            tag,
            is_pointer: false,
            elem_type: None,
            array_length: None,
            array_fixed_size: None,
            zero_terminated: false,
            array_kind: ArrayKind::C,
            interface: None,
        }
    }

    pub fn void() -> Self {
        Self::scalar(TypeTag::Void)
    }

    /// `gpointer`
    pub fn void_pointer() -> Self {
        Self::scalar(TypeTag::Void).pointer()
    }

    /// `gchar*` holding UTF-8
    pub fn utf8() -> Self {
        Self::scalar(TypeTag::Utf8).pointer()
    }

    pub fn filename() -> Self {
        Self::scalar(TypeTag::Filename).pointer()
    }

    /// Reference to a named type; instance kinds are pointers
    pub fn interface(kind: InterfaceKind, name: impl Into<String>) -> Self {
        let mut ty = Self::scalar(TypeTag::Interface);
        ty.is_pointer = kind.is_instance();
        ty.interface = Some(InterfaceRef {
            kind,
            name: name.into(),
            namespace: None,
        });
        ty
    }

    /// C array of `elem` whose length is carried by the argument at `length`
    pub fn c_array(elem: TypeDescriptor, length: Option<usize>, zero_terminated: bool) -> Self {
        let mut ty = Self::scalar(TypeTag::Array).pointer();
        ty.elem_type = Some(Box::new(elem));
        ty.array_length = length;
        ty.zero_terminated = zero_terminated;
        ty
    }

    /// Same type marked as a pointer
    pub fn pointer(mut self) -> Self {
        self.is_pointer = true;
        self
    }

    /// Set the owning namespace of an interface reference
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        if let Some(iface) = self.interface.as_mut() {
            iface.namespace = Some(namespace.into());
        }
        self
    }

    pub fn interface_kind(&self) -> Option<InterfaceKind> {
        self.interface.as_ref().map(|i| i.kind)
    }

    pub fn interface_name(&self) -> Option<&str> {
        self.interface.as_ref().map(|i| i.name.as_str())
    }

    pub fn elem(&self) -> Option<&TypeDescriptor> {
        self.elem_type.as_deref()
    }

    /// Struct, union, object or interface reference
    pub fn is_instance(&self) -> bool {
        self.tag == TypeTag::Interface
            && self.interface_kind().map_or(false, InterfaceKind::is_instance)
    }

    pub fn is_void(&self) -> bool {
        self.tag == TypeTag::Void && !self.is_pointer
    }
}
