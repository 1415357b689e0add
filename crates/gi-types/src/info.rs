//! Introspected symbol descriptors and namespace documents

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::arg::{ArgumentDescriptor, Transfer};
use crate::tag::{InterfaceKind, TypeDescriptor};

/// Errors that can occur while loading a namespace document
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Failed to read the document
    #[error("Failed to read namespace document: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("Failed to parse namespace document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Structurally valid JSON describing an inconsistent namespace
    #[error("Invalid namespace document: {0}")]
    Invalid(String),
}

/// Call flags of a function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionFlags {
    /// Takes an implicit instance pointer as first native argument
    pub is_method: bool,
    pub is_constructor: bool,
    /// Takes an implicit trailing `GError**`
    pub throws: bool,
}

/// A function or method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,

    /// Native symbol name
    pub symbol: String,

    #[serde(default)]
    pub flags: FunctionFlags,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub args: Vec<ArgumentDescriptor>,

    #[serde(default = "TypeDescriptor::void")]
    pub return_type: TypeDescriptor,

    #[serde(default)]
    pub return_transfer: Transfer,

    #[serde(default)]
    pub may_return_null: bool,

    #[serde(default)]
    pub skip_return: bool,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            flags: FunctionFlags::default(),
            deprecated: false,
            args: Vec::new(),
            return_type: TypeDescriptor::void(),
            return_transfer: Transfer::Nothing,
            may_return_null: false,
            skip_return: false,
        }
    }

    pub fn arg(mut self, arg: ArgumentDescriptor) -> Self {
        self.args.push(arg);
        self
    }

    pub fn returns(mut self, ty: TypeDescriptor) -> Self {
        self.return_type = ty;
        self
    }

    pub fn return_transfer(mut self, transfer: Transfer) -> Self {
        self.return_transfer = transfer;
        self
    }

    pub fn method(mut self) -> Self {
        self.flags.is_method = true;
        self
    }

    pub fn constructor(mut self) -> Self {
        self.flags.is_constructor = true;
        self
    }

    pub fn throws(mut self) -> Self {
        self.flags.throws = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Number of native arguments including receiver and error slot
    pub fn n_native_args(&self) -> usize {
        self.args.len() + usize::from(self.flags.is_method) + usize::from(self.flags.throws)
    }
}

/// A callback type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackDescriptor {
    pub name: String,

    #[serde(default)]
    pub args: Vec<ArgumentDescriptor>,

    #[serde(default = "TypeDescriptor::void")]
    pub return_type: TypeDescriptor,

    #[serde(default)]
    pub return_transfer: Transfer,

    #[serde(default)]
    pub deprecated: bool,
}

/// A struct, union, object or interface with its methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub name: String,

    /// Symbol of the `*_get_type` function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_init: Option<String>,

    /// Parent object name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default)]
    pub methods: Vec<FunctionDescriptor>,

    #[serde(default)]
    pub deprecated: bool,
}

impl ContainerDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_init: None,
            parent: None,
            methods: Vec::new(),
            deprecated: false,
        }
    }

    pub fn method(mut self, method: FunctionDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn type_init(mut self, symbol: impl Into<String>) -> Self {
        self.type_init = Some(symbol.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn find_method(&self, name: &str) -> Option<(usize, &FunctionDescriptor)> {
        self.methods.iter().enumerate().find(|(_, m)| m.name == name)
    }
}

/// One member of an enum or flags type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

/// An enum or flags type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_init: Option<String>,

    #[serde(default)]
    pub values: Vec<EnumValue>,

    #[serde(default)]
    pub deprecated: bool,
}

/// Value of a constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A named constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantDescriptor {
    pub name: String,

    /// Absent when the value cannot be represented
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConstantValue>,
}

/// Any top-level introspected symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoDescriptor {
    Function(FunctionDescriptor),
    Callback(CallbackDescriptor),
    Struct(ContainerDescriptor),
    Union(ContainerDescriptor),
    Object(ContainerDescriptor),
    Interface(ContainerDescriptor),
    Enum(EnumDescriptor),
    Flags(EnumDescriptor),
    Constant(ConstantDescriptor),
}

impl InfoDescriptor {
    pub fn name(&self) -> &str {
        match self {
            InfoDescriptor::Function(f) => &f.name,
            InfoDescriptor::Callback(c) => &c.name,
            InfoDescriptor::Struct(c)
            | InfoDescriptor::Union(c)
            | InfoDescriptor::Object(c)
            | InfoDescriptor::Interface(c) => &c.name,
            InfoDescriptor::Enum(e) | InfoDescriptor::Flags(e) => &e.name,
            InfoDescriptor::Constant(c) => &c.name,
        }
    }

    /// Interface kind this symbol has when referenced from a type
    pub fn interface_kind(&self) -> Option<InterfaceKind> {
        match self {
            InfoDescriptor::Function(_) | InfoDescriptor::Constant(_) => None,
            InfoDescriptor::Callback(_) => Some(InterfaceKind::Callback),
            InfoDescriptor::Struct(_) => Some(InterfaceKind::Struct),
            InfoDescriptor::Union(_) => Some(InterfaceKind::Union),
            InfoDescriptor::Object(_) => Some(InterfaceKind::Object),
            InfoDescriptor::Interface(_) => Some(InterfaceKind::Interface),
            InfoDescriptor::Enum(_) => Some(InterfaceKind::Enum),
            InfoDescriptor::Flags(_) => Some(InterfaceKind::Flags),
        }
    }

    pub fn as_container(&self) -> Option<&ContainerDescriptor> {
        match self {
            InfoDescriptor::Struct(c)
            | InfoDescriptor::Union(c)
            | InfoDescriptor::Object(c)
            | InfoDescriptor::Interface(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDescriptor> {
        match self {
            InfoDescriptor::Function(f) => Some(f),
            _ => None,
        }
    }
}

/// All symbols of one introspected namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDescriptor {
    pub namespace: String,
    pub version: String,

    /// Shared library providing the symbols
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_library: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_prefix: Option<String>,

    #[serde(default)]
    pub infos: Vec<InfoDescriptor>,
}

impl NamespaceDescriptor {
    pub fn new(namespace: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            version: version.into(),
            shared_library: None,
            c_prefix: None,
            infos: Vec::new(),
        }
    }

    pub fn info(mut self, info: InfoDescriptor) -> Self {
        self.infos.push(info);
        self
    }

    /// Parse a namespace document
    pub fn from_json(source: &str) -> Result<Self, DescriptorError> {
        let ns: NamespaceDescriptor = serde_json::from_str(source)?;
        ns.validate()?;
        Ok(ns)
    }

    /// Read and parse a namespace document
    pub fn from_path(path: &Path) -> Result<Self, DescriptorError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn to_json(&self) -> Result<String, DescriptorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Find a top-level symbol and its position
    pub fn find(&self, name: &str) -> Option<(usize, &InfoDescriptor)> {
        self.infos.iter().enumerate().find(|(_, info)| info.name() == name)
    }

    /// Interface kind of a named type in this namespace
    pub fn kind_of(&self, name: &str) -> Option<InterfaceKind> {
        self.find(name).and_then(|(_, info)| info.interface_kind())
    }

    /// Check index references of every callable
    fn validate(&self) -> Result<(), DescriptorError> {
        for info in &self.infos {
            let functions: Vec<&FunctionDescriptor> = match info {
                InfoDescriptor::Function(f) => vec![f],
                other => match other.as_container() {
                    Some(c) => c.methods.iter().collect(),
                    None => Vec::new(),
                },
            };
            for func in functions {
                check_indices(&func.symbol, &func.args)?;
            }
            if let InfoDescriptor::Callback(cb) = info {
                check_indices(&cb.name, &cb.args)?;
            }
        }
        Ok(())
    }
}

fn check_indices(owner: &str, args: &[ArgumentDescriptor]) -> Result<(), DescriptorError> {
    let n = args.len();
    for arg in args {
        let refs = [arg.closure, arg.destroy, arg.ty.array_length];
        if let Some(bad) = refs.into_iter().flatten().find(|&i| i >= n) {
            return Err(DescriptorError::Invalid(format!(
                "{}: argument {} refers to index {} of {} arguments",
                owner, arg.name, bad, n
            )));
        }
    }
    Ok(())
}
