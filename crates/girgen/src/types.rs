//! Wrapper types, enums, flags and constants

use gi_types::{ConstantDescriptor, ConstantValue, ContainerDescriptor, EnumDescriptor, InfoDescriptor, InterfaceKind};
use rustc_hash::FxHashSet;

use crate::codec::{TypeNames, C_VOID};
use crate::names::{enum_type_name, flags_type_name, item_name, member_const_name};
use crate::source::{pn, SourceBlock};

/// Kind of a type that owns methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Struct,
    Union,
    Object,
    Interface,
}

impl ContainerKind {
    pub fn of(info: &InfoDescriptor) -> Option<(&ContainerDescriptor, ContainerKind)> {
        match info {
            InfoDescriptor::Struct(c) => Some((c, ContainerKind::Struct)),
            InfoDescriptor::Union(c) => Some((c, ContainerKind::Union)),
            InfoDescriptor::Object(c) => Some((c, ContainerKind::Object)),
            InfoDescriptor::Interface(c) => Some((c, ContainerKind::Interface)),
            _ => None,
        }
    }

    /// Runtime info type expression of the container
    pub fn info_type(self) -> &'static str {
        match self {
            ContainerKind::Struct => "gi::InfoType::Struct",
            ContainerKind::Union => "gi::InfoType::Union",
            ContainerKind::Object => "gi::InfoType::Object",
            ContainerKind::Interface => "gi::InfoType::Interface",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ContainerKind::Struct => "Struct",
            ContainerKind::Union => "Union",
            ContainerKind::Object => "Object",
            ContainerKind::Interface => "Interface",
        }
    }
}

/// `get_type` of a registered type, resolved through the invoker cache
pub fn emit_get_type(b: &mut SourceBlock, host: &str, native: &str, id: u32) {
    b.open(format!("impl {} {{", host));
    b.open("pub fn get_type() -> gi::GType {");
    b.open("match CONTEXT.get() {");
    pn!(b, "Ok(ctx) => ctx.invokers.gtype({}, {:?}),", id, native);
    b.open("Err(err) => {");
    b.line("log::warn!(\"{}\", err);");
    b.line("gi::GType::INVALID");
    b.close("}");
    b.close("}");
    b.close("}");
    b.close("}");
}

/// Wrapper struct of a container and its trait impls.
///
/// `get_type_id` is set when the type gets a `get_type` function.
pub fn emit_container(
    names: &TypeNames<'_>,
    c: &ContainerDescriptor,
    kind: ContainerKind,
    get_type_id: Option<u32>,
) -> SourceBlock {
    let mut b = SourceBlock::new();
    let name = &c.name;

    pn!(b, "/// {} `{}`", kind.label(), name);
    if c.deprecated {
        b.line("#[deprecated]");
    }
    b.line("#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
    b.open(format!("pub struct {} {{", name));
    pn!(b, "pub p: {},", C_VOID);
    b.close("}");
    b.line("");

    b.open(format!("impl Default for {} {{", name));
    b.open("fn default() -> Self {");
    pn!(b, "{} {{ p: std::ptr::null_mut() }}", name);
    b.close("}");
    b.close("}");
    b.line("");

    b.open(format!("impl gi::Wrapper for {} {{", name));
    b.open(format!("fn from_ptr(p: {}) -> Self {{", C_VOID));
    pn!(b, "{} {{ p }}", name);
    b.close("}");
    b.line("");
    b.open(format!("fn as_ptr(&self) -> {} {{", C_VOID));
    b.line("self.p");
    b.close("}");
    b.close("}");

    if kind == ContainerKind::Object {
        b.line("");
        b.open(format!("impl gi::ObjectWrapper for {} {{", name));
        b.open(format!("fn as_ptr(&self) -> {} {{", C_VOID));
        b.line("self.p");
        b.close("}");
        b.line("");
        b.open("fn as_any(&self) -> &dyn std::any::Any {");
        b.line("self");
        b.close("}");
        b.line("");
        b.open("fn type_name(&self) -> &'static str {");
        pn!(b, "{:?}", name);
        b.close("}");
        b.close("}");
        b.line("");

        b.open(format!("impl {} {{", name));
        b.open(format!("pub fn wrap_object(p: {}) -> gi::DynObject {{", C_VOID));
        pn!(b, "Box::new({} {{ p }})", name);
        b.close("}");
        b.close("}");

        let local_parent = c
            .parent
            .as_deref()
            .filter(|parent| names.namespace().kind_of(parent) == Some(InterfaceKind::Object));
        if let Some(parent) = local_parent {
            b.line("");
            b.open(format!("impl From<{}> for {} {{", name, parent));
            pn!(b, "fn from(v: {}) -> Self {{", name);
            pn!(b, "    {} {{ p: v.p }}", parent);
            b.line("}");
            b.close("}");
        }
    }

    if let Some(id) = get_type_id {
        b.line("");
        emit_get_type(&mut b, name, name, id);
    }
    b
}

/// Enum or flags type: a newtype over the native integer with one
/// associated constant per member
pub fn emit_enum(e: &EnumDescriptor, is_flags: bool, get_type_id: Option<u32>) -> SourceBlock {
    let mut b = SourceBlock::new();
    let (host, repr, label) = if is_flags {
        (flags_type_name(&e.name), "u32", "Flags")
    } else {
        (enum_type_name(&e.name), "i32", "Enum")
    };

    pn!(b, "/// {} `{}`", label, e.name);
    if e.deprecated {
        b.line("#[deprecated]");
    }
    b.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]");
    pn!(b, "pub struct {}(pub {});", host, repr);
    b.line("");

    b.open(format!("impl {} {{", host));
    let mut seen = FxHashSet::default();
    for v in &e.values {
        let name = member_const_name(&v.name);
        if !seen.insert(name.clone()) {
            continue;
        }
        let bits = if is_flags {
            (v.value as u32).to_string()
        } else {
            (v.value as i32).to_string()
        };
        pn!(b, "pub const {}: {} = {}({});", name, host, host, bits);
    }
    if !e.values.is_empty() {
        b.line("");
    }
    pn!(b, "pub fn from_bits(bits: {}) -> Self {{", repr);
    pn!(b, "    {}(bits)", host);
    b.line("}");
    b.line("");
    pn!(b, "pub fn bits(self) -> {} {{", repr);
    b.line("    self.0");
    b.line("}");
    if is_flags {
        b.line("");
        b.line("pub fn contains(self, other: Self) -> bool {");
        b.line("    self.0 & other.0 == other.0");
        b.line("}");
    }
    b.close("}");

    if is_flags {
        b.line("");
        b.open(format!("impl std::ops::BitOr for {} {{", host));
        pn!(b, "type Output = {};", host);
        b.line("");
        pn!(b, "fn bitor(self, rhs: {}) -> {} {{", host, host);
        pn!(b, "    {}(self.0 | rhs.0)", host);
        b.line("}");
        b.close("}");
    }

    if let Some(id) = get_type_id {
        b.line("");
        emit_get_type(&mut b, &host, &e.name, id);
    }
    b
}

/// A constant; values without a literal form become a marker comment
pub fn emit_constant(c: &ConstantDescriptor) -> SourceBlock {
    let mut b = SourceBlock::new();
    let name = item_name(&c.name);
    match &c.value {
        Some(ConstantValue::Bool(v)) => pn!(b, "pub const {}: bool = {};", name, v),
        Some(ConstantValue::Int(v)) => pn!(b, "pub const {}: i64 = {};", name, v),
        Some(ConstantValue::Float(v)) if v.is_finite() => pn!(b, "pub const {}: f64 = {:?};", name, v),
        Some(ConstantValue::Str(v)) => pn!(b, "pub const {}: &str = {:?};", name, v),
        Some(ConstantValue::Float(_)) | None => pn!(b, "// TODO constant {}", c.name),
    }
    b
}
