//! GObject-Introspection type descriptors
//!
//! The declarative metadata model consumed by the `girgen` code generator and by
//! the in-memory repository of the `gi` runtime. Descriptors are immutable
//! values; they are usually deserialized from a namespace JSON document.

pub mod arg;
pub mod info;
pub mod tag;

pub use arg::{ArgumentDescriptor, Direction, ScopeType, Transfer};
pub use info::{
    CallbackDescriptor, ConstantDescriptor, ConstantValue, ContainerDescriptor, DescriptorError,
    EnumDescriptor, EnumValue, FunctionDescriptor, FunctionFlags, InfoDescriptor,
    NamespaceDescriptor,
};
pub use tag::{ArrayKind, InterfaceKind, InterfaceRef, TypeDescriptor, TypeTag};
