//! Runtime support for girgen generated bindings
//!
//! Provides the pieces generated code calls into:
//!
//! - [`Argument`]: the 8-byte generic argument slot
//! - [`Invoker`]: a prepared libffi call to a resolved native function
//! - [`InvokerCache`]: id-keyed lazy invoker resolution through a [`Repository`]
//! - [`ClosureRegistry`]: handles standing in for host callbacks
//! - [`WrapperRegistry`]: dynamic object wrapping by runtime `GType`
//! - string, array and `GError` marshaling helpers

pub mod argument;
pub mod array;
pub mod cache;
pub mod closure;
pub mod context;
pub mod error;
pub mod invoker;
pub mod loader;
pub mod mem;
pub mod memory;
pub mod repository;
pub mod wrapper;

pub use argument::{bool_to_int, Argument, FALSE, TRUE};
pub use array::{BoolArray, CStrArray, NativeArray, PointerArray};
pub use cache::{FindMethodFlags, InvokerCache};
pub use closure::{handle_from_ptr, handle_to_ptr, Closure, ClosureRegistry, Handle, Scope};
pub use context::{Context, ContextCell};
pub use error::{to_error, ErrorRef, GError, GiError, GiResult};
pub use invoker::Invoker;
pub use loader::{Library, LoadError};
pub use mem::{c_string, c_string_in, c_string_opt, free, malloc, malloc0, LibcAllocator, NativeAllocator, StrPtr};
pub use memory::{MemoryRepository, SymbolResolver, SymbolTable};
pub use repository::{BaseInfo, InfoRef, InfoType, Repository};
pub use wrapper::{
    instance_gtype, DynObject, GType, HashTable, List, ObjectWrapper, ParentFn, SList, Todo,
    WrapFn, Wrapper, WrapperRegistry,
};

pub use gi_types;
