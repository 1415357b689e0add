//! Introspection repository interface
//!
//! The invoker cache resolves symbols through these traits. Info handles are
//! returned as owned boxes; an implementation backed by native introspection
//! data releases its native reference in `Drop`, so every exit path of a
//! lookup releases what it acquired.

use std::fmt;

use crate::error::GiError;
use crate::invoker::Invoker;
use crate::wrapper::GType;

/// Kind of an introspected symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoType {
    Function,
    Callback,
    Struct,
    Union,
    Object,
    Interface,
    Enum,
    Flags,
    Constant,
}

impl InfoType {
    /// Kinds that own methods
    pub fn is_container(self) -> bool {
        matches!(
            self,
            InfoType::Struct | InfoType::Union | InfoType::Object | InfoType::Interface
        )
    }
}

impl fmt::Display for InfoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InfoType::Function => "function",
            InfoType::Callback => "callback",
            InfoType::Struct => "struct",
            InfoType::Union => "union",
            InfoType::Object => "object",
            InfoType::Interface => "interface",
            InfoType::Enum => "enum",
            InfoType::Flags => "flags",
            InfoType::Constant => "constant",
        };
        f.write_str(name)
    }
}

/// Owned handle to an introspected symbol; dropping it releases the symbol
pub type InfoRef<'a> = Box<dyn BaseInfo + 'a>;

/// An introspected symbol
pub trait BaseInfo {
    fn name(&self) -> &str;

    fn info_type(&self) -> InfoType;

    fn n_methods(&self) -> usize {
        0
    }

    /// Method at a position of a container
    fn method(&self, _index: usize) -> Option<InfoRef<'_>> {
        None
    }

    /// Direct method query of a container
    fn find_method(&self, _name: &str) -> Option<InfoRef<'_>> {
        None
    }

    /// Resolve the native function and prepare its call interface
    fn prep_invoker(&self) -> Result<Invoker, GiError> {
        Err(GiError::UnsupportedInfo(self.info_type()))
    }

    /// Runtime type of a registered type; invalid when it has none
    fn gtype(&self) -> Result<GType, GiError> {
        Ok(GType::INVALID)
    }
}

/// Source of introspected symbols
pub trait Repository: Send + Sync {
    /// Number of top-level symbols in a namespace
    fn n_infos(&self, namespace: &str) -> usize;

    /// Top-level symbol at a position
    fn info(&self, namespace: &str, index: usize) -> Option<InfoRef<'_>>;

    /// Top-level symbol by name
    fn find_by_name(&self, namespace: &str, name: &str) -> Option<InfoRef<'_>>;
}
