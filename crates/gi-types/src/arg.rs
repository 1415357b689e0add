//! Argument descriptors

use serde::{Deserialize, Serialize};

use crate::tag::{InterfaceKind, TypeDescriptor, TypeTag};

/// Direction of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    In,
    Out,
    #[serde(rename = "inout")]
    InOut,
}

/// Ownership transfer of a value crossing the native boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transfer {
    /// The receiver does not own the value
    #[default]
    Nothing,
    /// The receiver owns the container but not its elements
    Container,
    /// The receiver owns the value entirely
    Everything,
}

impl Transfer {
    /// Whether the receiver must release the outer value
    pub fn owns_container(self) -> bool {
        match self {
            Transfer::Nothing => false,
            Transfer::Container | Transfer::Everything => true,
        }
    }

    /// Whether the receiver must release the elements too
    pub fn owns_elements(self) -> bool {
        match self {
            Transfer::Nothing | Transfer::Container => false,
            Transfer::Everything => true,
        }
    }
}

/// Lifetime of a callback handed to native code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    #[default]
    Invalid,
    /// Valid for the duration of the call only
    Call,
    /// Valid until the callback has been invoked once
    Async,
    /// Valid until the destroy notify has been called
    Notified,
}

/// One argument of a callable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    pub name: String,

    #[serde(default)]
    pub direction: Direction,

    #[serde(rename = "type")]
    pub ty: TypeDescriptor,

    #[serde(default)]
    pub transfer: Transfer,

    #[serde(default)]
    pub caller_allocates: bool,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub optional: bool,

    /// Index of the user-data argument paired with a callback argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure: Option<usize>,

    /// Index of the destroy-notify argument paired with a callback argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy: Option<usize>,

    #[serde(default)]
    pub scope: ScopeType,
}

impl ArgumentDescriptor {
    /// An `in` argument without ownership transfer
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            direction: Direction::In,
            ty,
            transfer: Transfer::Nothing,
            caller_allocates: false,
            nullable: false,
            optional: false,
            closure: None,
            destroy: None,
            scope: ScopeType::Invalid,
        }
    }

    pub fn out(mut self) -> Self {
        self.direction = Direction::Out;
        self
    }

    pub fn inout(mut self) -> Self {
        self.direction = Direction::InOut;
        self
    }

    pub fn transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn caller_allocates(mut self) -> Self {
        self.caller_allocates = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn closure(mut self, index: usize) -> Self {
        self.closure = Some(index);
        self
    }

    pub fn destroy(mut self, index: usize) -> Self {
        self.destroy = Some(index);
        self
    }

    pub fn scope(mut self, scope: ScopeType) -> Self {
        self.scope = scope;
        self
    }

    /// Whether the value travels through a slot of the out-argument block.
    ///
    /// Caller allocated out structs and arrays are passed as plain pointers
    /// to memory the caller provides, so they stay inputs.
    pub fn uses_out_slot(&self) -> bool {
        match self.direction {
            Direction::In => false,
            Direction::InOut => true,
            Direction::Out => !(self.caller_allocates && self.is_aggregate()),
        }
    }

    fn is_aggregate(&self) -> bool {
        self.ty.tag == TypeTag::Array
            || matches!(
                self.ty.interface_kind(),
                Some(InterfaceKind::Struct | InterfaceKind::Union)
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_ownership() {
        assert!(!Transfer::Nothing.owns_container());
        assert!(Transfer::Container.owns_container());
        assert!(!Transfer::Container.owns_elements());
        assert!(Transfer::Everything.owns_elements());
    }

    #[test]
    fn test_argument_builder() {
        let arg = ArgumentDescriptor::new("value", TypeDescriptor::scalar(TypeTag::Int32))
            .out()
            .transfer(Transfer::Everything)
            .caller_allocates();
        assert_eq!(arg.direction, Direction::Out);
        assert!(arg.uses_out_slot());
        assert!(arg.caller_allocates);
    }

    #[test]
    fn test_caller_allocated_struct_stays_input() {
        let rect = ArgumentDescriptor::new("rect", TypeDescriptor::interface(InterfaceKind::Struct, "Rect"))
            .out()
            .caller_allocates();
        assert!(!rect.uses_out_slot());

        let buf = ArgumentDescriptor::new(
            "buf",
            TypeDescriptor::c_array(TypeDescriptor::scalar(TypeTag::UInt8), None, false),
        )
        .out()
        .caller_allocates();
        assert!(!buf.uses_out_slot());

        let inout = ArgumentDescriptor::new("rect", TypeDescriptor::interface(InterfaceKind::Struct, "Rect"))
            .inout()
            .caller_allocates();
        assert!(inout.uses_out_slot());
    }

    #[test]
    fn test_argument_json_defaults() {
        let json = r#"{ "name": "flag", "type": { "tag": "boolean" } }"#;
        let arg: ArgumentDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(arg.direction, Direction::In);
        assert_eq!(arg.transfer, Transfer::Nothing);
        assert_eq!(arg.scope, ScopeType::Invalid);
        assert!(arg.closure.is_none());
    }

    #[test]
    fn test_direction_inout_name() {
        let dir: Direction = serde_json::from_str(r#""inout""#).unwrap();
        assert_eq!(dir, Direction::InOut);
    }
}
