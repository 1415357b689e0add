//! Generated bindings of the `Demo` namespace
//!
//! `build.rs` runs girgen over `gir/Demo-1.0.json`; the natives in
//! [`native`] play the role of the C library, resolved through an in-memory
//! repository.

use std::sync::Arc;

use gi::gi_types::{DescriptorError, NamespaceDescriptor};
use gi::MemoryRepository;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

pub mod native;

#[allow(dead_code, unused_mut, unused_variables, deprecated, clippy::all)]
pub mod demo {
    include!(concat!(env!("OUT_DIR"), "/demo.rs"));
}

/// Namespace descriptor the bindings were generated from
pub const DEMO_GIR: &str = include_str!("../gir/Demo-1.0.json");

static VISITED: Mutex<Vec<i32>> = Mutex::new(Vec::new());

/// Handler of the manual `Visitor` callback: keeps going below 3
fn handle_visitor(value: i32) -> i32 {
    VISITED.lock().push(value);
    gi::bool_to_int(value < 3)
}

/// Values seen by the `Visitor` handler so far
pub fn visited() -> Vec<i32> {
    VISITED.lock().clone()
}

/// Initialize the bindings once
pub fn setup() -> Result<&'static gi::Context, DescriptorError> {
    static CTX: OnceCell<&'static gi::Context> = OnceCell::new();
    CTX.get_or_try_init(|| {
        let namespace = NamespaceDescriptor::from_json(DEMO_GIR)?;
        let repo = MemoryRepository::new(Arc::new(native::symbols())).with_namespace(namespace);
        log::debug!("initializing Demo bindings");
        Ok(demo::init(Arc::new(repo)))
    })
    .copied()
}
