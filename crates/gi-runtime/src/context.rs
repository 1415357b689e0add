//! Per-namespace runtime context
//!
//! Generated bindings reach the invoker cache, the closure registry and the
//! wrapper registry through one [`Context`]. Each generated file declares a
//! `static` [`ContextCell`] that the embedding program initializes with the
//! repository to resolve symbols from; tests build fresh contexts directly.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::cache::{FindMethodFlags, InvokerCache};
use crate::closure::ClosureRegistry;
use crate::error::GiError;
use crate::invoker::Invoker;
use crate::repository::{InfoType, Repository};
use crate::wrapper::WrapperRegistry;

/// Shared runtime state of one namespace binding
pub struct Context {
    pub invokers: InvokerCache,
    pub closures: ClosureRegistry,
    pub wrappers: WrapperRegistry,
}

impl Context {
    pub fn new(namespace: impl Into<String>, repo: Arc<dyn Repository>) -> Self {
        Self {
            invokers: InvokerCache::new(namespace, repo),
            closures: ClosureRegistry::new(),
            wrappers: WrapperRegistry::new(),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("namespace", &self.invokers.namespace())
            .field("invokers", &self.invokers.len())
            .field("closures", &self.closures.len())
            .field("wrappers", &self.wrappers.len())
            .finish()
    }
}

/// Lazily initialized process-wide [`Context`]
pub struct ContextCell {
    namespace: &'static str,
    cell: OnceCell<Context>,
}

impl ContextCell {
    pub const fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            cell: OnceCell::new(),
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Install the context; later calls keep the first repository
    pub fn init(&self, repo: Arc<dyn Repository>) -> &Context {
        if self.cell.get().is_some() {
            log::warn!("namespace {} is already initialized", self.namespace);
        }
        self.cell.get_or_init(|| Context::new(self.namespace, repo))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<&Context, GiError> {
        self.cell
            .get()
            .ok_or_else(|| GiError::Uninitialized(self.namespace.to_string()))
    }

    /// Context and invoker of a call site in one step
    #[allow(clippy::too_many_arguments)]
    pub fn invoker(
        &self,
        id: u32,
        name_lv1: &str,
        name_lv2: &str,
        idx_lv1: usize,
        idx_lv2: usize,
        info_type: InfoType,
        flags: FindMethodFlags,
    ) -> Result<(&Context, Invoker), GiError> {
        let ctx = self.get()?;
        let iv = ctx
            .invokers
            .get(id, name_lv1, name_lv2, idx_lv1, idx_lv2, info_type, flags)?;
        Ok((ctx, iv))
    }
}
