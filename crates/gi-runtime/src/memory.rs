//! In-memory repository built from namespace descriptors
//!
//! Serves the same queries as native introspection data, resolving function
//! pointers through a [`SymbolResolver`]. It also counts lookups and live
//! info handles, which tests use to observe caching and handle release.

use std::ffi::c_void;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;

use gi_types::{ContainerDescriptor, FunctionDescriptor, InfoDescriptor, NamespaceDescriptor};
use rustc_hash::FxHashMap;

use crate::error::GiError;
use crate::invoker::Invoker;
use crate::loader::{Library, LoadError};
use crate::repository::{BaseInfo, InfoRef, InfoType, Repository};
use crate::wrapper::GType;

/// Maps native symbol names to addresses
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, symbol: &str) -> Result<*mut c_void, LoadError>;
}

impl SymbolResolver for Library {
    fn resolve(&self, symbol: &str) -> Result<*mut c_void, LoadError> {
        self.symbol(symbol)
    }
}

/// Explicit symbol table, for functions linked into the host program
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: FxHashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, addr: *const c_void) {
        self.symbols.insert(symbol.into(), addr as usize);
    }

    /// Builder form of [`SymbolTable::insert`]
    pub fn with(mut self, symbol: impl Into<String>, addr: *const c_void) -> Self {
        self.insert(symbol, addr);
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, symbol: &str) -> Result<*mut c_void, LoadError> {
        self.symbols
            .get(symbol)
            .map(|&addr| addr as *mut c_void)
            .ok_or_else(|| LoadError::SymbolNotFound {
                symbol: symbol.to_string(),
                library: "<symbol table>".to_string(),
            })
    }
}

#[derive(Debug, Default)]
struct Counters {
    lookups: AtomicUsize,
    find_method_calls: AtomicUsize,
    live_infos: AtomicIsize,
}

/// Repository over [`NamespaceDescriptor`]s
pub struct MemoryRepository {
    namespaces: FxHashMap<String, NamespaceDescriptor>,
    resolver: Arc<dyn SymbolResolver>,
    counters: Counters,
}

impl MemoryRepository {
    pub fn new(resolver: Arc<dyn SymbolResolver>) -> Self {
        Self {
            namespaces: FxHashMap::default(),
            resolver,
            counters: Counters::default(),
        }
    }

    pub fn with_namespace(mut self, namespace: NamespaceDescriptor) -> Self {
        self.add_namespace(namespace);
        self
    }

    pub fn add_namespace(&mut self, namespace: NamespaceDescriptor) {
        self.namespaces.insert(namespace.namespace.clone(), namespace);
    }

    pub fn namespace(&self, name: &str) -> Option<&NamespaceDescriptor> {
        self.namespaces.get(name)
    }

    /// Number of metadata queries served so far
    pub fn lookups(&self) -> usize {
        self.counters.lookups.load(Ordering::SeqCst)
    }

    /// Number of direct method queries served so far
    pub fn find_method_calls(&self) -> usize {
        self.counters.find_method_calls.load(Ordering::SeqCst)
    }

    /// Info handles handed out and not yet dropped
    pub fn live_infos(&self) -> isize {
        self.counters.live_infos.load(Ordering::SeqCst)
    }

    fn count_lookup(&self) {
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);
    }

    fn call_type_init(&self, type_init: Option<&str>) -> Result<GType, GiError> {
        let Some(symbol) = type_init else {
            return Ok(GType::INVALID);
        };
        let addr = self.resolver.resolve(symbol)?;
        let get_type: unsafe extern "C" fn() -> GType = unsafe { std::mem::transmute(addr) };
        Ok(unsafe { get_type() })
    }
}

impl Repository for MemoryRepository {
    fn n_infos(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map_or(0, |ns| ns.infos.len())
    }

    fn info(&self, namespace: &str, index: usize) -> Option<InfoRef<'_>> {
        self.count_lookup();
        let info = self.namespaces.get(namespace)?.infos.get(index)?;
        Some(Box::new(MemoryInfo::new(self, Node::Top(info))))
    }

    fn find_by_name(&self, namespace: &str, name: &str) -> Option<InfoRef<'_>> {
        self.count_lookup();
        let (_, info) = self.namespaces.get(namespace)?.find(name)?;
        Some(Box::new(MemoryInfo::new(self, Node::Top(info))))
    }
}

#[derive(Clone, Copy)]
enum Node<'a> {
    Top(&'a InfoDescriptor),
    Method(&'a FunctionDescriptor),
}

struct MemoryInfo<'a> {
    repo: &'a MemoryRepository,
    node: Node<'a>,
}

impl<'a> MemoryInfo<'a> {
    fn new(repo: &'a MemoryRepository, node: Node<'a>) -> Self {
        repo.counters.live_infos.fetch_add(1, Ordering::SeqCst);
        Self { repo, node }
    }

    fn container(&self) -> Option<&'a ContainerDescriptor> {
        match self.node {
            Node::Top(info) => info.as_container(),
            Node::Method(_) => None,
        }
    }

    fn function(&self) -> Option<&'a FunctionDescriptor> {
        match self.node {
            Node::Top(info) => info.as_function(),
            Node::Method(func) => Some(func),
        }
    }
}

impl Drop for MemoryInfo<'_> {
    fn drop(&mut self) {
        self.repo.counters.live_infos.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BaseInfo for MemoryInfo<'_> {
    fn name(&self) -> &str {
        match self.node {
            Node::Top(info) => info.name(),
            Node::Method(func) => &func.name,
        }
    }

    fn info_type(&self) -> InfoType {
        match self.node {
            Node::Method(_) => InfoType::Function,
            Node::Top(info) => match info {
                InfoDescriptor::Function(_) => InfoType::Function,
                InfoDescriptor::Callback(_) => InfoType::Callback,
                InfoDescriptor::Struct(_) => InfoType::Struct,
                InfoDescriptor::Union(_) => InfoType::Union,
                InfoDescriptor::Object(_) => InfoType::Object,
                InfoDescriptor::Interface(_) => InfoType::Interface,
                InfoDescriptor::Enum(_) => InfoType::Enum,
                InfoDescriptor::Flags(_) => InfoType::Flags,
                InfoDescriptor::Constant(_) => InfoType::Constant,
            },
        }
    }

    fn n_methods(&self) -> usize {
        self.container().map_or(0, |c| c.methods.len())
    }

    fn method(&self, index: usize) -> Option<InfoRef<'_>> {
        self.repo.count_lookup();
        let func = self.container()?.methods.get(index)?;
        Some(Box::new(MemoryInfo::new(self.repo, Node::Method(func))))
    }

    fn find_method(&self, name: &str) -> Option<InfoRef<'_>> {
        self.repo.count_lookup();
        self.repo
            .counters
            .find_method_calls
            .fetch_add(1, Ordering::SeqCst);
        let (_, func) = self.container()?.find_method(name)?;
        Some(Box::new(MemoryInfo::new(self.repo, Node::Method(func))))
    }

    fn prep_invoker(&self) -> Result<Invoker, GiError> {
        let func = self
            .function()
            .ok_or_else(|| GiError::UnsupportedInfo(self.info_type()))?;
        let addr = self.repo.resolver.resolve(&func.symbol)?;
        Invoker::prepare(func, addr)
    }

    fn gtype(&self) -> Result<GType, GiError> {
        let type_init = match self.node {
            Node::Top(InfoDescriptor::Enum(e)) | Node::Top(InfoDescriptor::Flags(e)) => {
                e.type_init.as_deref()
            }
            Node::Top(info) => info.as_container().and_then(|c| c.type_init.as_deref()),
            Node::Method(_) => None,
        };
        self.repo.call_type_init(type_init)
    }
}
