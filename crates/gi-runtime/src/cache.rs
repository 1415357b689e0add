//! Invoker cache
//!
//! Generated functions carry a small integer id assigned at generation time.
//! The first call through an id resolves the native symbol and prepares its
//! invoker; later calls are a read-locked map lookup.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::GiError;
use crate::invoker::Invoker;
use crate::repository::{BaseInfo, InfoRef, InfoType, Repository};
use crate::wrapper::GType;

/// Method search options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindMethodFlags(u32);

impl FindMethodFlags {
    pub const NONE: FindMethodFlags = FindMethodFlags(0);

    /// Skip the direct method query and go from the index hint straight to
    /// the linear scan. Some native introspection libraries crash in that
    /// query for particular container types.
    pub const NO_CALL_FIND: FindMethodFlags = FindMethodFlags(1);

    pub fn contains(self, other: FindMethodFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for FindMethodFlags {
    type Output = FindMethodFlags;

    fn bitor(self, rhs: FindMethodFlags) -> FindMethodFlags {
        FindMethodFlags(self.0 | rhs.0)
    }
}

/// Id-keyed cache of prepared invokers and type ids for one namespace
pub struct InvokerCache {
    namespace: String,
    repo: Arc<dyn Repository>,
    invokers: RwLock<FxHashMap<u32, Invoker>>,
    gtypes: RwLock<FxHashMap<u32, GType>>,
}

impl InvokerCache {
    pub fn new(namespace: impl Into<String>, repo: Arc<dyn Repository>) -> Self {
        Self {
            namespace: namespace.into(),
            repo,
            invokers: RwLock::new(FxHashMap::default()),
            gtypes: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get the invoker of call site `id`, resolving it on first use.
    ///
    /// `name_lv1` names a function or container; for containers `name_lv2`
    /// names the method. Index hints are advisory and re-validated by name.
    #[allow(clippy::too_many_arguments)]
    pub fn get(
        &self,
        id: u32,
        name_lv1: &str,
        name_lv2: &str,
        idx_lv1: usize,
        idx_lv2: usize,
        info_type: InfoType,
        flags: FindMethodFlags,
    ) -> Result<Invoker, GiError> {
        self.get_in(&self.namespace, id, name_lv1, name_lv2, idx_lv1, idx_lv2, info_type, flags)
    }

    /// [`InvokerCache::get`] for a symbol of another namespace
    #[allow(clippy::too_many_arguments)]
    pub fn get_in(
        &self,
        namespace: &str,
        id: u32,
        name_lv1: &str,
        name_lv2: &str,
        idx_lv1: usize,
        idx_lv2: usize,
        info_type: InfoType,
        flags: FindMethodFlags,
    ) -> Result<Invoker, GiError> {
        if let Some(iv) = self.invokers.read().get(&id) {
            return Ok(iv.clone());
        }

        let iv = self.resolve(namespace, name_lv1, name_lv2, idx_lv1, idx_lv2, info_type, flags)?;

        // Concurrent misses on one id may both resolve; the last insert wins
        self.invokers.write().insert(id, iv.clone());
        Ok(iv)
    }

    /// Number of cached invokers
    pub fn len(&self) -> usize {
        self.invokers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.invokers.read().is_empty()
    }

    /// Runtime type id of a registered type, cached under `id`.
    ///
    /// Logs a warning and yields [`GType::INVALID`] when the type cannot be
    /// resolved.
    pub fn gtype(&self, id: u32, type_name: &str) -> GType {
        if let Some(&t) = self.gtypes.read().get(&id) {
            return t;
        }

        let gtype = match self.repo.find_by_name(&self.namespace, type_name) {
            Some(info) => info.gtype().unwrap_or_else(|err| {
                log::warn!("failed to get GType of {}: {}", type_name, err);
                GType::INVALID
            }),
            None => {
                log::warn!(
                    "not found type {:?} in namespace {}",
                    type_name,
                    self.namespace
                );
                GType::INVALID
            }
        };

        if gtype.is_valid() {
            self.gtypes.write().insert(id, gtype);
        }
        gtype
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve(
        &self,
        namespace: &str,
        name_lv1: &str,
        name_lv2: &str,
        idx_lv1: usize,
        idx_lv2: usize,
        info_type: InfoType,
        flags: FindMethodFlags,
    ) -> Result<Invoker, GiError> {
        let info = self.find_info_lv1(namespace, idx_lv1, name_lv1, info_type)?;

        match info_type {
            InfoType::Function => info.prep_invoker(),
            InfoType::Struct | InfoType::Union | InfoType::Object | InfoType::Interface => {
                let method = find_method(&*info, idx_lv2, name_lv2, flags).ok_or_else(|| {
                    GiError::MethodNotFound {
                        method: name_lv2.to_string(),
                        container: name_lv1.to_string(),
                        kind: info_type,
                        namespace: namespace.to_string(),
                    }
                })?;
                method.prep_invoker()
            }
            other => Err(GiError::UnsupportedInfo(other)),
        }
    }

    /// Level-1 lookup: index hint validated by name and kind, then by name
    fn find_info_lv1(
        &self,
        namespace: &str,
        idx: usize,
        name: &str,
        info_type: InfoType,
    ) -> Result<InfoRef<'_>, GiError> {
        if let Some(info) = self.repo.info(namespace, idx) {
            if info.name() == name && info.info_type() == info_type {
                return Ok(info);
            }
            log::debug!(
                "index hint {} of {} points at {}, searching by name",
                idx,
                name,
                info.name()
            );
        }

        match self.repo.find_by_name(namespace, name) {
            Some(info) if info.info_type() == info_type => Ok(info),
            _ => Err(GiError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
        }
    }
}

/// Level-2 lookup: index hint, then direct query, then linear scan
fn find_method<'a>(
    container: &'a dyn BaseInfo,
    idx: usize,
    name: &str,
    flags: FindMethodFlags,
) -> Option<InfoRef<'a>> {
    if let Some(method) = container.method(idx) {
        if method.name() == name {
            return Some(method);
        }
    }

    if !flags.contains(FindMethodFlags::NO_CALL_FIND) {
        if let Some(method) = container.find_method(name) {
            return Some(method);
        }
    }

    (0..container.n_methods())
        .filter_map(|i| container.method(i))
        .find(|m| m.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRepository, SymbolTable};
    use gi_types::{
        ContainerDescriptor, FunctionDescriptor, InfoDescriptor, NamespaceDescriptor,
        TypeDescriptor, TypeTag,
    };
    use std::ffi::c_void;

    extern "C" fn answer() -> i32 {
        42
    }

    fn namespace() -> NamespaceDescriptor {
        let int32 = TypeDescriptor::scalar(TypeTag::Int32);
        NamespaceDescriptor::new("Demo", "1.0")
            .info(InfoDescriptor::Function(
                FunctionDescriptor::new("answer", "demo_answer").returns(int32.clone()),
            ))
            .info(InfoDescriptor::Struct(
                ContainerDescriptor::new("Box")
                    .method(FunctionDescriptor::new("first", "demo_answer").returns(int32.clone()))
                    .method(FunctionDescriptor::new("second", "demo_answer").returns(int32)),
            ))
    }

    fn fixture() -> (Arc<MemoryRepository>, InvokerCache) {
        let symbols = SymbolTable::new().with("demo_answer", answer as *const c_void);
        let repo = Arc::new(MemoryRepository::new(Arc::new(symbols)).with_namespace(namespace()));
        let cache = InvokerCache::new("Demo", repo.clone());
        (repo, cache)
    }

    #[test]
    fn test_second_get_does_not_resolve() {
        let (repo, cache) = fixture();
        cache
            .get(0, "answer", "", 0, 0, InfoType::Function, FindMethodFlags::NONE)
            .unwrap();
        let after_first = repo.lookups();
        assert!(after_first > 0);

        cache
            .get(0, "answer", "", 0, 0, InfoType::Function, FindMethodFlags::NONE)
            .unwrap();
        assert_eq!(repo.lookups(), after_first);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_index_hint_falls_back_to_name() {
        let (_repo, cache) = fixture();
        // Index 1 is the struct, not the function
        let iv = cache
            .get(3, "answer", "", 1, 0, InfoType::Function, FindMethodFlags::NONE)
            .unwrap();
        assert_eq!(iv.symbol(), "demo_answer");
    }

    #[test]
    fn test_out_of_range_hint() {
        let (_repo, cache) = fixture();
        assert!(cache
            .get(4, "answer", "", 99, 0, InfoType::Function, FindMethodFlags::NONE)
            .is_ok());
    }

    #[test]
    fn test_method_hint_mismatch_uses_direct_query() {
        let (repo, cache) = fixture();
        cache
            .get(1, "Box", "second", 1, 0, InfoType::Struct, FindMethodFlags::NONE)
            .unwrap();
        assert_eq!(repo.find_method_calls(), 1);
    }

    #[test]
    fn test_no_call_find_uses_linear_scan() {
        let (repo, cache) = fixture();
        cache
            .get(2, "Box", "second", 1, 0, InfoType::Struct, FindMethodFlags::NO_CALL_FIND)
            .unwrap();
        assert_eq!(repo.find_method_calls(), 0);
    }

    #[test]
    fn test_correct_method_hint() {
        let (repo, cache) = fixture();
        cache
            .get(5, "Box", "second", 1, 1, InfoType::Struct, FindMethodFlags::NONE)
            .unwrap();
        assert_eq!(repo.find_method_calls(), 0);
    }

    #[test]
    fn test_missing_symbol_errors() {
        let (repo, cache) = fixture();
        let err = cache
            .get(6, "nope", "", 0, 0, InfoType::Function, FindMethodFlags::NONE)
            .unwrap_err();
        assert_eq!(err.to_string(), "not found \"nope\" in namespace Demo");

        let err = cache
            .get(7, "Box", "third", 1, 0, InfoType::Struct, FindMethodFlags::NONE)
            .unwrap_err();
        assert!(matches!(err, GiError::MethodNotFound { .. }));
        assert!(cache.is_empty());
        assert_eq!(repo.live_infos(), 0);
    }

    #[test]
    fn test_kind_mismatch_is_not_found() {
        let (_repo, cache) = fixture();
        let err = cache
            .get(8, "Box", "", 1, 0, InfoType::Function, FindMethodFlags::NONE)
            .unwrap_err();
        assert!(matches!(err, GiError::NotFound { .. }));
    }

    #[test]
    fn test_info_type_must_match() {
        let (_repo, cache) = fixture();
        let err = cache
            .get(9, "answer", "", 0, 0, InfoType::Enum, FindMethodFlags::NONE)
            .unwrap_err();
        assert!(matches!(err, GiError::NotFound { .. }));
    }

    #[test]
    fn test_unknown_gtype() {
        let (_repo, cache) = fixture();
        assert_eq!(cache.gtype(0, "Missing"), GType::INVALID);
        assert_eq!(cache.gtype(1, "Box"), GType::INVALID);
    }

    #[test]
    fn test_flags() {
        let all = FindMethodFlags::NONE | FindMethodFlags::NO_CALL_FIND;
        assert!(all.contains(FindMethodFlags::NO_CALL_FIND));
        assert!(!FindMethodFlags::NONE.contains(FindMethodFlags::NO_CALL_FIND));
    }

    #[test]
    fn test_concurrent_gets_share_result() {
        let (_repo, cache) = fixture();
        let cache = Arc::new(cache);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache
                        .get(0, "answer", "", 0, 0, InfoType::Function, FindMethodFlags::NONE)
                        .map(|iv| iv.symbol().to_string())
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), "demo_answer");
        }
        assert_eq!(cache.len(), 1);
    }
}
