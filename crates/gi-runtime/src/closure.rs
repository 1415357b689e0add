//! Closure registry
//!
//! Host callbacks handed to native code are stored here under an integer
//! handle. The handle travels through native code as the callback's user
//! data, and the generated trampoline looks the callback up again when the
//! native side calls back.

use std::any::Any;
use std::ffi::c_void;
use std::sync::Arc;

use gi_types::ScopeType;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Token standing in for a registered host callback
pub type Handle = usize;

/// Lifetime policy of a registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    Invalid,
    /// Removed right after the native call returns
    Call,
    /// Removed after the first invocation or by a destroy notify
    Async,
    /// Removed only on explicit unregistration
    Notified,
}

impl From<ScopeType> for Scope {
    fn from(scope: ScopeType) -> Self {
        match scope {
            ScopeType::Invalid => Scope::Invalid,
            ScopeType::Call => Scope::Call,
            ScopeType::Async => Scope::Async,
            ScopeType::Notified => Scope::Notified,
        }
    }
}

/// A registered callable and its scope; the default value is empty
#[derive(Clone, Default)]
pub struct Closure {
    callable: Option<Arc<dyn Any + Send + Sync>>,
    scope: Scope,
}

impl std::fmt::Debug for Closure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Closure")
            .field("empty", &self.is_empty())
            .field("scope", &self.scope)
            .finish()
    }
}

impl Closure {
    pub fn new<F: Any + Send + Sync>(callable: F, scope: Scope) -> Self {
        Self {
            callable: Some(Arc::new(callable)),
            scope,
        }
    }

    /// True for a lookup miss
    pub fn is_empty(&self) -> bool {
        self.callable.is_none()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The stored callable if it has type `F`
    pub fn callable<F: Any>(&self) -> Option<&F> {
        self.callable.as_deref().and_then(|c| c.downcast_ref::<F>())
    }
}

struct RegistryInner {
    next_id: Handle,
    closures: FxHashMap<Handle, Closure>,
}

/// Handle to closure map shared by every trampoline of a binding
pub struct ClosureRegistry {
    inner: RwLock<RegistryInner>,
}

impl Default for ClosureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClosureRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                next_id: 0,
                closures: FxHashMap::default(),
            }),
        }
    }

    /// Store `callable` and return its handle; handles start at 1 and are never reused
    pub fn register<F: Any + Send + Sync>(&self, callable: F, scope: Scope) -> Handle {
        let closure = Closure::new(callable, scope);
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.closures.insert(id, closure);
        id
    }

    /// Remove a handle; unknown handles are ignored
    pub fn unregister(&self, handle: Handle) -> bool {
        self.inner.write().closures.remove(&handle).is_some()
    }

    /// Look up a handle; unknown handles yield an empty closure
    pub fn get(&self, handle: Handle) -> Closure {
        self.inner
            .read()
            .closures
            .get(&handle)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.inner.read().closures.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.inner.read().closures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().closures.is_empty()
    }
}

/// Recover a handle passed through native user data
pub fn handle_from_ptr(p: *mut c_void) -> Handle {
    p as Handle
}

/// Encode a handle as native user data
pub fn handle_to_ptr(handle: Handle) -> *mut c_void {
    handle as *mut c_void
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Callback = Box<dyn Fn(i32) -> i32 + Send + Sync>;

    #[test]
    fn test_register_and_get() {
        let registry = ClosureRegistry::new();
        let cb: Callback = Box::new(|x| x * 2);
        let h = registry.register(cb, Scope::Notified);
        assert_eq!(h, 1);

        let closure = registry.get(h);
        assert!(!closure.is_empty());
        assert_eq!(closure.scope(), Scope::Notified);
        let f = closure.callable::<Callback>().unwrap();
        assert_eq!(f(21), 42);
    }

    #[test]
    fn test_call_scope_leaves_registry_empty() {
        let registry = ClosureRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let calls = Arc::clone(&calls);
            let cb: Callback = Box::new(move |x| {
                calls.fetch_add(1, Ordering::SeqCst);
                x
            });
            handles.push(registry.register(cb, Scope::Call));
        }
        for &h in &handles {
            let closure = registry.get(h);
            closure.callable::<Callback>().unwrap()(0);
            assert!(registry.unregister(h));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 8);
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_notified_scope_persists() {
        let registry = ClosureRegistry::new();
        let cb: Callback = Box::new(|x| x);
        let h = registry.register(cb, Scope::Notified);
        for _ in 0..3 {
            let closure = registry.get(h);
            closure.callable::<Callback>().unwrap()(1);
        }
        assert!(registry.contains(h));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stale_handle_is_empty() {
        let registry = ClosureRegistry::new();
        let h = registry.register(7u32, Scope::Async);
        assert!(registry.unregister(h));
        assert!(!registry.unregister(h));
        let closure = registry.get(h);
        assert!(closure.is_empty());
        assert!(closure.callable::<u32>().is_none());
        assert!(registry.get(9999).is_empty());
    }

    #[test]
    fn test_handles_are_not_reused() {
        let registry = ClosureRegistry::new();
        let a = registry.register((), Scope::Call);
        registry.unregister(a);
        let b = registry.register((), Scope::Call);
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_type_downcast() {
        let registry = ClosureRegistry::new();
        let h = registry.register(5i64, Scope::Call);
        assert!(registry.get(h).callable::<i32>().is_none());
        assert_eq!(registry.get(h).callable::<i64>(), Some(&5));
    }

    #[test]
    fn test_handle_pointer_round_trip() {
        assert_eq!(handle_from_ptr(handle_to_ptr(77)), 77);
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(ClosureRegistry::new());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|i| registry.register(i, Scope::Notified))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<Handle> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(registry.len(), 400);
    }
}
