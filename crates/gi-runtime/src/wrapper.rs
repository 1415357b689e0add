//! Instance wrappers and dynamic object downcasting
//!
//! Generated struct, union, object and interface types are thin wrappers over
//! an instance pointer. Object pointers returned by native code are wrapped
//! through a [`WrapperRegistry`], which reads the runtime `GType` stored in
//! the instance and picks the most derived registered wrapper.

use std::any::Any;
use std::ffi::c_void;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Native runtime type id
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct GType(pub usize);

impl GType {
    pub const INVALID: GType = GType(0);

    pub fn is_valid(self) -> bool {
        self != GType::INVALID
    }
}

/// Any generated instance wrapper
pub trait Wrapper {
    /// Wrap a native instance pointer
    fn from_ptr(p: *mut c_void) -> Self
    where
        Self: Sized;

    /// The native instance pointer
    fn as_ptr(&self) -> *mut c_void;
}

/// An object wrapper whose concrete type is chosen at runtime
pub trait ObjectWrapper: Any {
    fn as_ptr(&self) -> *mut c_void;

    /// Concrete wrapper for `downcast_ref`
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete wrapper type
    fn type_name(&self) -> &'static str;
}

/// Dynamically typed object wrapper
pub type DynObject = Box<dyn ObjectWrapper>;

/// Constructor registered for a `GType`
pub type WrapFn = fn(*mut c_void) -> DynObject;

#[repr(C)]
struct GTypeClass {
    g_type: GType,
}

#[repr(C)]
struct GTypeInstance {
    g_class: *mut GTypeClass,
}

/// Read the runtime `GType` of an instance
///
/// # Safety
///
/// `p` must be null or point to a live `GTypeInstance`.
pub unsafe fn instance_gtype(p: *mut c_void) -> GType {
    if p.is_null() {
        return GType::INVALID;
    }
    let class = (*(p as *mut GTypeInstance)).g_class;
    if class.is_null() {
        return GType::INVALID;
    }
    (*class).g_type
}

/// Native `g_type_parent`
pub type ParentFn = unsafe extern "C" fn(GType) -> GType;

/// Maps object `GType`s to wrapper constructors
#[derive(Default)]
pub struct WrapperRegistry {
    entries: RwLock<FxHashMap<GType, WrapFn>>,
    parent_of: RwLock<Option<ParentFn>>,
}

impl WrapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the wrapper constructor of `gtype`
    pub fn register(&self, gtype: GType, wrap: WrapFn) {
        if !gtype.is_valid() {
            log::debug!("ignoring wrapper registration for invalid GType");
            return;
        }
        self.entries.write().insert(gtype, wrap);
    }

    /// Install the parent lookup used for unregistered subclasses
    pub fn set_parent_lookup(&self, parent_of: ParentFn) {
        *self.parent_of.write() = Some(parent_of);
    }

    pub fn contains(&self, gtype: GType) -> bool {
        self.entries.read().contains_key(&gtype)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Wrap `p` with the constructor of its most derived registered class.
    ///
    /// Returns `None` for null. Falls back to `fallback`, the statically
    /// declared type, when no class of the instance is registered.
    ///
    /// # Safety
    ///
    /// `p` must be null or point to a live `GTypeInstance`.
    pub unsafe fn wrap(&self, p: *mut c_void, fallback: WrapFn) -> Option<DynObject> {
        if p.is_null() {
            return None;
        }
        let wrap = self.resolve(instance_gtype(p)).unwrap_or(fallback);
        Some(wrap(p))
    }

    fn resolve(&self, mut gtype: GType) -> Option<WrapFn> {
        let entries = self.entries.read();
        let parent_of = *self.parent_of.read();
        while gtype.is_valid() {
            if let Some(wrap) = entries.get(&gtype) {
                return Some(*wrap);
            }
            // Fundamental types have the invalid type as parent
            gtype = match parent_of {
                Some(parent_of) => unsafe { parent_of(gtype) },
                None => GType::INVALID,
            };
        }
        None
    }
}

macro_rules! pointer_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            pub p: *mut c_void,
        }

        impl Default for $name {
            fn default() -> Self {
                Self { p: std::ptr::null_mut() }
            }
        }

        impl Wrapper for $name {
            fn from_ptr(p: *mut c_void) -> Self {
                Self { p }
            }

            fn as_ptr(&self) -> *mut c_void {
                self.p
            }
        }
    };
}

pointer_wrapper!(
    /// `GList*`
    List
);
pointer_wrapper!(
    /// `GSList*`
    SList
);
pointer_wrapper!(
    /// `GHashTable*`
    HashTable
);

/// Placeholder for a type the generator could not map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Todo;

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECT: GType = GType(10);
    const WIDGET: GType = GType(20);
    const BUTTON: GType = GType(30);
    const PRIVATE_BUTTON: GType = GType(40);

    unsafe extern "C" fn parent_of(t: GType) -> GType {
        match t.0 {
            40 => BUTTON,
            30 => WIDGET,
            20 => OBJECT,
            _ => GType::INVALID,
        }
    }

    struct Widget(*mut c_void);
    struct Button(*mut c_void);

    impl ObjectWrapper for Widget {
        fn as_ptr(&self) -> *mut c_void {
            self.0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn type_name(&self) -> &'static str {
            "Widget"
        }
    }

    impl ObjectWrapper for Button {
        fn as_ptr(&self) -> *mut c_void {
            self.0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn type_name(&self) -> &'static str {
            "Button"
        }
    }

    fn wrap_widget(p: *mut c_void) -> DynObject {
        Box::new(Widget(p))
    }

    fn wrap_button(p: *mut c_void) -> DynObject {
        Box::new(Button(p))
    }

    /// Instance and class allocations kept alive together
    struct FakeInstance {
        _class: Box<GTypeClass>,
        instance: Box<GTypeInstance>,
    }

    impl FakeInstance {
        fn new(gtype: GType) -> Self {
            let mut class = Box::new(GTypeClass { g_type: gtype });
            let instance = Box::new(GTypeInstance {
                g_class: &mut *class as *mut GTypeClass,
            });
            Self {
                _class: class,
                instance,
            }
        }

        fn ptr(&mut self) -> *mut c_void {
            &mut *self.instance as *mut GTypeInstance as *mut c_void
        }
    }

    #[test]
    fn test_instance_gtype() {
        let mut inst = FakeInstance::new(BUTTON);
        assert_eq!(unsafe { instance_gtype(inst.ptr()) }, BUTTON);
        assert_eq!(unsafe { instance_gtype(std::ptr::null_mut()) }, GType::INVALID);
    }

    #[test]
    fn test_wrap_picks_dynamic_type() {
        let registry = WrapperRegistry::new();
        registry.register(WIDGET, wrap_widget);
        registry.register(BUTTON, wrap_button);

        let mut inst = FakeInstance::new(BUTTON);
        let obj = unsafe { registry.wrap(inst.ptr(), wrap_widget) }.unwrap();
        assert_eq!(obj.type_name(), "Button");
        assert!(obj.as_any().downcast_ref::<Button>().is_some());
        assert_eq!(obj.as_ptr(), inst.ptr());
    }

    #[test]
    fn test_wrap_walks_parents() {
        let registry = WrapperRegistry::new();
        registry.register(WIDGET, wrap_widget);
        registry.register(BUTTON, wrap_button);
        registry.set_parent_lookup(parent_of);

        let mut inst = FakeInstance::new(PRIVATE_BUTTON);
        let obj = unsafe { registry.wrap(inst.ptr(), wrap_widget) }.unwrap();
        assert_eq!(obj.type_name(), "Button");
    }

    #[test]
    fn test_wrap_falls_back_to_static_type() {
        let registry = WrapperRegistry::new();
        registry.register(BUTTON, wrap_button);

        let mut inst = FakeInstance::new(PRIVATE_BUTTON);
        let obj = unsafe { registry.wrap(inst.ptr(), wrap_widget) }.unwrap();
        assert_eq!(obj.type_name(), "Widget");
    }

    #[test]
    fn test_wrap_null() {
        let registry = WrapperRegistry::new();
        assert!(unsafe { registry.wrap(std::ptr::null_mut(), wrap_widget) }.is_none());
    }

    #[test]
    fn test_invalid_gtype_not_registered() {
        let registry = WrapperRegistry::new();
        registry.register(GType::INVALID, wrap_widget);
        assert!(registry.is_empty());
    }
}
