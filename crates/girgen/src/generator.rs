//! Namespace to source file
//!
//! Walks the infos of a namespace in order and emits one block per item.
//! Function ids and `get_type` ids are assigned in walk order, starting from
//! the counters left by the previous run so that namespaces compiled into the
//! same program never share an id.

use gi_types::{InfoDescriptor, InterfaceKind, NamespaceDescriptor};
use rustc_hash::FxHashMap;

use crate::callback::{self, CallbackKind};
use crate::codec::TypeNames;
use crate::config::Config;
use crate::function::{self, CallSite};
use crate::source::{pn, SourceBlock, SourceFile};
use crate::stats::Stats;
use crate::types::{self, ContainerKind};

/// Everything emitters need to know about the namespace being generated
pub struct Env<'a> {
    pub names: TypeNames<'a>,
    pub config: &'a Config,
    /// Binding of every callback type of the namespace
    pub callbacks: FxHashMap<String, CallbackKind>,
}

impl<'a> Env<'a> {
    pub fn new(namespace: &'a NamespaceDescriptor, config: &'a Config) -> Self {
        let names = TypeNames::new(namespace, config);
        let callbacks = namespace
            .infos
            .iter()
            .filter_map(|info| match info {
                InfoDescriptor::Callback(cb) => {
                    Some((cb.name.clone(), callback::classify(&names, config, cb)))
                }
                _ => None,
            })
            .collect();
        Self {
            names,
            config,
            callbacks,
        }
    }
}

/// Result of one generator run
#[derive(Debug)]
pub struct Generated {
    pub file: SourceFile,
    pub stats: Stats,
    pub func_next_id: u32,
    pub get_type_next_id: u32,
}

pub struct Generator<'a> {
    namespace: &'a NamespaceDescriptor,
    config: &'a Config,
    func_next_id: u32,
    get_type_next_id: u32,
}

impl<'a> Generator<'a> {
    pub fn new(namespace: &'a NamespaceDescriptor, config: &'a Config) -> Self {
        Self {
            namespace,
            config,
            func_next_id: 0,
            get_type_next_id: 0,
        }
    }

    /// Continue the id sequences of an earlier run
    pub fn with_ids(mut self, func_next_id: u32, get_type_next_id: u32) -> Self {
        self.func_next_id = func_next_id;
        self.get_type_next_id = get_type_next_id;
        self
    }

    pub fn generate(mut self) -> Generated {
        let env = Env::new(self.namespace, self.config);
        let mut stats = Stats::default();
        let mut items = Vec::new();
        let mut wrapped_objects = Vec::new();

        let namespace = self.namespace;
        for (idx, info) in namespace.infos.iter().enumerate() {
            match info {
                InfoDescriptor::Function(func) => {
                    items.push(self.function(&env, &mut stats, func, idx, 0, None));
                }
                InfoDescriptor::Callback(cb) => {
                    if let Some(kind) = env.callbacks.get(&cb.name) {
                        items.push(callback::emit(&env.names, cb, kind));
                    }
                }
                InfoDescriptor::Struct(_)
                | InfoDescriptor::Union(_)
                | InfoDescriptor::Object(_)
                | InfoDescriptor::Interface(_) => {
                    let Some((c, kind)) = ContainerKind::of(info) else {
                        continue;
                    };
                    if let Some(reason) = self.ignored_struct(c.name.as_str(), c.methods.len(), kind) {
                        let mut b = SourceBlock::new();
                        pn!(b, "// ignore {}", reason);
                        items.push(b);
                        continue;
                    }
                    let get_type_id = self.get_type_id(&c.name, c.type_init.is_some());
                    if kind == ContainerKind::Object && get_type_id.is_some() {
                        wrapped_objects.push(c.name.clone());
                    }
                    items.push(types::emit_container(&env.names, c, kind, get_type_id));
                    for (method_idx, method) in c.methods.iter().enumerate() {
                        items.push(self.function(&env, &mut stats, method, idx, method_idx, Some((c, kind))));
                    }
                }
                InfoDescriptor::Enum(e) | InfoDescriptor::Flags(e) => {
                    let get_type_id = self.get_type_id(&e.name, e.type_init.is_some());
                    let is_flags = matches!(info, InfoDescriptor::Flags(_));
                    items.push(types::emit_enum(e, is_flags, get_type_id));
                }
                InfoDescriptor::Constant(c) => items.push(types::emit_constant(c)),
            }
        }

        let mut file = SourceFile::new();
        file.push(self.context_block());
        file.push(init_block(&self.namespace.namespace, &wrapped_objects));
        file.push(callback::emit_destroy_notify());
        for item in items {
            file.push(item);
        }

        log::info!("{} {}", self.namespace.namespace, stats);
        Generated {
            file,
            stats,
            func_next_id: self.func_next_id,
            get_type_next_id: self.get_type_next_id,
        }
    }

    fn function(
        &mut self,
        env: &Env<'_>,
        stats: &mut Stats,
        func: &gi_types::FunctionDescriptor,
        idx_lv1: usize,
        idx_lv2: usize,
        container: Option<(&gi_types::ContainerDescriptor, ContainerKind)>,
    ) -> SourceBlock {
        let id = self.func_next_id;
        self.func_next_id += 1;

        let identity = function::identify(func, container.map(|(c, _)| c));
        if self.config.is_black(&identity) {
            let mut b = SourceBlock::new();
            pn!(b, "// black function {}", identity);
            return b;
        }
        let site = CallSite {
            id,
            idx_lv1,
            idx_lv2,
            container,
        };
        let block = function::emit(env, func, site);
        stats.record(&block);
        block
    }

    /// Take the next `get_type` id; types without a type init function or
    /// listed in `noGetType` consume one without getting a function
    fn get_type_id(&mut self, name: &str, has_type_init: bool) -> Option<u32> {
        let id = self.get_type_next_id;
        self.get_type_next_id += 1;
        if !has_type_init || self.config.skips_get_type(name) {
            log::debug!("no get_type for {}", name);
            return None;
        }
        Some(id)
    }

    /// Method-less `FooClass` and `FooPrivate` structs of an existing `Foo`
    fn ignored_struct(&self, name: &str, n_methods: usize, kind: ContainerKind) -> Option<String> {
        if kind != ContainerKind::Struct || n_methods > 0 {
            return None;
        }
        for (suffix, what) in [("Private", "private"), ("Class", "class")] {
            let Some(owner) = name.strip_suffix(suffix) else {
                continue;
            };
            if let Some(kind) = self.namespace.kind_of(owner) {
                return Some(format!("{} struct {}, type of {} is {}", what, name, owner, kind_name(kind)));
            }
        }
        None
    }

    fn context_block(&self) -> SourceBlock {
        let mut b = SourceBlock::new();
        pn!(
            b,
            "static CONTEXT: gi::ContextCell = gi::ContextCell::new({:?});",
            self.namespace.namespace
        );
        b
    }
}

fn kind_name(kind: InterfaceKind) -> &'static str {
    match kind {
        InterfaceKind::Struct => "struct",
        InterfaceKind::Union => "union",
        InterfaceKind::Object => "object",
        InterfaceKind::Interface => "interface",
        InterfaceKind::Enum => "enum",
        InterfaceKind::Flags => "flags",
        InterfaceKind::Callback => "callback",
        InterfaceKind::Unresolved => "unresolved",
    }
}

fn init_block(namespace: &str, wrapped_objects: &[String]) -> SourceBlock {
    let mut b = SourceBlock::new();
    pn!(b, "/// Initialize the `{}` binding with the repository resolving its symbols", namespace);
    b.open("pub fn init(repo: Arc<dyn gi::Repository>/*use:std::sync::Arc*/) -> &'static gi::Context {");
    b.line("let ctx = CONTEXT.init(repo);");
    for name in wrapped_objects {
        pn!(b, "ctx.wrappers.register({}::get_type(), {}::wrap_object);", name, name);
    }
    b.line("ctx");
    b.close("}");
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use gi_types::{ArgumentDescriptor, ContainerDescriptor, FunctionDescriptor, TypeDescriptor, TypeTag};

    fn int32() -> TypeDescriptor {
        TypeDescriptor::scalar(TypeTag::Int32)
    }

    fn namespace() -> NamespaceDescriptor {
        NamespaceDescriptor::new("Demo", "1.0")
            .info(InfoDescriptor::Function(
                FunctionDescriptor::new("add", "demo_add")
                    .arg(ArgumentDescriptor::new("a", int32()))
                    .arg(ArgumentDescriptor::new("b", int32()))
                    .returns(int32()),
            ))
            .info(InfoDescriptor::Object(
                ContainerDescriptor::new("Widget")
                    .type_init("demo_widget_get_type")
                    .method(FunctionDescriptor::new("show", "demo_widget_show").method())
                    .method(FunctionDescriptor::new("destroy", "demo_widget_destroy").method()),
            ))
            .info(InfoDescriptor::Struct(ContainerDescriptor::new("WidgetClass")))
            .info(InfoDescriptor::Struct(ContainerDescriptor::new("Rect").type_init("demo_rect_get_type")))
    }

    #[test]
    fn test_ids_continue_from_previous_run() {
        let ns = namespace();
        let cfg = Config::default();
        let out = Generator::new(&ns, &cfg).with_ids(10, 3).generate();
        assert_eq!(out.func_next_id, 13);
        assert_eq!(out.get_type_next_id, 5);
        assert_eq!(out.stats.functions, 3);

        let source = out.file.to_source();
        assert!(source.contains("CONTEXT.invoker(10, \"add\", \"\", 0, 0, gi::InfoType::Function"));
        assert!(source.contains("CONTEXT.invoker(12, \"Widget\", \"destroy\", 1, 1, gi::InfoType::Object"));
        assert!(source.contains("ctx.invokers.gtype(3, \"Widget\")"));
        assert!(source.contains("ctx.invokers.gtype(4, \"Rect\")"));
    }

    #[test]
    fn test_context_and_init() {
        let ns = namespace();
        let cfg = Config::default();
        let source = Generator::new(&ns, &cfg).generate().file.to_source();
        assert!(source.contains("use std::sync::Arc;\n"));
        assert!(source.contains("static CONTEXT: gi::ContextCell = gi::ContextCell::new(\"Demo\");"));
        assert!(source.contains("pub fn init(repo: Arc<dyn gi::Repository>) -> &'static gi::Context {"));
        assert!(source.contains("    ctx.wrappers.register(Widget::get_type(), Widget::wrap_object);"));
        assert!(source.contains("extern \"C\" fn destroy_notify(data: *mut c_void) {"));
    }

    #[test]
    fn test_black_and_ignored() {
        let ns = namespace();
        let cfg = Config {
            black: vec!["Widget.destroy".to_string()],
            no_get_type: vec!["Widget".to_string()],
            ..Config::default()
        };
        let out = Generator::new(&ns, &cfg).generate();
        assert_eq!(out.stats.functions, 2);
        assert_eq!(out.func_next_id, 3);
        assert_eq!(out.get_type_next_id, 2);

        let source = out.file.to_source();
        assert!(source.contains("// black function Widget.destroy"));
        assert!(source.contains("// ignore class struct WidgetClass, type of Widget is object"));
        assert!(!source.contains("Widget::get_type()"));
        assert!(source.contains("ctx.invokers.gtype(1, \"Rect\")"));
    }
}
