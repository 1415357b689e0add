//! Callback types and their trampolines
//!
//! A callback that carries a `user_data` pointer becomes a boxed host closure.
//! The closure is stored in the runtime's closure registry and its handle is
//! passed as user data; a generated `extern "C"` trampoline finds it again
//! when native code calls back. Callbacks listed as manual get a trampoline
//! forwarding to a hand-written `handle_*` function of the parent module.

use gi_types::{ArgumentDescriptor, CallbackDescriptor, Direction, TypeTag};

use crate::codec::cb::{native_param, native_return, NativeReturn};
use crate::codec::dir_out::{self, ArrayLen, OutOptions};
use crate::codec::{TypeNames, C_VOID, TODO_TYPE};
use crate::config::Config;
use crate::names::{camel_to_snake, trampoline_name, VarReg};
use crate::source::{pn, SourceBlock};

/// How a callback type is bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackKind {
    /// Boxed host closure, found through the user data argument at this index
    Closure { user_data: usize },
    /// Trampoline into a hand-written handler
    Manual,
    /// Placeholder type only
    Unsupported(String),
}

/// Index of the conventional `user_data` pointer argument
pub fn user_data_index(args: &[ArgumentDescriptor]) -> Option<usize> {
    args.iter()
        .position(|a| a.name == "user_data" && a.ty.tag == TypeTag::Void && a.ty.is_pointer)
}

/// Per-parameter mapping of a trampoline
struct Param {
    var: String,
    native_type: String,
    slot: String,
}

struct Signature {
    params: Vec<Param>,
    ret: NativeReturn,
}

fn signature(names: &TypeNames<'_>, cb: &CallbackDescriptor, reg: &mut VarReg) -> Result<Signature, String> {
    let mut params = Vec::with_capacity(cb.args.len());
    for (i, arg) in cb.args.iter().enumerate() {
        if arg.direction != Direction::In {
            return Err(format!("{} argument {}", direction_name(arg.direction), arg.name));
        }
        let (native_type, from) =
            native_param(names, &arg.ty).ok_or_else(|| format!("argument {} of unmapped type", arg.name))?;
        let var = reg.register_param(i, &arg.name);
        let slot = format!("gi::Argument::{}({})", from, var);
        params.push(Param { var, native_type, slot });
    }
    let ret = native_return(names, &cb.return_type).ok_or_else(|| "unmapped return type".to_string())?;
    Ok(Signature { params, ret })
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::In => "in",
        Direction::Out => "out",
        Direction::InOut => "inout",
    }
}

/// Decide how `cb` is bound
pub fn classify(names: &TypeNames<'_>, config: &Config, cb: &CallbackDescriptor) -> CallbackKind {
    let mut reg = VarReg::new();
    let sig = match signature(names, cb, &mut reg) {
        Ok(sig) => sig,
        Err(reason) => return CallbackKind::Unsupported(reason),
    };
    if config.is_manual_callback(&cb.name) {
        return CallbackKind::Manual;
    }
    let Some(user_data) = user_data_index(&cb.args) else {
        return CallbackKind::Unsupported("callback without user data".to_string());
    };
    let undecodable = cb.args.iter().enumerate().find(|(i, arg)| {
        *i != user_data && host_param(names, arg, &sig.params[*i].slot, &mut reg).is_todo()
    });
    match undecodable {
        Some((_, arg)) => CallbackKind::Unsupported(format!("argument {} has no host type", arg.name)),
        None => CallbackKind::Closure { user_data },
    }
}

fn host_param(names: &TypeNames<'_>, arg: &ArgumentDescriptor, slot: &str, reg: &mut VarReg) -> crate::codec::OutValue {
    let opts = OutOptions {
        transfer: arg.transfer,
        nullable: arg.nullable,
        static_object: true,
    };
    dir_out::decode(names, &arg.ty, slot, ArrayLen::of(&arg.ty, None), opts, reg)
}

/// Emit the host type of `cb` and its trampoline
pub fn emit(names: &TypeNames<'_>, cb: &CallbackDescriptor, kind: &CallbackKind) -> SourceBlock {
    let mut b = SourceBlock::new();
    match kind {
        CallbackKind::Closure { user_data } => emit_closure(&mut b, names, cb, *user_data),
        CallbackKind::Manual => emit_manual(&mut b, names, cb),
        CallbackKind::Unsupported(reason) => {
            pn!(b, "/// Callback `{}`", cb.name);
            if cb.deprecated {
                b.line("#[deprecated]");
            }
            pn!(b, "pub type {} = {}/*TODO {}*/;", cb.name, TODO_TYPE, reason);
        }
    }
    b
}

fn native_sig(sig: &Signature) -> String {
    let params: Vec<String> = sig
        .params
        .iter()
        .map(|p| format!("{}: {}", p.var, p.native_type))
        .collect();
    if sig.ret.is_void() {
        format!("({})", params.join(", "))
    } else {
        format!("({}) -> {}", params.join(", "), sig.ret.native_type)
    }
}

fn emit_closure(b: &mut SourceBlock, names: &TypeNames<'_>, cb: &CallbackDescriptor, user_data: usize) {
    let mut reg = VarReg::new();
    let Ok(sig) = signature(names, cb, &mut reg) else {
        return;
    };
    let hosts: Vec<_> = cb
        .args
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != user_data)
        .map(|(i, arg)| host_param(names, arg, &sig.params[i].slot, &mut reg))
        .collect();

    let host_params: Vec<&str> = hosts.iter().map(|h| h.host_type.as_str()).collect();
    let host_ret = if sig.ret.is_void() {
        String::new()
    } else {
        format!(" -> {}", sig.ret.host_type)
    };

    pn!(b, "/// Host closure of callback `{}`", cb.name);
    if cb.deprecated {
        b.line("#[deprecated]");
    }
    pn!(
        b,
        "pub type {} = Box<dyn Fn({}){} + Send + Sync>;",
        cb.name,
        host_params.join(", "),
        host_ret
    );
    b.line("");

    let handle = reg.alloc("handle");
    let closure = reg.alloc("closure");
    let f = reg.alloc("f");
    let default_return = if sig.ret.is_void() {
        "return;".to_string()
    } else {
        format!("return {};", sig.ret.default)
    };
    let user_data_var = &sig.params[user_data].var;

    b.open(format!("extern \"C\" fn {}{} {{", trampoline_name(&cb.name), native_sig(&sig)));
    b.open("let Ok(ctx) = CONTEXT.get() else {");
    b.line(&default_return);
    b.close("};");
    pn!(b, "let {} = gi::handle_from_ptr({});", handle, user_data_var);
    pn!(b, "let {} = ctx.closures.get({});", closure, handle);
    b.open(format!("if {}.scope() == gi::Scope::Async {{", closure));
    pn!(b, "ctx.closures.unregister({});", handle);
    b.close("}");
    b.open(format!("let Some({}) = {}.callable::<{}>() else {{", f, closure, cb.name));
    b.line(&default_return);
    b.close("};");
    let call_args: Vec<&str> = hosts.iter().map(|h| h.expr.as_str()).collect();
    let call = format!("{}({})", f, call_args.join(", "));
    if sig.ret.is_void() {
        pn!(b, "{};", call);
    } else {
        b.line(sig.ret.apply(&call));
    }
    b.close("}");
}

fn emit_manual(b: &mut SourceBlock, names: &TypeNames<'_>, cb: &CallbackDescriptor) {
    let mut reg = VarReg::new();
    let Ok(sig) = signature(names, cb, &mut reg) else {
        return;
    };
    let vars: Vec<&str> = sig.params.iter().map(|p| p.var.as_str()).collect();
    pn!(b, "/// Trampoline of callback `{}`, handled by hand", cb.name);
    b.open(format!("extern \"C\" fn {}{} {{", trampoline_name(&cb.name), native_sig(&sig)));
    pn!(b, "super::handle_{}({})", camel_to_snake(&cb.name), vars.join(", "));
    b.close("}");
}

/// Destroy notify releasing a closure handle, shared by every callback of a file
pub fn emit_destroy_notify() -> SourceBlock {
    let mut b = SourceBlock::new();
    b.open(format!("extern \"C\" fn destroy_notify(data: {}) {{", C_VOID));
    b.open("if let Ok(ctx) = CONTEXT.get() {");
    b.line("ctx.closures.unregister(gi::handle_from_ptr(data));");
    b.close("}");
    b.close("}");
    b
}
