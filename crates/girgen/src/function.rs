//! Function and method emitter
//!
//! Every native function becomes one host function that looks up its
//! invoker by call-site id, marshals its arguments into a slot vector, calls
//! through libffi and decodes the result and out arguments:
//!
//! ```text
//! invoker lookup        early return on failure
//! out-argument block
//! before-call lines     C strings, closure registration, inout boxing
//! argument vector
//! call
//! write-back lines      inout values
//! after-call lines      frees, call-scope unregistration
//! error check           throwing functions only
//! decoding and result
//! ```

use gi_types::{ArgumentDescriptor, ContainerDescriptor, Direction, FunctionDescriptor, InterfaceKind, ScopeType, TypeDescriptor, TypeTag};
use rustc_hash::FxHashMap;

use crate::callback::CallbackKind;
use crate::codec::dir_in::{self, InOptions};
use crate::codec::dir_out::{self, ArrayLen, OutOptions};
use crate::codec::{describe, numeric_type, zero_value, OutValue, C_VOID, TODO_TYPE};
use crate::generator::Env;
use crate::names::{item_name, trampoline_name, VarReg};
use crate::source::{pn, SourceBlock};
use crate::types::ContainerKind;

/// Where a function lives and how the runtime finds it
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    /// Invoker cache id
    pub id: u32,
    /// Position of the function or container in the namespace
    pub idx_lv1: usize,
    /// Position of the method in its container
    pub idx_lv2: usize,
    pub container: Option<(&'a ContainerDescriptor, ContainerKind)>,
}

/// `Container.name` for methods, `name` otherwise
pub fn identify(func: &FunctionDescriptor, container: Option<&ContainerDescriptor>) -> String {
    match container {
        Some(c) => format!("{}.{}", c.name, func.name),
        None => func.name.clone(),
    }
}

/// Host name of a function, renamed when it would clash with a generated item
pub fn host_name(func: &FunctionDescriptor, in_container: bool) -> String {
    let clash = if in_container {
        matches!(func.name.as_str(), "get_type" | "wrap_object")
    } else {
        matches!(func.name.as_str(), "init" | "destroy_notify")
    };
    if clash {
        item_name(&format!("{}_f", func.name))
    } else {
        item_name(&func.name)
    }
}

/// Emit the binding of one function or method
pub fn emit(env: &Env<'_>, func: &FunctionDescriptor, site: CallSite<'_>) -> SourceBlock {
    FunctionBuilder::new(env, func, site).build()
}

fn scope_expr(scope: ScopeType) -> &'static str {
    match scope {
        ScopeType::Invalid => "gi::Scope::Invalid",
        ScopeType::Call => "gi::Scope::Call",
        ScopeType::Async => "gi::Scope::Async",
        ScopeType::Notified => "gi::Scope::Notified",
    }
}

/// How a length argument the host does not see is filled
#[derive(Debug, Clone, Copy)]
enum HiddenLen {
    /// From the length of the input array at this index
    FromArray(usize),
    /// Written by the callee into its out slot
    OutSlot,
}

enum Receiver {
    None,
    /// `&self` of the container wrapper
    SelfRef,
    /// Method without a known container, passed as a raw instance pointer
    Pointer(String),
}

struct FunctionBuilder<'a> {
    env: &'a Env<'a>,
    func: &'a FunctionDescriptor,
    site: CallSite<'a>,
    reg: VarReg,

    receiver: Receiver,
    first_arg_receiver: bool,
    is_ctor: bool,

    out_slots: Vec<Option<usize>>,
    error_slot: Option<usize>,
    n_out: usize,
    hidden_len: FxHashMap<usize, HiddenLen>,
    /// User data index to callback index
    user_data_of: FxHashMap<usize, usize>,
    /// Destroy notify index to callback index
    destroy_of: FxHashMap<usize, usize>,
    /// Callback index to the variable of its closure handle
    handles: FxHashMap<usize, String>,

    params: Vec<String>,
    before: Vec<String>,
    slots: Vec<String>,
    write_back: Vec<String>,
    after: Vec<String>,
    /// Decoded values and the variables they are bound to
    results: Vec<(String, OutValue)>,
    needs_ctx: bool,

    var_iv: String,
    var_out_args: String,
    var_args: String,
    var_ret: String,
}

impl<'a> FunctionBuilder<'a> {
    fn new(env: &'a Env<'a>, func: &'a FunctionDescriptor, site: CallSite<'a>) -> Self {
        let container = site.container.map(|(c, _)| c);
        let is_ctor = func.flags.is_constructor && container.is_some();
        let first_arg_receiver = match (container, func.args.first()) {
            (Some(c), Some(first)) => !func.flags.is_method && !is_ctor && is_self_arg(env, first, c),
            _ => false,
        };

        let mut reg = VarReg::new();
        for (i, arg) in func.args.iter().enumerate() {
            reg.register_param(i, &arg.name);
        }
        let receiver = if func.flags.is_method && container.is_none() {
            Receiver::Pointer(reg.alloc("instance"))
        } else if container.is_some() && (func.flags.is_method || first_arg_receiver) {
            Receiver::SelfRef
        } else {
            Receiver::None
        };
        let var_iv = reg.alloc("iv");
        let var_out_args = reg.alloc("out_args");
        let var_args = reg.alloc("args");
        let var_ret = reg.alloc("ret");

        Self {
            env,
            func,
            site,
            reg,
            receiver,
            first_arg_receiver,
            is_ctor,
            out_slots: Vec::new(),
            error_slot: None,
            n_out: 0,
            hidden_len: FxHashMap::default(),
            user_data_of: FxHashMap::default(),
            destroy_of: FxHashMap::default(),
            handles: FxHashMap::default(),
            params: Vec::new(),
            before: Vec::new(),
            slots: Vec::new(),
            write_back: Vec::new(),
            after: Vec::new(),
            results: Vec::new(),
            needs_ctx: false,
            var_iv,
            var_out_args,
            var_args,
            var_ret,
        }
    }

    fn build(mut self) -> SourceBlock {
        self.assign_out_slots();
        self.find_hidden_lengths();
        self.pair_callbacks();

        match &self.receiver {
            Receiver::None => {}
            // A leading self argument is filled in its own position
            Receiver::SelfRef if self.first_arg_receiver => {}
            Receiver::SelfRef => self.slots.push("gi::Argument::from_ptr(self.p)".to_string()),
            Receiver::Pointer(var) => {
                self.params.push(format!("{}: {}", var, C_VOID));
                self.slots.push(format!("gi::Argument::from_ptr({})", var));
            }
        }
        let func = self.func;
        for (i, arg) in func.args.iter().enumerate() {
            self.argument(i, arg);
        }
        if self.error_slot.is_some() {
            self.slots.push("gi::Argument::ZERO".to_string());
        }
        self.return_value();
        self.print()
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    fn assign_out_slots(&mut self) {
        let func = self.func;
        for arg in &func.args {
            if arg.uses_out_slot() {
                self.out_slots.push(Some(self.n_out));
                self.n_out += 1;
            } else {
                self.out_slots.push(None);
            }
        }
        if self.func.flags.throws {
            self.error_slot = Some(self.n_out);
            self.n_out += 1;
        }
    }

    /// Length arguments filled by the binding instead of the caller
    fn find_hidden_lengths(&mut self) {
        let func = self.func;
        let args = &func.args;
        let is_length = |idx: usize| {
            args.get(idx)
                .is_some_and(|a| !a.ty.is_pointer && numeric_type(a.ty.tag).is_some())
        };

        let mut arrays: Vec<(Option<usize>, &TypeDescriptor)> = args
            .iter()
            .enumerate()
            .map(|(i, a)| (Some(i), &a.ty))
            .collect();
        arrays.push((None, &func.return_type));

        for (owner, ty) in arrays {
            let Some(len_idx) = ty.array_length.filter(|_| ty.tag == TypeTag::Array) else {
                continue;
            };
            if owner == Some(len_idx) || !is_length(len_idx) || (len_idx == 0 && self.first_arg_receiver) {
                continue;
            }
            let len_arg = &args[len_idx];
            let owner_is_input = owner.is_some_and(|i| !args[i].uses_out_slot());
            let hidden = if owner_is_input && len_arg.direction == Direction::In {
                owner.map(HiddenLen::FromArray)
            } else if !owner_is_input && len_arg.direction == Direction::Out && len_arg.uses_out_slot() {
                Some(HiddenLen::OutSlot)
            } else {
                None
            };
            if let Some(hidden) = hidden {
                self.hidden_len.entry(len_idx).or_insert(hidden);
            }
        }
    }

    /// Pair closure-style callback arguments with their user data and
    /// destroy notify arguments
    fn pair_callbacks(&mut self) {
        let func = self.func;
        let args = &func.args;
        for (i, arg) in args.iter().enumerate() {
            if !matches!(self.callback_kind(arg), Some(CallbackKind::Closure { .. })) {
                continue;
            }
            // Only an explicit closure index correlates user data
            let Some(user_data) = arg.closure.filter(|&j| j != i && is_user_data(&args[j])) else {
                continue;
            };
            if self.user_data_of.contains_key(&user_data) {
                continue;
            }
            self.user_data_of.insert(user_data, i);
            if let Some(destroy) = arg.destroy.filter(|&d| d != i && d != user_data) {
                self.destroy_of.insert(destroy, i);
            }
            let handle = self.reg.alloc("handle");
            self.handles.insert(i, handle);
        }
    }

    fn callback_kind(&self, arg: &ArgumentDescriptor) -> Option<&'a CallbackKind> {
        let iref = arg.ty.interface.as_ref()?;
        if arg.ty.tag != TypeTag::Interface
            || self.env.names.kind(iref) != InterfaceKind::Callback
            || self.env.names.is_foreign(iref)
        {
            return None;
        }
        self.env.callbacks.get(&iref.name)
    }

    /// Expression of the value of the length argument at `idx` after the call
    fn length_expr(&self, idx: usize) -> Option<String> {
        let arg = self.func.args.get(idx)?;
        let t = numeric_type(arg.ty.tag)?;
        match self.out_slots.get(idx).copied().flatten() {
            Some(k) => Some(format!("{}[{}].as_{}()", self.var_out_args, k, t)),
            None => self.reg.param(idx).map(str::to_string),
        }
    }

    fn array_len(&self, ty: &TypeDescriptor) -> ArrayLen {
        let expr = match ty.tag {
            TypeTag::Array => ty.array_length.and_then(|idx| self.length_expr(idx)),
            _ => None,
        };
        ArrayLen::of(ty, expr)
    }

    // ========================================================================
    // Arguments
    // ========================================================================

    fn argument(&mut self, i: usize, arg: &'a ArgumentDescriptor) {
        if i == 0 && self.first_arg_receiver {
            self.slots.push("gi::Argument::from_ptr(self.p)".to_string());
            return;
        }
        let var = self.reg.param(i).unwrap_or(arg.name.as_str()).to_string();

        if let Some(&hidden) = self.hidden_len.get(&i) {
            let slot = match hidden {
                HiddenLen::FromArray(array) => {
                    let t = numeric_type(arg.ty.tag).unwrap_or("i32");
                    let array_var = self.reg.param(array).unwrap_or_default();
                    format!("gi::Argument::from_{}({}.len as {})", t, array_var, t)
                }
                HiddenLen::OutSlot => "gi::Argument::ZERO".to_string(),
            };
            self.slots.push(slot);
            return;
        }
        if let Some(callback) = self.user_data_of.get(&i) {
            let handle = self.handles.get(callback).cloned().unwrap_or_default();
            self.slots.push(format!("gi::Argument::from_handle({})", handle));
            return;
        }
        if self.destroy_of.contains_key(&i) {
            self.slots
                .push("gi::Argument::from_usize(destroy_notify as usize)".to_string());
            return;
        }

        match arg.direction {
            Direction::In if self.is_callback(arg) => self.callback_arg(i, arg, &var),
            Direction::In => self.in_arg(arg, &var),
            // Caller allocated memory is passed like an input
            Direction::Out if !arg.uses_out_slot() => self.in_arg(arg, &var),
            Direction::Out => self.out_arg(i, arg),
            Direction::InOut => self.inout_arg(i, arg, &var),
        }
    }

    fn is_callback(&self, arg: &ArgumentDescriptor) -> bool {
        arg.ty.tag == TypeTag::Interface
            && arg
                .ty
                .interface
                .as_ref()
                .is_some_and(|iref| self.env.names.kind(iref) == InterfaceKind::Callback)
    }

    fn in_arg(&mut self, arg: &ArgumentDescriptor, var: &str) {
        let opts = InOptions {
            nullable: arg.nullable,
            transfer: arg.transfer,
        };
        let v = dir_in::encode(&self.env.names, &arg.ty, var, opts, &mut self.reg);
        self.params.push(format!("{}: {}", var, v.host_type));
        self.before.extend(v.before);
        self.slots.push(v.slot);
        self.after.extend(v.after);
    }

    fn callback_arg(&mut self, i: usize, arg: &ArgumentDescriptor, var: &str) {
        let name = arg.ty.interface_name().unwrap_or_default();
        match (self.callback_kind(arg), self.handles.get(&i).cloned()) {
            (Some(CallbackKind::Closure { .. }), Some(handle)) => {
                self.params.push(format!("{}: {}", var, name));
                self.before.push(format!(
                    "let {} = ctx.closures.register({}, {});",
                    handle,
                    var,
                    scope_expr(arg.scope)
                ));
                self.slots.push(format!(
                    "gi::Argument::from_usize({} as usize)",
                    trampoline_name(name)
                ));
                if arg.scope == ScopeType::Call {
                    self.after.push(format!("ctx.closures.unregister({});", handle));
                }
                self.needs_ctx = true;
            }
            (Some(CallbackKind::Manual), _) => {
                self.slots.push(format!(
                    "gi::Argument::from_usize({} as usize)",
                    trampoline_name(name)
                ));
            }
            (Some(CallbackKind::Closure { .. }), None) => {
                self.params.push(format!("{}: {}", var, TODO_TYPE));
                self.slots
                    .push(format!("gi::Argument::ZERO/*TODO no user data for {}*/", name));
            }
            (Some(CallbackKind::Unsupported(_)), _) | (None, _) => {
                self.params.push(format!("{}: {}", var, TODO_TYPE));
                self.slots
                    .push(format!("gi::Argument::ZERO/*TODO callback {}*/", name));
            }
        }
    }

    fn out_slot_expr(&self, i: usize) -> String {
        let k = self.out_slots.get(i).copied().flatten().unwrap_or_default();
        format!("{}[{}]", self.var_out_args, k)
    }

    fn out_arg(&mut self, i: usize, arg: &ArgumentDescriptor) {
        self.slots.push("gi::Argument::ZERO".to_string());
        let opts = OutOptions {
            transfer: arg.transfer,
            nullable: arg.nullable,
            static_object: false,
        };
        let slot = self.out_slot_expr(i);
        let len = self.array_len(&arg.ty);
        let v = dir_out::decode(&self.env.names, &arg.ty, &slot, len, opts, &mut self.reg);
        self.needs_ctx |= v.needs_ctx;
        // Out arguments are not host parameters, so their names are free
        let var = self.reg.param(i).unwrap_or(arg.name.as_str()).to_string();
        self.results.push((var, v));
    }

    /// The host passes `&mut T`; the value travels through the out slot
    fn inout_arg(&mut self, i: usize, arg: &ArgumentDescriptor, var: &str) {
        self.slots.push("gi::Argument::ZERO".to_string());
        let slot = self.out_slot_expr(i);

        // Plain values are read through the reference, the rest auto-deref
        let supported = match arg.ty.tag {
            TypeTag::Void
            | TypeTag::Boolean
            | TypeTag::Int8
            | TypeTag::UInt8
            | TypeTag::Int16
            | TypeTag::UInt16
            | TypeTag::Int32
            | TypeTag::UInt32
            | TypeTag::Int64
            | TypeTag::UInt64
            | TypeTag::Float
            | TypeTag::Double
            | TypeTag::GType
            | TypeTag::Unichar => Some(format!("*{}", var)),
            TypeTag::Utf8 | TypeTag::Filename | TypeTag::Interface => Some(var.to_string()),
            TypeTag::Array | TypeTag::GList | TypeTag::GSList | TypeTag::GHash | TypeTag::Error => None,
        };
        let in_opts = InOptions {
            nullable: false,
            transfer: arg.transfer,
        };
        let out_opts = OutOptions {
            transfer: arg.transfer,
            nullable: false,
            static_object: true,
        };
        let marshaled = supported.map(|expr| {
            let enc = dir_in::encode(&self.env.names, &arg.ty, &expr, in_opts, &mut self.reg);
            let dec = dir_out::decode(&self.env.names, &arg.ty, &slot, ArrayLen::Unknown, out_opts, &mut self.reg);
            (enc, dec)
        });
        match marshaled {
            Some((enc, dec)) if enc.host_type != TODO_TYPE && !dec.is_todo() && !enc.host_type.starts_with("Option") => {
                self.params.push(format!("{}: &mut {}", var, dec.host_type));
                self.before.extend(enc.before);
                self.before.push(format!("{} = {};", slot, enc.slot));
                self.write_back.push(format!("*{} = {};", var, dec.expr));
                self.after.extend(enc.after);
            }
            _ => {
                self.params.push(format!("{}: {}", var, TODO_TYPE));
                self.before
                    .push(format!("// TODO inout {} {}", var, describe(&arg.ty)));
            }
        }
    }

    fn return_value(&mut self) {
        if self.func.skip_return || self.func.return_type.is_void() {
            return;
        }
        let v = match self.site.container {
            Some((container, _)) if self.is_ctor => OutValue::new(
                container.name.clone(),
                format!("{} {{ p: {}.as_ptr() }}", container.name, self.var_ret),
            ),
            _ => {
                let opts = OutOptions {
                    transfer: self.func.return_transfer,
                    nullable: self.func.may_return_null,
                    static_object: false,
                };
                let len = self.array_len(&self.func.return_type);
                let slot = self.var_ret.clone();
                dir_out::decode(&self.env.names, &self.func.return_type, &slot, len, opts, &mut self.reg)
            }
        };
        self.needs_ctx |= v.needs_ctx;
        let var = self.reg.alloc("result");
        self.results.insert(0, (var, v));
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn has_ret(&self) -> bool {
        !self.func.skip_return && !self.func.return_type.is_void()
    }

    fn print(&self) -> SourceBlock {
        let func = self.func;
        let mut b = SourceBlock::new();
        let container = self.site.container;
        if let Some((c, _)) = container {
            b.open(format!("impl {} {{", c.name));
        }

        let types: Vec<&str> = self.results.iter().map(|(_, r)| r.host_type.as_str()).collect();
        let host_ret = match types.as_slice() {
            [] => "()".to_string(),
            [one] => one.to_string(),
            many => format!("({})", many.join(", ")),
        };
        let zero = match types.as_slice() {
            [] => None,
            [one] => Some(zero_value(one)),
            many => Some(format!(
                "({})",
                many.iter().map(|t| zero_value(t)).collect::<Vec<_>>().join(", ")
            )),
        };

        pn!(b, "/// `{}`", func.symbol);
        let notes: Vec<String> = func.args.iter().filter_map(arg_note).collect();
        if !notes.is_empty() {
            b.line("///");
            for note in notes {
                pn!(b, "/// {}", note);
            }
        }
        if func.deprecated {
            b.line("#[deprecated]");
        }

        let mut sig = Vec::new();
        if matches!(self.receiver, Receiver::SelfRef) {
            sig.push("&self".to_string());
        }
        sig.extend(self.params.iter().cloned());
        let throws = func.flags.throws;
        let ret_sig = if throws {
            format!(" -> Result<{}, gi::GiError>", host_ret)
        } else if types.is_empty() {
            String::new()
        } else {
            format!(" -> {}", host_ret)
        };
        let name = host_name(func, container.is_some());
        b.open(format!("pub fn {}({}){} {{", name, sig.join(", "), ret_sig));

        self.print_invoker_get(&mut b, throws, zero);

        if self.n_out > 0 {
            pn!(b, "let mut {} = [gi::Argument::ZERO; {}];", self.var_out_args, self.n_out);
        }
        for line in &self.before {
            b.line(line);
        }
        if !self.slots.is_empty() {
            pn!(b, "let mut {} = [{}];", self.var_args, self.slots.join(", "));
        }
        if self.has_ret() {
            pn!(b, "let mut {} = gi::Argument::ZERO;", self.var_ret);
        }
        let call_args = if self.slots.is_empty() {
            "&mut []".to_string()
        } else {
            format!("&mut {}", self.var_args)
        };
        let call_ret = if self.has_ret() {
            format!("Some(&mut {})", self.var_ret)
        } else {
            "None".to_string()
        };
        let call_out = if self.n_out > 0 {
            format!("{}.as_mut_ptr()", self.var_out_args)
        } else {
            "std::ptr::null_mut()".to_string()
        };
        pn!(b, "unsafe {{ {}.call({}, {}, {}) }};", self.var_iv, call_args, call_ret, call_out);

        for line in self.write_back.iter().chain(self.after.iter()) {
            b.line(line);
        }
        if let Some(k) = self.error_slot {
            b.open(format!(
                "if let Some(err) = unsafe {{ gi::to_error({}[{}].as_ptr()) }} {{",
                self.var_out_args, k
            ));
            b.line("return Err(err);");
            b.close("}");
        }

        let tail = match self.results.as_slice() {
            [] => None,
            [(_, one)] => Some(one.expr.clone()),
            many => {
                let mut vars = Vec::new();
                for (var, r) in many {
                    pn!(b, "let {} = {};", var, r.expr);
                    vars.push(var.as_str());
                }
                Some(format!("({})", vars.join(", ")))
            }
        };
        match (throws, tail) {
            (true, Some(expr)) => pn!(b, "Ok({})", expr),
            (true, None) => b.line("Ok(())"),
            (false, Some(expr)) => b.line(expr),
            (false, None) => {}
        }
        b.close("}");
        if container.is_some() {
            b.close("}");
        }
        b
    }

    fn print_invoker_get(&self, b: &mut SourceBlock, throws: bool, zero: Option<String>) {
        let (lv1, lv2, info_type) = match self.site.container {
            Some((c, kind)) => (c.name.as_str(), self.func.name.as_str(), kind.info_type()),
            None => (self.func.name.as_str(), "", "gi::InfoType::Function"),
        };
        let flags = match self.site.container {
            Some((c, _)) if self.env.config.skips_call_find(&c.name) => "gi::FindMethodFlags::NO_CALL_FIND",
            _ => "gi::FindMethodFlags::NONE",
        };
        let ctx = if self.needs_ctx { "ctx" } else { "_" };
        let get = format!(
            "CONTEXT.invoker({}, {:?}, {:?}, {}, {}, {}, {})",
            self.site.id, lv1, lv2, self.site.idx_lv1, self.site.idx_lv2, info_type, flags
        );
        if throws {
            pn!(b, "let ({}, {}) = {}?;", ctx, self.var_iv, get);
            return;
        }
        b.open(format!("let ({}, {}) = match {} {{", ctx, self.var_iv, get));
        b.line("Ok(v) => v,");
        b.open("Err(err) => {");
        b.line("log::warn!(\"{}\", err);");
        match zero {
            Some(zero) => pn!(b, "return {};", zero),
            None => b.line("return;"),
        }
        b.close("}");
        b.close("};");
    }
}

/// Doc note of a parameter with a non-default direction or transfer
fn arg_note(arg: &ArgumentDescriptor) -> Option<String> {
    let mut parts = Vec::new();
    match arg.direction {
        Direction::In => {}
        Direction::Out => parts.push("out".to_string()),
        Direction::InOut => parts.push("inout".to_string()),
    }
    match arg.transfer {
        gi_types::Transfer::Nothing => {}
        gi_types::Transfer::Container => parts.push("transfer container".to_string()),
        gi_types::Transfer::Everything => parts.push("transfer everything".to_string()),
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("- `{}`: {}", arg.name, parts.join(", ")))
    }
}

fn is_user_data(arg: &ArgumentDescriptor) -> bool {
    arg.ty.tag == TypeTag::Void && arg.ty.is_pointer
}

/// A leading pointer to the container itself makes a static function a method
fn is_self_arg(env: &Env<'_>, arg: &ArgumentDescriptor, container: &ContainerDescriptor) -> bool {
    arg.direction == Direction::In
        && arg.ty.is_pointer
        && arg.ty.tag == TypeTag::Interface
        && arg
            .ty
            .interface
            .as_ref()
            .is_some_and(|iref| iref.name == container.name && !env.names.is_foreign(iref))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use gi_types::{CallbackDescriptor, InfoDescriptor, NamespaceDescriptor, Transfer};

    fn int32() -> TypeDescriptor {
        TypeDescriptor::scalar(TypeTag::Int32)
    }

    fn apply_func() -> CallbackDescriptor {
        CallbackDescriptor {
            name: "ApplyFunc".to_string(),
            args: vec![
                ArgumentDescriptor::new("value", int32()),
                ArgumentDescriptor::new("user_data", TypeDescriptor::void_pointer()),
            ],
            return_type: int32(),
            return_transfer: Transfer::Nothing,
            deprecated: false,
        }
    }

    fn namespace() -> NamespaceDescriptor {
        NamespaceDescriptor::new("Demo", "1.0")
            .info(InfoDescriptor::Callback(apply_func()))
            .info(InfoDescriptor::Object(ContainerDescriptor::new("Widget")))
    }

    fn emit_text(cfg: &Config, func: &FunctionDescriptor, in_widget: bool) -> (String, bool) {
        let ns = namespace();
        let env = Env::new(&ns, cfg);
        let widget = ns.infos[1].as_container().unwrap();
        let site = CallSite {
            id: 0,
            idx_lv1: if in_widget { 1 } else { 0 },
            idx_lv2: 0,
            container: in_widget.then_some((widget, ContainerKind::Object)),
        };
        let block = emit(&env, func, site);
        (block.lines().join("\n"), block.contains_todo())
    }

    #[test]
    fn test_plain_function() {
        let func = FunctionDescriptor::new("add", "demo_add")
            .arg(ArgumentDescriptor::new("a", int32()))
            .arg(ArgumentDescriptor::new("b", int32()))
            .returns(int32());
        let (text, todo) = emit_text(&Config::default(), &func, false);
        let expected = [
            "/// `demo_add`",
            "pub fn add(a: i32, b: i32) -> i32 {",
            "    let (_, iv) = match CONTEXT.invoker(0, \"add\", \"\", 0, 0, gi::InfoType::Function, gi::FindMethodFlags::NONE) {",
            "        Ok(v) => v,",
            "        Err(err) => {",
            "            log::warn!(\"{}\", err);",
            "            return Default::default();",
            "        }",
            "    };",
            "    let mut args = [gi::Argument::from_i32(a), gi::Argument::from_i32(b)];",
            "    let mut ret = gi::Argument::ZERO;",
            "    unsafe { iv.call(&mut args, Some(&mut ret), std::ptr::null_mut()) };",
            "    ret.as_i32()",
            "}",
        ]
        .join("\n");
        assert_eq!(text, expected);
        assert!(!todo);
    }

    #[test]
    fn test_throws_with_out_argument() {
        let func = FunctionDescriptor::new("parse", "demo_parse")
            .throws()
            .arg(ArgumentDescriptor::new("text", TypeDescriptor::utf8()))
            .arg(ArgumentDescriptor::new("value", int32()).out())
            .returns(TypeDescriptor::scalar(TypeTag::Boolean));
        let (text, _) = emit_text(&Config::default(), &func, false);

        assert!(text.contains("/// - `value`: out"));
        assert!(text.contains("pub fn parse(text: &str) -> Result<(bool, i32), gi::GiError> {"));
        assert!(text.contains(
            "let (_, iv) = CONTEXT.invoker(0, \"parse\", \"\", 0, 0, gi::InfoType::Function, gi::FindMethodFlags::NONE)?;"
        ));
        assert!(text.contains("let mut out_args = [gi::Argument::ZERO; 2];"));
        assert!(text.contains("let c_text = gi::c_string(text);"));
        assert!(text.contains(
            "let mut args = [gi::Argument::from_ptr(c_text), gi::Argument::ZERO, gi::Argument::ZERO];"
        ));
        assert!(text.contains("unsafe { iv.call(&mut args, Some(&mut ret), out_args.as_mut_ptr()) };"));
        assert!(text.contains("if let Some(err) = unsafe { gi::to_error(out_args[1].as_ptr()) } {"));
        assert!(text.contains("let result = ret.as_bool();"));
        assert!(text.contains("let value = out_args[0].as_i32();"));
        assert!(text.ends_with("    Ok((result, value))\n}"));

        // The string is released before the error check
        let free = text.find("gi::free(c_text)").unwrap();
        let check = text.find("gi::to_error").unwrap();
        assert!(free < check);
    }

    #[test]
    fn test_method_with_closure() {
        let cb = TypeDescriptor::interface(InterfaceKind::Callback, "ApplyFunc");
        let func = FunctionDescriptor::new("foreach", "demo_widget_foreach")
            .method()
            .arg(ArgumentDescriptor::new("func", cb).scope(ScopeType::Call).closure(1))
            .arg(ArgumentDescriptor::new("user_data", TypeDescriptor::void_pointer()));
        let (text, todo) = emit_text(&Config::default(), &func, true);

        assert!(text.starts_with("impl Widget {\n    /// `demo_widget_foreach`"));
        assert!(text.contains("    pub fn foreach(&self, func: ApplyFunc) {"));
        assert!(text.contains(
            "let (ctx, iv) = match CONTEXT.invoker(0, \"Widget\", \"foreach\", 1, 0, gi::InfoType::Object, gi::FindMethodFlags::NONE) {"
        ));
        assert!(text.contains("return;"));
        assert!(text.contains("let handle = ctx.closures.register(func, gi::Scope::Call);"));
        assert!(text.contains(
            "let mut args = [gi::Argument::from_ptr(self.p), gi::Argument::from_usize(apply_func_trampoline as usize), gi::Argument::from_handle(handle)];"
        ));
        assert!(text.contains("unsafe { iv.call(&mut args, None, std::ptr::null_mut()) };"));
        assert!(text.contains("ctx.closures.unregister(handle);"));
        assert!(text.ends_with("    }\n}"));
        assert!(!todo);
    }

    #[test]
    fn test_callback_without_closure_index_is_placeholder() {
        let cb = TypeDescriptor::interface(InterfaceKind::Callback, "ApplyFunc");
        let func = FunctionDescriptor::new("apply", "demo_apply")
            .arg(ArgumentDescriptor::new("func", cb).scope(ScopeType::Call))
            .arg(ArgumentDescriptor::new("user_data", TypeDescriptor::void_pointer()));
        let (text, todo) = emit_text(&Config::default(), &func, false);

        assert!(text.contains("pub fn apply(func: gi::Todo, user_data: *mut c_void) {"));
        assert!(text.contains("gi::Argument::ZERO/*TODO no user data for ApplyFunc*/"));
        assert!(!text.contains("closures.register"));
        assert!(!text.contains("from_handle"));
        assert!(todo);
    }

    #[test]
    fn test_notified_closure_uses_destroy_notify() {
        let cb = TypeDescriptor::interface(InterfaceKind::Callback, "ApplyFunc");
        let func = FunctionDescriptor::new("watch", "demo_watch")
            .arg(ArgumentDescriptor::new("func", cb).scope(ScopeType::Notified).closure(1).destroy(2))
            .arg(ArgumentDescriptor::new("data", TypeDescriptor::void_pointer()))
            .arg(ArgumentDescriptor::new(
                "notify",
                TypeDescriptor::interface(InterfaceKind::Callback, "DestroyNotify").in_namespace("GLib"),
            ));
        let (text, todo) = emit_text(&Config::default(), &func, false);

        assert!(text.contains("pub fn watch(func: ApplyFunc) {"));
        assert!(text.contains("gi::Argument::from_usize(destroy_notify as usize)"));
        assert!(!text.contains("unregister"));
        assert!(!todo);
    }

    #[test]
    fn test_hidden_array_lengths() {
        let values = TypeDescriptor::c_array(int32(), Some(1), false);
        let func = FunctionDescriptor::new("sum", "demo_sum")
            .arg(ArgumentDescriptor::new("values", values))
            .arg(ArgumentDescriptor::new("n", int32()))
            .returns(int32());
        let (text, _) = emit_text(&Config::default(), &func, false);
        assert!(text.contains("pub fn sum(values: gi::NativeArray<i32>) -> i32 {"));
        assert!(text.contains(
            "let mut args = [gi::Argument::from_ptr(values.p), gi::Argument::from_i32(values.len as i32)];"
        ));

        let items = TypeDescriptor::c_array(TypeDescriptor::utf8(), Some(1), false);
        let func = FunctionDescriptor::new("list", "demo_list")
            .arg(ArgumentDescriptor::new("items", items).out().transfer(Transfer::Everything))
            .arg(ArgumentDescriptor::new("n", int32()).out());
        let (text, _) = emit_text(&Config::default(), &func, false);
        assert!(text.contains("pub fn list() -> gi::CStrArray {"));
        assert!(text.contains("arr.set_len(out_args[1].as_i32() as i64)"));
        assert!(text.contains("let mut out_args = [gi::Argument::ZERO; 2];"));
    }

    #[test]
    fn test_inout_scalar_and_string() {
        let func = FunctionDescriptor::new("bump", "demo_bump")
            .arg(ArgumentDescriptor::new("value", int32()).inout())
            .arg(ArgumentDescriptor::new("label", TypeDescriptor::utf8()).inout());
        let (text, todo) = emit_text(&Config::default(), &func, false);

        assert!(text.contains("pub fn bump(value: &mut i32, label: &mut String) {"));
        assert!(text.contains("out_args[0] = gi::Argument::from_i32(*value);"));
        assert!(text.contains("let c_label = gi::c_string(label);"));
        assert!(text.contains("out_args[1] = gi::Argument::from_ptr(c_label);"));
        assert!(text.contains("*value = out_args[0].as_i32();"));
        assert!(text.contains("*label = unsafe { out_args[1].as_str().copy() };"));

        let write_back = text.find("*label =").unwrap();
        let free = text.find("gi::free(c_label)").unwrap();
        assert!(write_back < free);
        assert!(!todo);
    }

    #[test]
    fn test_constructor_and_renames() {
        let cfg = Config {
            no_call_find: vec!["Widget".to_string()],
            ..Config::default()
        };
        let ctor = FunctionDescriptor::new("new", "demo_widget_new")
            .constructor()
            .returns(TypeDescriptor::interface(InterfaceKind::Object, "Widget"));
        let (text, _) = emit_text(&cfg, &ctor, true);
        assert!(text.contains("pub fn new() -> Widget {"));
        assert!(text.contains("gi::FindMethodFlags::NO_CALL_FIND"));
        assert!(text.contains("Widget { p: ret.as_ptr() }"));

        let clash = FunctionDescriptor::new("get_type", "demo_widget_get_type")
            .returns(TypeDescriptor::scalar(TypeTag::GType));
        let (text, _) = emit_text(&Config::default(), &clash, true);
        assert!(text.contains("pub fn get_type_f() -> gi::GType {"));

        let keyword = FunctionDescriptor::new("move", "demo_move");
        let (text, _) = emit_text(&Config::default(), &keyword, false);
        assert!(text.contains("pub fn r#move() {"));
    }

    #[test]
    fn test_leading_self_argument() {
        let widget = TypeDescriptor::interface(InterfaceKind::Object, "Widget");
        let func = FunctionDescriptor::new("hide", "demo_widget_hide")
            .arg(ArgumentDescriptor::new("widget", widget));
        let (text, _) = emit_text(&Config::default(), &func, true);
        assert!(text.contains("pub fn hide(&self) {"));
        assert!(text.contains("let mut args = [gi::Argument::from_ptr(self.p)];"));
    }

    #[test]
    fn test_dynamic_object_return_needs_context() {
        let func = FunctionDescriptor::new("focused", "demo_focused")
            .returns(TypeDescriptor::interface(InterfaceKind::Object, "Widget"));
        let (text, _) = emit_text(&Config::default(), &func, false);
        assert!(text.contains("pub fn focused() -> Option<gi::DynObject> {"));
        assert!(text.contains("let (ctx, iv) = match"));
        assert!(text.contains("unsafe { ctx.wrappers.wrap(ret.as_ptr(), Widget::wrap_object) }"));
    }

    #[test]
    fn test_placeholders_are_marked() {
        let list = TypeDescriptor::scalar(TypeTag::Int32).pointer();
        let func = FunctionDescriptor::new("raw", "demo_raw").arg(ArgumentDescriptor::new("p", list));
        let (text, todo) = emit_text(&Config::default(), &func, false);
        assert!(text.contains("pub fn raw(p: gi::Todo) {"));
        assert!(todo);

        let foreign = TypeDescriptor::interface(InterfaceKind::Callback, "SourceFunc").in_namespace("GLib");
        let func = FunctionDescriptor::new("idle", "demo_idle").arg(ArgumentDescriptor::new("func", foreign));
        let (_, todo) = emit_text(&Config::default(), &func, false);
        assert!(todo);
    }
}
