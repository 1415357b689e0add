//! Identifier conversion and allocation

use rustc_hash::FxHashMap;

/// Identifiers a generated local may not take verbatim
const RESERVED: &[&str] = &[
    // Strict and reserved keywords
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "gen", "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
    // Names generated code refers to implicitly
    "gi", "log", "std", "ctx",
];

/// Keywords that cannot be raw identifiers
const NO_RAW: &[&str] = &["self", "Self", "super", "crate"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Item name for a native name, escaping keywords
pub fn item_name(name: &str) -> String {
    if NO_RAW.contains(&name) {
        format!("{}_", name)
    } else if is_reserved(name) && !matches!(name, "gi" | "log" | "std" | "ctx") {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// `new_from_file` to `NewFromFile`; empty words become `_`
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name.split('_') {
        if word.is_empty() {
            out.push('_');
            continue;
        }
        let word = word.to_lowercase();
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `IOChannel` to `i_o_channel`, one underscore per upper-case letter
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Generated type name of an enum
pub fn enum_type_name(name: &str) -> String {
    format!("{}Enum", name)
}

/// Generated type name of a flags type, avoiding a doubled suffix
pub fn flags_type_name(name: &str) -> String {
    if name.ends_with("Flags") {
        name.to_string()
    } else {
        format!("{}Flags", name)
    }
}

/// Associated constant name of an enum or flags member
pub fn member_const_name(value_name: &str) -> String {
    let name = value_name.replace('-', "_").to_uppercase();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", name)
    } else {
        name
    }
}

/// Name of the trampoline of a callback type
pub fn trampoline_name(callback: &str) -> String {
    format!("{}_trampoline", camel_to_snake(callback))
}

/// Allocator for the local variables of one generated function.
///
/// A repeated prefix gets a numeric suffix counting up from the last use;
/// reserved names always get a suffix.
#[derive(Debug, Default)]
pub struct VarReg {
    vars: Vec<(String, usize)>,
    params: FxHashMap<usize, String>,
}

impl VarReg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, prefix: &str) -> String {
        let idx = match self.vars.iter().rev().find(|(name, _)| name == prefix) {
            Some((_, idx)) => idx + 1,
            None if is_reserved(prefix) => 1,
            None => 0,
        };
        self.vars.push((prefix.to_string(), idx));
        if idx == 0 {
            prefix.to_string()
        } else {
            format!("{}{}", prefix, idx)
        }
    }

    /// Allocate the variable of the parameter at `idx`
    pub fn register_param(&mut self, idx: usize, name: &str) -> String {
        let var = self.alloc(name);
        self.params.insert(idx, var.clone());
        var
    }

    pub fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(&idx).map(String::as_str)
    }
}
