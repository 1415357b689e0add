//! Generated source files
//!
//! A [`SourceFile`] is a set of imports and a [`SourceBody`] of blocks. Lines
//! may carry inline directives of the form `/*use:PATH*/`; adding such a line
//! strips the directive and records `use PATH;` as an import of the file.

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::GenResult;

/// First line of every generated file
pub const HEADER: &str = "// Code generated by girgen. DO NOT EDIT.";

static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*(\w+):(.+?)\*/").expect("directive pattern"));

/// Remove directives from `line`, collecting the paths of `use` directives
fn strip_directives(line: &str, imports: &mut BTreeSet<String>) -> String {
    if !line.contains("/*") {
        return line.to_string();
    }
    for caps in DIRECTIVE.captures_iter(line) {
        match &caps[1] {
            "use" => {
                imports.insert(caps[2].trim().to_string());
            }
            other => log::debug!("ignoring unknown directive {:?}", other),
        }
    }
    DIRECTIVE.replace_all(line, "").into_owned()
}

/// Appends a formatted line to a [`SourceBlock`]
macro_rules! pn {
    ($block:expr, $($arg:tt)*) => {
        $block.line(format!($($arg)*))
    };
}
pub(crate) use pn;

/// A run of lines emitted for one item
#[derive(Debug, Default, Clone)]
pub struct SourceBlock {
    lines: Vec<String>,
    imports: BTreeSet<String>,
    indent: usize,
}

impl SourceBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line at the current indentation
    pub fn line(&mut self, line: impl AsRef<str>) {
        let line = strip_directives(line.as_ref(), &mut self.imports);
        if line.is_empty() {
            self.lines.push(line);
        } else {
            self.lines.push(format!("{}{}", "    ".repeat(self.indent), line));
        }
    }

    /// Append a line and indent the following ones
    pub fn open(&mut self, line: impl AsRef<str>) {
        self.line(line);
        self.indent += 1;
    }

    /// Dedent and append a closing line
    pub fn close(&mut self, line: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(1);
        self.line(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether any line carries a placeholder marker or type
    pub fn contains_todo(&self) -> bool {
        self.lines
            .iter()
            .any(|l| l.contains("TODO") || l.contains("gi::Todo"))
    }

    pub fn imports(&self) -> &BTreeSet<String> {
        &self.imports
    }
}

/// Ordered blocks of a file
#[derive(Debug, Default, Clone)]
pub struct SourceBody {
    blocks: Vec<SourceBlock>,
}

impl SourceBody {
    pub fn push(&mut self, block: SourceBlock) {
        if !block.is_empty() {
            self.blocks.push(block);
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[SourceBlock] {
        &self.blocks
    }
}

/// One generated Rust source file
#[derive(Debug, Default, Clone)]
pub struct SourceFile {
    imports: BTreeSet<String>,
    pub body: SourceBody,
}

impl SourceFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_import(&mut self, path: impl Into<String>) {
        self.imports.insert(path.into());
    }

    /// Append a block, taking over its imports
    pub fn push(&mut self, block: SourceBlock) {
        self.imports.extend(block.imports.iter().cloned());
        self.body.push(block);
    }

    pub fn imports(&self) -> &BTreeSet<String> {
        &self.imports
    }

    /// Render the file: header, sorted imports, then the blocks
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push_str("\n\n");
        for import in &self.imports {
            out.push_str("use ");
            out.push_str(import);
            out.push_str(";\n");
        }
        for block in self.body.blocks() {
            out.push('\n');
            for line in block.lines() {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    pub fn save(&self, path: &Path) -> GenResult<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        std::fs::write(path, self.to_source())?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}
