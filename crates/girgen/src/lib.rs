//! girgen: GObject-Introspection binding generator
//!
//! Reads a namespace descriptor and writes one Rust source file of bindings
//! that call native functions through the `gi` runtime.
//!
//! ```text
//! namespace JSON ──► Generator ──► codec (types, in/out marshaling)
//!                        │     └──► function / callback / types emitters
//!                        ▼
//!                   SourceFile ──► bindings.rs
//! ```

pub mod callback;
pub mod codec;
pub mod config;
pub mod error;
pub mod function;
pub mod generator;
pub mod names;
pub mod source;
pub mod stats;
pub mod types;

use std::path::PathBuf;

use gi_types::NamespaceDescriptor;

pub use config::{Config, GenState};
pub use error::{GenError, GenResult};
pub use generator::{Generated, Generator};
pub use source::SourceFile;
pub use stats::Stats;

/// Inputs and outputs of one generator run
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Namespace descriptor
    pub input: PathBuf,
    /// Generated source file
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    /// Id counters shared with the runs of other namespaces
    pub state: Option<PathBuf>,
    /// Namespace the state file must have been written after
    pub after: Option<String>,
}

/// Generate the bindings described by `opts` and write them out
pub fn run(opts: &Options) -> GenResult<Stats> {
    let namespace = NamespaceDescriptor::from_path(&opts.input)?;
    let config = match &opts.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let state = match (&opts.state, &opts.after) {
        (Some(path), Some(after)) => {
            let state = GenState::load(path)?;
            state.expect_after(path, after)?;
            state
        }
        // First namespace of a chain
        _ => GenState::default(),
    };

    let out = Generator::new(&namespace, &config)
        .with_ids(state.func_next_id, state.get_type_next_id)
        .generate();
    out.file.save(&opts.output)?;

    if let Some(path) = &opts.state {
        let next = GenState {
            prev_namespace: namespace.namespace.clone(),
            func_next_id: out.func_next_id,
            get_type_next_id: out.get_type_next_id,
        };
        next.save(path)?;
        log::debug!("saved state {}", path.display());
    }
    Ok(out.stats)
}
