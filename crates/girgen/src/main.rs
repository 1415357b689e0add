//! girgen command line

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;

#[derive(Parser)]
#[command(name = "girgen")]
#[command(about = "Generate Rust bindings for a GObject-Introspection namespace", long_about = None)]
#[command(version)]
struct Cli {
    /// Namespace descriptor (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Generated Rust source file
    #[arg(short, long)]
    output: PathBuf,

    /// Generator config (JSON); a missing file means defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State file carrying id counters between namespaces
    #[arg(long)]
    state: Option<PathBuf>,

    /// Namespace generated right before this one, checked against the state
    #[arg(long, requires = "state")]
    after: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let opts = girgen::Options {
        input: cli.input,
        output: cli.output,
        config: cli.config,
        state: cli.state,
        after: cli.after,
    };
    let stats = girgen::run(&opts)
        .with_context(|| format!("failed to generate bindings from {}", opts.input.display()))?;
    println!("{}", stats);
    Ok(())
}
