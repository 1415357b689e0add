//! Generates the `Demo` bindings into `OUT_DIR`

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=gir/Demo-1.0.json");
    println!("cargo:rerun-if-changed=gir/Demo-1.0.config.json");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let opts = girgen::Options {
        input: PathBuf::from("gir/Demo-1.0.json"),
        output: out_dir.join("demo.rs"),
        config: Some(PathBuf::from("gir/Demo-1.0.config.json")),
        state: None,
        after: None,
    };
    if let Err(err) = girgen::run(&opts) {
        panic!("failed to generate Demo bindings: {}", err);
    }
}
