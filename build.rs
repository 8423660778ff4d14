//! Renders the `agenix(1)` manual page from the clap definition.

use std::{env, fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=CARGO_TARGET_DIR");

    let target_dir = env::var_os("CARGO_TARGET_DIR").map_or_else(|| PathBuf::from("target"), PathBuf::from);
    let man_dir = target_dir.join("man");
    fs::create_dir_all(&man_dir)?;

    let command = cli::Cli::command().version(env!("CARGO_PKG_VERSION"));
    let mut page = Vec::new();
    Man::new(command)
        .section("1")
        .manual("Agenix Manual")
        .render(&mut page)?;
    fs::write(man_dir.join("agenix.1"), page)?;
    Ok(())
}
