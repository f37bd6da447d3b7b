//! Man page generator for esphost
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]
//!
//! Writes `esphost.1` plus one `esphost-<command>.1` per subcommand.

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[allow(dead_code)]
#[path = "../cli.rs"]
mod cli;

fn render(man: clap_mangen::Man, path: &Path) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(path, buffer)?;
    println!("Man page generated at: {}", path.display());
    Ok(())
}

fn main() -> std::io::Result<()> {
    // Default to ./man directory
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let main_page = output_dir.join("esphost.1");
    render(clap_mangen::Man::new(cmd.clone()), &main_page)?;

    for sub in cmd.get_subcommands() {
        let name = format!("esphost-{}", sub.get_name());
        let page = output_dir.join(format!("{}.1", name));
        render(clap_mangen::Man::new(sub.clone()).title(name), &page)?;
    }

    println!("\nTo view the man page:");
    println!("  man -l {}", main_page.display());

    Ok(())
}
