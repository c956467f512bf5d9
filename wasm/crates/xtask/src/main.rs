use std::path::Path;

use anyhow::{Context as _, Result};
use xshell::{Shell, cmd};

const TARGET: &str = "wasm32-wasip1";

/// Guest crates built as gateway modules.
const GUESTS: &[&str] = &["primality-tester"];

fn main() -> Result<()> {
    let workspace_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .context("xtask must live in <workspace>/crates/xtask")?;
    std::env::set_current_dir(workspace_dir)?;

    let task = std::env::args().nth(1);

    let sh = Shell::new()?;
    let f = task
        .as_deref()
        .and_then(|cmd| TASKS.iter().find_map(|(k, f)| (*k == cmd).then_some(*f)))
        .unwrap_or(print_help);
    f(&sh)
}

#[allow(clippy::type_complexity)]
const TASKS: &[(&str, fn(&Shell) -> Result<()>)] = &[("build-all", build_all)];

fn print_help(_sh: &Shell) -> Result<()> {
    println!("Tasks:");
    for (name, _) in TASKS {
        println!("  - {name}");
    }
    Ok(())
}

fn build_all(sh: &Shell) -> Result<()> {
    for guest in GUESTS {
        cmd!(sh, "cargo build --profile release --target {TARGET} -p {guest}")
            .env("CARGO_PROFILE_RELEASE_OPT_LEVEL", "s")
            .env("CARGO_PROFILE_RELEASE_PANIC", "abort")
            .run()?;
        println!("built target/{TARGET}/release/{guest}.wasm");
    }
    Ok(())
}
