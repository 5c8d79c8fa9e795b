//! Puts the STM32H743 `memory.x` on the linker search path for target builds.
//!
//! Host test builds skip this: they link against std and never see `link.x`.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../memory.x");

    if env::var_os("CARGO_FEATURE_HARDWARE").is_none() {
        return Ok(());
    }

    let out = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR not set"))?;
    fs::write(out.join("memory.x"), include_bytes!("../../memory.x"))?;
    println!("cargo:rustc-link-search={}", out.display());
    Ok(())
}
