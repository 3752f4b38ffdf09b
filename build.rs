use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Embed the Windows manifest (per-monitor DPI awareness, see the .manifest file)
    let _ = embed_resource::compile("auto-game-screenshot.rc", embed_resource::NONE);
    println!("cargo:rerun-if-changed=auto-game-screenshot.rc");
    println!("cargo:rerun-if-changed=auto-game-screenshot.exe.manifest");

    copy_config();
}

/// Returns target/release (or target/debug) from OUT_DIR.
fn target_dir() -> Option<PathBuf> {
    let out_dir = env::var("OUT_DIR").ok()?;
    // OUT_DIR is target/<profile>/build/<crate>-<hash>/out
    Path::new(&out_dir).ancestors().nth(3).map(Path::to_path_buf)
}

/// Copies config.json next to the built executable so it is found at runtime.
fn copy_config() {
    let config_src = Path::new("config.json");
    println!("cargo:rerun-if-changed=config.json");
    if !config_src.exists() {
        return;
    }

    if let Some(target_dir) = target_dir() {
        let _ = fs::copy(config_src, target_dir.join("config.json"));
    }
}
