use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

/// Copies `assets/` into the build output and bakes that location into the crate as
/// `GLOBE_ASSET_DIR`, the fallback used when the viewer is not started from the crate root.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");
    println!("cargo:rerun-if-changed=assets/textures");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.exists() {
        println!("cargo:warning=no assets/ directory, textures will fall back to the placeholder");
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[assets_src], &out_dir, &copy_options)?;
    println!(
        "cargo:rustc-env=GLOBE_ASSET_DIR={}",
        out_dir.join("assets").display()
    );

    Ok(())
}
