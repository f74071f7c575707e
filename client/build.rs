use std::{env, fs, path::Path};

fn main() {
    // the job server expects `major.minor`
    let version = env::var("CARGO_PKG_VERSION").expect("CARGO_PKG_VERSION not set");
    let short: Vec<&str> = version.split('.').take(2).collect();
    let short = short.join(".");

    let out_dir = env::var("OUT_DIR").unwrap();

    let version_file_path = Path::new(&out_dir).join("version.rs");
    fs::write(&version_file_path, format!("pub const VERSION: &str = \"{}\";", short))
        .expect("Unable to write version file");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
