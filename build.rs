// build.rs

use std::env;

fn main() {
    let version = env::var("OTU_SQLSYNC_VERSION")
        .unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "dev".to_string()));

    println!("cargo:rustc-env=OTU_SQLSYNC_BUILD_VERSION={version}");
    println!("cargo:rerun-if-env-changed=OTU_SQLSYNC_VERSION");
}
