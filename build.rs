//! Build script for Nutritrack
//!
//! Bumps the local build number and embeds build metadata.

use std::fs;
use std::path::Path;

const BUILD_NUMBER_FILE: &str = "build_number.txt";

fn main() {
    println!("cargo:rerun-if-changed=src");

    let build_number_path = Path::new(BUILD_NUMBER_FILE);

    let previous: u64 = fs::read_to_string(build_number_path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let build_number = previous + 1;

    // A read-only checkout still builds, just without a persistent counter
    if let Err(e) = fs::write(build_number_path, build_number.to_string()) {
        println!("cargo:warning=Could not update {}: {}", BUILD_NUMBER_FILE, e);
    }

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    println!("cargo:rustc-env=NUTRITRACK_BUILD_NUMBER={}", build_number);
    println!("cargo:rustc-env=NUTRITRACK_BUILD_TIMESTAMP={}", timestamp);
}
