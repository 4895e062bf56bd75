//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `memolog_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("memolog_core version={}", memolog_core::core_version());
    println!(
        "memolog_core schema_version={}",
        memolog_core::db::migrations::latest_version()
    );
}
