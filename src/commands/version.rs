// src/commands/version.rs

use std::process::ExitCode;
use std::sync::OnceLock;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEBUG: &str = env!("VERGEN_CARGO_DEBUG");
const TARGET_TRIPLE: &str = env!("VERGEN_CARGO_TARGET_TRIPLE");
const BUILD_DATE: &str = env!("VERGEN_BUILD_DATE");

fn simplify_target(target: &str) -> String {
    target
        .replace("unknown-", "")
        .replace("-gnu", "")
        .replace("-musl", "")
}

fn profile() -> &'static str {
    if DEBUG == "true" { "debug" } else { "release" }
}

fn make_version_string() -> String {
    // 0.1.0 (debug linux-x86_64, built 2026-02-16)
    format!(
        "{VERSION} ({} {}, built {BUILD_DATE})",
        profile(),
        simplify_target(TARGET_TRIPLE)
    )
}

pub fn version_string() -> &'static str {
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(make_version_string)
}

pub fn print_version() -> ExitCode {
    println!("scanguard {}", version_string());
    println!("engine: scanguard-engine {VERSION}");
    println!("fiber strategy: corosensei, {} byte default stack", crate::Strategy::DEFAULT_FIBER_STACK);
    ExitCode::SUCCESS
}
