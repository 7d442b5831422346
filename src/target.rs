use crate::error::{BinupError, Result};

/// Asset-name targets to probe for a host platform, most preferred first.
/// On Linux a static musl build beats a gnu one, so both are listed.
pub fn resolve_targets(arch: &str, os: &str) -> Result<Vec<&'static str>> {
    let targets = match (arch, os) {
        ("x86_64", "linux") => vec!["x86_64-unknown-linux-musl", "x86_64-unknown-linux-gnu"],
        ("x86_64", "macos") => vec!["x86_64-apple-darwin"],
        ("x86_64", "windows") => vec!["x86_64-pc-windows-msvc"],
        ("aarch64", "linux") => vec!["aarch64-unknown-linux-musl", "aarch64-unknown-linux-gnu"],
        ("aarch64", "macos") => vec!["aarch64-apple-darwin"],
        ("aarch64", "windows") => vec!["aarch64-pc-windows-msvc"],
        _ => {
            return Err(BinupError::UnsupportedPlatform {
                arch: arch.to_string(),
                os: os.to_string(),
            })
        }
    };
    Ok(targets)
}

pub fn current_targets() -> Result<Vec<&'static str>> {
    resolve_targets(std::env::consts::ARCH, std::env::consts::OS)
}
