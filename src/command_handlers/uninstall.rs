use crate::cache::ToolCache;
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

pub fn run_uninstall(names: &[String], dir: Option<PathBuf>) -> Result<()> {
    if names.is_empty() {
        anyhow::bail!("at least one tool name required");
    }
    let settings = Settings::from_env(dir, None)?;
    let cache = ToolCache::new(settings.cache_root);
    for raw in names {
        let (name, version) = match raw.split_once('@') {
            Some((n, v)) => (n, Some(v)),
            None => (raw.as_str(), None),
        };
        match cache.remove(name, version) {
            Ok(true) => println!("Removed {raw}"),
            Ok(false) => println!("{raw} not in cache"),
            Err(e) => eprintln!("Uninstall {raw} failed: {e}"),
        }
    }
    Ok(())
}
