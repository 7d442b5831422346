use crate::config::{build_specs, Settings};
use crate::installer::Installer;
use anyhow::Result;
use std::path::PathBuf;

pub struct InstallArgs<'a> {
    pub specs: &'a [String],
    pub owner: Option<&'a str>,
    pub repo: Option<&'a str>,
    pub version: Option<&'a str>,
    pub bin: Option<&'a str>,
    pub token: Option<String>,
    pub dir: Option<PathBuf>,
}

pub fn run_install(args: InstallArgs) -> Result<()> {
    // Input validation happens before settings or network clients exist.
    let specs = build_specs(args.specs, args.owner, args.repo, args.version, args.bin)?;
    let settings = Settings::from_env(args.dir, args.token)?;
    let installer = Installer::new(settings)?;

    let mut failures = 0;
    for spec in &specs {
        match installer.check_or_install(spec) {
            Ok(tool) => {
                println!("{} v{} installed", tool.name, tool.version);
                println!("  {}", tool.dir.display());
            }
            Err(e) => {
                eprintln!("{} failed: {e}", spec.repo_slug());
                failures += 1;
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} tool(s) failed");
    }
    Ok(())
}
