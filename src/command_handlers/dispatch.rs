use crate::cache::ToolCache;
use crate::cli::Commands;
use crate::command_handlers::{install, uninstall};
use crate::config::Settings;
use crate::{installer, target};
use anyhow::Result;
use std::path::PathBuf;

pub fn dispatch(cmd: Commands, dir: Option<PathBuf>) -> Result<()> {
    match cmd {
        Commands::Install {
            specs,
            owner,
            repo,
            version,
            bin,
            token,
        } => {
            let args = install::InstallArgs {
                specs: &specs,
                owner: owner.as_deref(),
                repo: repo.as_deref(),
                version: version.as_deref(),
                bin: bin.as_deref(),
                token,
                dir,
            };
            install::run_install(args)
        }
        Commands::List => {
            let settings = Settings::from_env(dir, None)?;
            installer::list(&ToolCache::new(settings.cache_root))?;
            Ok(())
        }
        Commands::Uninstall { names } => uninstall::run_uninstall(&names, dir),
        Commands::Targets => {
            for target in target::current_targets()? {
                println!("{target}");
            }
            Ok(())
        }
    }
}
