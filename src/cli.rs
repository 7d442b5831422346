use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    name = "binup",
    about = "Install prebuilt tool binaries from GitHub releases into a local cache"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Cache root (defaults to $BINUP_DIR, then ~/.binup)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install one or more tools from their GitHub releases.
    /// Examples:
    ///   binup install rust-lang/mdBook            # newest release with a usable asset
    ///   binup install rust-lang/mdBook@0.4        # newest 0.4.x release
    ///   binup install BurntSushi/ripgrep cli/cli@2.52.0
    ///   binup install --owner rust-lang --repo mdBook --version 0.4.2
    Install {
        /// Tool specs (owner/name or owner/name@constraint)
        #[arg(value_name = "SPEC")]
        specs: Vec<String>,
        /// Repository owner (with --repo, instead of a SPEC)
        #[arg(long)]
        owner: Option<String>,
        /// Repository name (with --owner, instead of a SPEC)
        #[arg(long)]
        repo: Option<String>,
        /// Version constraint (exact, caret/tilde, comparators, x-ranges)
        #[arg(long)]
        version: Option<String>,
        /// Binary name inside the release when it differs from the repo name
        #[arg(long)]
        bin: Option<String>,
        /// GitHub token (defaults to $GITHUB_TOKEN, then $GH_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },
    /// List cached tools and versions
    List,
    /// Remove cached tools: every version, or one with name@version
    Uninstall {
        /// Tool names (name or name@version)
        #[arg(value_name = "NAME")]
        names: Vec<String>,
    },
    /// Print the release asset targets probed for this machine
    Targets,
}
