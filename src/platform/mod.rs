pub fn platform() -> &'static dyn PlatformOps {
    &ConcretePlatform
}

use crate::error::Result;
use std::path::Path;

pub trait PlatformOps: Sync + Send {
    fn final_binary_name(&self, base: &str) -> String;
    fn is_executable(&self, path: &Path) -> bool;
    fn make_executable(&self, path: &Path) -> Result<()>;
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UNIX_PLATFORM as ConcretePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WINDOWS_PLATFORM as ConcretePlatform;
