use crate::error::{BinupError, Result};
use crate::platform::PlatformOps;
use std::path::Path;

pub static UNIX_PLATFORM: Unix = Unix;

pub struct Unix;

impl PlatformOps for Unix {
    fn final_binary_name(&self, base: &str) -> String {
        base.to_string()
    }
    fn is_executable(&self, path: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(path) {
            Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
            Err(_) => false,
        }
    }
    fn make_executable(&self, path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let repair_err = |source| BinupError::PermissionRepairFailed {
            path: path.display().to_string(),
            source,
        };
        let mut perms = std::fs::metadata(path).map_err(repair_err)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).map_err(repair_err)?;
        Ok(())
    }
}
