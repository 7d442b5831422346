use crate::config::Constraint;
use crate::error::Result;
use chrono::{DateTime, Utc};
use fs_err as fs;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Receipt written into each cache entry when it is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub owner: String,
    pub name: String,
    pub version: String,
    pub installed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
}

/// A versioned entry under the cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTool {
    pub version: String,
    pub dir: PathBuf,
}

/// On-disk layout: one `<root>/tools/<name>/<version>/` directory per entry,
/// with `<root>/tmp` holding downloads and staging so renames into the final
/// slot stay on one filesystem.
pub struct ToolCache {
    root: PathBuf,
}

impl ToolCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn tool_dir(&self, name: &str) -> PathBuf {
        self.root.join("tools").join(name)
    }

    pub fn entry_dir(&self, name: &str, version: &str) -> PathBuf {
        self.tool_dir(name).join(version)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Newest cached version satisfying the range, if any. Read-only: a miss
    /// leaves no directories behind.
    pub fn find(&self, name: &str, constraint: Option<&Constraint>) -> Option<CachedTool> {
        for (version, dir) in self.versions(name) {
            let satisfied = match constraint {
                Some(c) => c.matches_str(&version),
                None => true,
            };
            if satisfied {
                return Some(CachedTool { version, dir });
            }
        }
        None
    }

    /// Version entries for one tool, newest first. Directory names that do
    /// not parse as semver sort after the ones that do.
    fn versions(&self, name: &str) -> Vec<(String, PathBuf)> {
        let Ok(entries) = fs::read_dir(self.tool_dir(name)) else {
            return Vec::new();
        };
        let mut found: Vec<(Option<Version>, String, PathBuf)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(version) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let parsed = Version::parse(&version).ok();
            found.push((parsed, version, path));
        }
        found.sort_by(|(pa, na, _), (pb, nb, _)| match (pa, pb) {
            (Some(a), Some(b)) => b.cmp(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => na.cmp(nb),
        });
        found.into_iter().map(|(_, v, p)| (v, p)).collect()
    }

    /// Move a staged directory into its final slot and return it. An
    /// existing entry for the same version is replaced; because entries only
    /// ever appear by rename, readers never observe a half-written one.
    pub fn store(&self, src: &Path, name: &str, version: &str) -> Result<PathBuf> {
        let dest = self.entry_dir(name, version);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        fs::rename(src, &dest)?;
        tracing::debug!("cached {name} {version} at {}", dest.display());
        Ok(dest)
    }

    pub fn write_manifest(&self, dir: &Path, manifest: &Manifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    pub fn read_manifest(&self, dir: &Path) -> Option<Manifest> {
        let data = fs::read(dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Every cached tool with its versions, newest first, for `list`.
    pub fn entries(&self) -> Result<Vec<(String, Vec<CachedTool>)>> {
        let tools_dir = self.root.join("tools");
        if !tools_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&tools_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        let mut out = Vec::new();
        for name in names {
            let versions = self
                .versions(&name)
                .into_iter()
                .map(|(version, dir)| CachedTool { version, dir })
                .collect();
            out.push((name, versions));
        }
        Ok(out)
    }

    /// Drop one version, or every version of a tool. Returns whether
    /// anything was removed.
    pub fn remove(&self, name: &str, version: Option<&str>) -> Result<bool> {
        let target = match version {
            Some(v) => self.entry_dir(name, v),
            None => self.tool_dir(name),
        };
        if !target.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&target)?;
        Ok(true)
    }

    /// Fresh per-install extraction directory; leftovers from a crashed run
    /// are cleared first.
    pub fn staging_dir(&self, name: &str, version: &str) -> Result<PathBuf> {
        let dir = self.tmp_dir().join(format!("{name}-{version}.extract"));
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Well-known staging directory a naked binary is parked in before
    /// caching. Created idempotently.
    pub fn binary_stage_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.tmp_dir().join(format!("bin-{name}"));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
