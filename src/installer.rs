use crate::cache::{CachedTool, Manifest, ToolCache};
use crate::config::{Settings, ToolSpec};
use crate::error::{BinupError, Result};
use crate::github::ReleaseClient;
use crate::locator::{locate_release, ReleaseCandidate};
use crate::platform::platform;
use crate::target::current_targets;
use flate2::read::GzDecoder;
use fs_err as fs;
use std::path::{Path, PathBuf};
use tar::Archive;
use zip::ZipArchive;

/// A tool present in the cache, ready to run. The version is the exact one
/// that was resolved and stored, carried through from the release tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledTool {
    pub owner: String,
    pub name: String,
    pub version: String,
    pub dir: PathBuf,
    pub binary: Option<String>,
}

pub struct Installer {
    client: ReleaseClient,
    cache: ToolCache,
}

impl Installer {
    pub fn new(settings: Settings) -> Result<Self> {
        let mut client = ReleaseClient::new(settings.token)?;
        if let Some(base) = &settings.api_base {
            client = client.with_api_base(base);
        }
        Ok(Self {
            client,
            cache: ToolCache::new(settings.cache_root),
        })
    }

    #[cfg(test)]
    fn with_client(client: ReleaseClient, cache: ToolCache) -> Self {
        Self { client, cache }
    }

    /// Install `spec` unless a satisfying version is already cached; a warm
    /// cache means no network traffic at all. Returns the cached location
    /// either way.
    pub fn check_or_install(&self, spec: &ToolSpec) -> Result<InstalledTool> {
        if let Some(hit) = self.cache.find(&spec.name, spec.constraint.as_ref()) {
            tracing::info!("{} {} already cached", spec.name, hit.version);
            return Ok(self.from_cache(spec, hit));
        }
        let targets = current_targets()?;
        self.install(spec, &targets)
    }

    /// Resolve, download, extract, cache and repair permissions.
    pub fn install(&self, spec: &ToolSpec, targets: &[&str]) -> Result<InstalledTool> {
        let candidate = locate_release(&self.client, spec, targets)?;
        tracing::info!("installing {} {}", spec.repo_slug(), candidate.version);

        let artifact = self
            .client
            .download(&candidate.download_url, &self.cache.tmp_dir())?;
        let extracted = self.extract(spec, &candidate, &artifact)?;
        let normalized = normalize_layout(&extracted)?;

        let dir = self
            .cache
            .store(&normalized, &spec.name, &candidate.version)?;
        let tool = InstalledTool {
            owner: spec.owner.clone(),
            name: spec.name.clone(),
            version: candidate.version,
            dir,
            binary: spec.binary.clone(),
        };
        self.cache.write_manifest(
            &tool.dir,
            &Manifest {
                owner: tool.owner.clone(),
                name: tool.name.clone(),
                version: tool.version.clone(),
                installed_at: chrono::Utc::now(),
                binary: tool.binary.clone(),
            },
        )?;
        // The naked-binary path already moved the artifact away; for
        // archives this drops the downloaded file.
        let _ = fs::remove_file(&artifact);
        if normalized != extracted {
            let _ = fs::remove_dir_all(&extracted);
        }

        repair_permissions(&tool.dir, spec)?;

        Ok(tool)
    }

    /// Pick apart the artifact by its download URL suffix. Unrecognized
    /// suffixes are treated as a naked executable and parked in a staging
    /// directory under the binary name, so caching sees the same shape as an
    /// extracted archive.
    fn extract(
        &self,
        spec: &ToolSpec,
        candidate: &ReleaseCandidate,
        artifact: &Path,
    ) -> Result<PathBuf> {
        let url = &candidate.download_url;
        if url.ends_with(".zip") {
            let dir = self
                .cache
                .staging_dir(&spec.name, &candidate.version)
                .map_err(extraction_err)?;
            extract_zip(artifact, &dir)?;
            Ok(dir)
        } else if url.ends_with(".tar.gz") || url.ends_with(".tgz") {
            let dir = self
                .cache
                .staging_dir(&spec.name, &candidate.version)
                .map_err(extraction_err)?;
            extract_tar_gz(artifact, &dir)?;
            Ok(dir)
        } else {
            let dir = self
                .cache
                .binary_stage_dir(&spec.name)
                .map_err(extraction_err)?;
            let base = spec.binary.as_deref().unwrap_or(&spec.name);
            let dest = dir.join(platform().final_binary_name(base));
            if dest.exists() {
                fs::remove_file(&dest).map_err(extraction_err)?;
            }
            fs::rename(artifact, &dest).map_err(extraction_err)?;
            Ok(dir)
        }
    }

    fn from_cache(&self, spec: &ToolSpec, hit: CachedTool) -> InstalledTool {
        InstalledTool {
            owner: spec.owner.clone(),
            name: spec.name.clone(),
            version: hit.version,
            dir: hit.dir,
            binary: spec.binary.clone(),
        }
    }
}

/// Print cached tools with their versions, for the CLI.
pub fn list(cache: &ToolCache) -> Result<()> {
    let entries = cache.entries()?;
    if entries.is_empty() {
        println!("cache is empty");
        return Ok(());
    }
    for (name, versions) in entries {
        for tool in versions {
            match cache.read_manifest(&tool.dir) {
                Some(m) => println!(
                    "{name} {} ({}/{}, installed {})",
                    tool.version,
                    m.owner,
                    m.name,
                    m.installed_at.format("%Y-%m-%d")
                ),
                None => println!("{name} {}", tool.version),
            }
        }
    }
    Ok(())
}

// Anything that goes wrong while turning an artifact into a staged
// directory is an extraction failure, staging directories included.
fn extraction_err(err: impl std::fmt::Display) -> BinupError {
    BinupError::ExtractionFailed(err.to_string())
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path).map_err(extraction_err)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.unpack(dest).map_err(extraction_err)?;
    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path).map_err(extraction_err)?;
    let mut archive = ZipArchive::new(file).map_err(extraction_err)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(extraction_err)?;
        let Some(rel) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let out_path = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(extraction_err)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(extraction_err)?;
        }
        let mut out = fs::File::create(&out_path).map_err(extraction_err)?;
        std::io::copy(&mut entry, &mut out).map_err(extraction_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                    .map_err(extraction_err)?;
            }
        }
    }
    Ok(())
}

/// Collapse the single top-level directory most release archives wrap their
/// files in. Applies at most one level, and only when that lone entry is a
/// directory.
fn normalize_layout(dir: &Path) -> Result<PathBuf> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        entries.push(entry?.path());
    }
    if entries.len() == 1 && entries[0].is_dir() {
        return Ok(entries[0].clone());
    }
    Ok(dir.to_path_buf())
}

/// Release archives regularly ship binaries without the exec bit; repair it
/// inside the cached entry. Missing or unreadable counts as "needs repair",
/// and the platform decides whether anything is done at all.
fn repair_permissions(dir: &Path, spec: &ToolSpec) -> Result<()> {
    let path = locate_binary(dir, spec);
    if platform().is_executable(&path) {
        return Ok(());
    }
    tracing::debug!("restoring exec bit on {}", path.display());
    platform().make_executable(&path)
}

/// The binary to repair: the explicit name when given, else a
/// case-insensitive directory match on the platform binary name, else that
/// name verbatim.
fn locate_binary(dir: &Path, spec: &ToolSpec) -> PathBuf {
    if let Some(binary) = &spec.binary {
        return dir.join(platform().final_binary_name(binary));
    }
    let wanted = platform().final_binary_name(&spec.name);
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if name.eq_ignore_ascii_case(&wanted) {
                    return entry.path();
                }
            }
        }
    }
    dir.join(wanted)
}
