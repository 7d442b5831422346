use crate::config::ToolSpec;
use crate::error::{BinupError, Result};
use crate::github::{Asset, ReleaseClient};

/// The asset chosen from a release: the exact version (tag minus a leading
/// `v`) plus its download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    pub version: String,
    pub download_url: String,
}

/// Find the newest release carrying an asset for one of `targets` and, when
/// a constraint is set, a satisfying version. Selection is recency-first:
/// the newest qualifying release wins, never a better-matching older one,
/// and no further pages are fetched once a page produces a winner.
pub fn locate_release(
    client: &ReleaseClient,
    spec: &ToolSpec,
    targets: &[&str],
) -> Result<ReleaseCandidate> {
    for page in client.releases(&spec.owner, &spec.name) {
        for release in page? {
            let Some(asset) = match_asset(&release.assets, targets) else {
                continue;
            };
            let version = release
                .tag_name
                .strip_prefix('v')
                .unwrap_or(&release.tag_name)
                .to_string();
            if !single_path_component(&version) {
                tracing::debug!("skipping tag {}: not a usable version", release.tag_name);
                continue;
            }
            if let Some(constraint) = &spec.constraint {
                if !constraint.matches_str(&version) {
                    tracing::debug!(
                        "skipping {}: {} does not satisfy {}",
                        release.tag_name,
                        version,
                        constraint
                    );
                    continue;
                }
            }
            tracing::debug!("selected {} via asset {}", version, asset.name);
            return Ok(ReleaseCandidate {
                version,
                download_url: asset.browser_download_url.clone(),
            });
        }
    }
    Err(BinupError::NoMatchingRelease {
        tool: spec.repo_slug(),
        constraint: spec.constraint_display(),
    })
}

// The version becomes the `<version>` path segment of a cache entry; git
// permits `release/1.2`-style tags, which would nest the entry where cache
// lookups never find it.
fn single_path_component(version: &str) -> bool {
    !version.is_empty() && !version.contains(['/', '\\'])
}

/// First asset whose filename mentions a target, trying every asset against
/// the most-preferred target before falling back to the next one.
fn match_asset<'a>(assets: &'a [Asset], targets: &[&str]) -> Option<&'a Asset> {
    for target in targets {
        if let Some(asset) = assets.iter().find(|a| a.name.contains(target)) {
            return Some(asset);
        }
    }
    None
}
