use crate::error::{BinupError, Result};
use semver::{Version, VersionReq};
use std::fmt;
use std::path::PathBuf;

/// A version range in the node-semver style release tags are matched
/// against: exact versions, `^`/`~`, comparators, x-ranges.
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    req: VersionReq,
}

impl Constraint {
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim().to_string();
        let req = VersionReq::parse(&normalize_range(&raw)).map_err(|source| {
            BinupError::InvalidConstraint {
                input: raw.clone(),
                source,
            }
        })?;
        Ok(Self { raw, req })
    }

    /// True when `version` parses as semver and satisfies the range.
    pub fn matches_str(&self, version: &str) -> bool {
        match Version::parse(version) {
            Ok(v) => self.req.matches(&v),
            Err(_) => false,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// A bare complete version means exactly that version (VersionReq would treat
// it as a caret range), and spaced hyphen ranges become bounded comparators.
fn normalize_range(spec: &str) -> String {
    if Version::parse(spec).is_ok() {
        return format!("={spec}");
    }
    if spec.contains('-') && spec.contains(' ') {
        if let Some((a, b)) = spec.split_once('-') {
            let (a, b) = (a.trim(), b.trim());
            if !a.is_empty() && !b.is_empty() {
                // Comparators are comma separated.
                return format!(">={a}, <={b}");
            }
        }
    }
    spec.replace('*', "x")
}

/// What to install: a GitHub repository plus an optional version range and
/// an optional binary name when it differs from the repo name.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub owner: String,
    pub name: String,
    pub constraint: Option<Constraint>,
    pub binary: Option<String>,
}

impl ToolSpec {
    /// Parse `owner/name` or `owner/name@constraint`. `@latest` means the
    /// same as no constraint.
    pub fn parse(spec: &str) -> Result<Self> {
        let (repo, constraint) = match spec.split_once('@') {
            Some((r, c)) => (r, Some(c)),
            None => (spec, None),
        };
        let Some((owner, name)) = repo.split_once('/') else {
            return Err(BinupError::InvalidSpec(spec.to_string()));
        };
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(BinupError::InvalidSpec(spec.to_string()));
        }
        let constraint = match constraint {
            Some("") => return Err(BinupError::InvalidSpec(spec.to_string())),
            Some("latest") | None => None,
            Some(c) => Some(Constraint::parse(c)?),
        };
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            constraint,
            binary: None,
        })
    }

    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn constraint_display(&self) -> String {
        match &self.constraint {
            Some(c) => c.to_string(),
            None => "*".to_string(),
        }
    }
}

/// Build the list of tools to install from the CLI surface, rejecting
/// conflicting combinations before anything touches the network.
pub fn build_specs(
    specs: &[String],
    owner: Option<&str>,
    repo: Option<&str>,
    version: Option<&str>,
    binary: Option<&str>,
) -> Result<Vec<ToolSpec>> {
    if !specs.is_empty() && (owner.is_some() || repo.is_some()) {
        return Err(BinupError::ConflictingInput(
            "pass either SPEC arguments or --owner/--repo, not both".to_string(),
        ));
    }
    if owner.is_some() != repo.is_some() {
        return Err(BinupError::ConflictingInput(
            "--owner and --repo must be given together".to_string(),
        ));
    }
    if let (Some(owner), Some(repo)) = (owner, repo) {
        return Ok(vec![ToolSpec {
            owner: owner.to_string(),
            name: repo.to_string(),
            constraint: version.map(Constraint::parse).transpose()?,
            binary: binary.map(str::to_string),
        }]);
    }
    if specs.is_empty() {
        return Err(BinupError::ConflictingInput(
            "nothing to install: pass owner/name specs or --owner with --repo".to_string(),
        ));
    }
    let mut out = Vec::with_capacity(specs.len());
    for raw in specs {
        let mut spec = ToolSpec::parse(raw)?;
        if version.is_some() && spec.constraint.is_some() {
            return Err(BinupError::ConflictingInput(format!(
                "'{raw}' pins a version and --version is also set"
            )));
        }
        if spec.constraint.is_none() {
            spec.constraint = version.map(Constraint::parse).transpose()?;
        }
        spec.binary = binary.map(str::to_string);
        out.push(spec);
    }
    Ok(out)
}

/// Resolved invocation settings. Constructed once at startup and handed to
/// the installer by value; nothing downstream reads the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_root: PathBuf,
    pub token: Option<String>,
    pub api_base: Option<String>,
}

impl Settings {
    pub fn from_env(root_flag: Option<PathBuf>, token_flag: Option<String>) -> Result<Self> {
        let cache_root = match root_flag {
            Some(dir) => dir,
            None => default_cache_root()?,
        };
        let token = token_flag
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .or_else(|| std::env::var("GH_TOKEN").ok())
            .filter(|t| !t.is_empty());
        // Set in GitHub Actions; also how enterprise hosts are reached.
        let api_base = std::env::var("GITHUB_API_URL").ok().filter(|u| !u.is_empty());
        Ok(Self {
            cache_root,
            token,
            api_base,
        })
    }
}

fn default_cache_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("BINUP_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| BinupError::Config("cannot determine home directory".to_string()))?;
    Ok(home.join(".binup"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_name() {
        let spec = ToolSpec::parse("rust-lang/mdBook").unwrap();
        assert_eq!(spec.owner, "rust-lang");
        assert_eq!(spec.name, "mdBook");
        assert!(spec.constraint.is_none());
    }

    #[test]
    fn parses_constraint_suffix() {
        let spec = ToolSpec::parse("rust-lang/mdBook@0.4.2").unwrap();
        assert_eq!(spec.constraint_display(), "0.4.2");
    }

    #[test]
    fn latest_means_no_constraint() {
        let spec = ToolSpec::parse("cli/cli@latest").unwrap();
        assert!(spec.constraint.is_none());
    }

    #[test]
    fn rejects_missing_owner() {
        assert!(ToolSpec::parse("mdBook").is_err());
        assert!(ToolSpec::parse("/mdBook").is_err());
        assert!(ToolSpec::parse("rust-lang/").is_err());
        assert!(ToolSpec::parse("a/b/c").is_err());
        assert!(ToolSpec::parse("a/b@").is_err());
    }

    #[test]
    fn partial_constraint_behaves_like_caret() {
        let c = Constraint::parse("0.10").unwrap();
        assert!(c.matches_str("0.10.3"));
        assert!(!c.matches_str("0.11.0"));
        assert!(!c.matches_str("0.9.9"));
    }

    #[test]
    fn bare_version_is_exact() {
        let c = Constraint::parse("1.2.3").unwrap();
        assert!(c.matches_str("1.2.3"));
        assert!(!c.matches_str("1.2.4"));
        assert!(!c.matches_str("1.3.0"));
    }

    #[test]
    fn caret_and_tilde_pass_through() {
        let caret = Constraint::parse("^1.2").unwrap();
        assert!(caret.matches_str("1.9.0"));
        assert!(!caret.matches_str("2.0.0"));
        let tilde = Constraint::parse("~1.2.0").unwrap();
        assert!(tilde.matches_str("1.2.9"));
        assert!(!tilde.matches_str("1.3.0"));
    }

    #[test]
    fn hyphen_range_is_bounded() {
        let c = Constraint::parse("1.2.0 - 1.4.0").unwrap();
        assert!(c.matches_str("1.2.0"));
        assert!(c.matches_str("1.3.5"));
        assert!(c.matches_str("1.4.0"));
        assert!(!c.matches_str("1.1.9"));
        assert!(!c.matches_str("1.5.0"));
    }

    #[test]
    fn wildcard_matches_major() {
        let c = Constraint::parse("1.*").unwrap();
        assert!(c.matches_str("1.7.2"));
        assert!(!c.matches_str("2.0.0"));
    }

    #[test]
    fn unparsable_version_never_matches() {
        let c = Constraint::parse("0.4").unwrap();
        assert!(!c.matches_str("not-a-version"));
    }

    #[test]
    fn specs_conflict_with_separate_fields() {
        let err = build_specs(
            &["rust-lang/mdBook".to_string()],
            Some("rust-lang"),
            Some("mdBook"),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, BinupError::ConflictingInput(_)));
    }

    #[test]
    fn version_flag_conflicts_with_pinned_spec() {
        let err = build_specs(
            &["rust-lang/mdBook@0.4.2".to_string()],
            None,
            None,
            Some("0.4.1"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, BinupError::ConflictingInput(_)));
    }

    #[test]
    fn owner_requires_repo() {
        let err = build_specs(&[], Some("rust-lang"), None, None, None).unwrap_err();
        assert!(matches!(err, BinupError::ConflictingInput(_)));
    }

    #[test]
    fn version_flag_applies_to_unpinned_specs() {
        let specs = build_specs(
            &["rust-lang/mdBook".to_string()],
            None,
            None,
            Some("0.4"),
            None,
        )
        .unwrap();
        assert_eq!(specs[0].constraint_display(), "0.4");
    }

    #[test]
    fn separate_fields_build_one_spec() {
        let specs = build_specs(
            &[],
            Some("rust-lang"),
            Some("mdBook"),
            Some("0.4.2"),
            Some("mdbook"),
        )
        .unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].repo_slug(), "rust-lang/mdBook");
        assert_eq!(specs[0].binary.as_deref(), Some("mdbook"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(build_specs(&[], None, None, None, None).is_err());
    }
}
