use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinupError {
    #[error("Unsupported platform: {arch} {os}")]
    UnsupportedPlatform { arch: String, os: String },

    #[error("No release of {tool} matching {constraint} has an asset for this platform")]
    NoMatchingRelease { tool: String, constraint: String },

    #[error("Conflicting input: {0}")]
    ConflictingInput(String),

    #[error("Invalid tool spec '{0}' (expected owner/name or owner/name@version)")]
    InvalidSpec(String),

    #[error("Invalid version constraint '{input}': {source}")]
    InvalidConstraint { input: String, source: semver::Error },

    #[error("GitHub API request {url} returned {status}")]
    Api {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to download {url}: {source}")]
    DownloadFailed { url: String, source: reqwest::Error },

    #[error("Failed to extract archive: {0}")]
    ExtractionFailed(String),

    #[error("Failed to mark {path} executable: {source}")]
    PermissionRepairFailed { path: String, source: std::io::Error },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BinupError>;
