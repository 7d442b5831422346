use crate::error::{BinupError, Result};
use fs_err as fs;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const GITHUB_API: &str = "https://api.github.com";
const DEFAULT_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// Blocking GitHub client for release listings and asset downloads.
pub struct ReleaseClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: Option<String>,
    pub(crate) per_page: u32,
}

impl ReleaseClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self {
            http,
            api_base: GITHUB_API.to_string(),
            token,
            per_page: DEFAULT_PER_PAGE,
        })
    }

    /// Point the client at a different API root (GitHub Enterprise, tests).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Release pages for a repository, newest first, fetched on demand.
    /// Dropping the iterator early is how callers stop paging.
    pub fn releases<'a>(&'a self, owner: &'a str, repo: &'a str) -> ReleasePages<'a> {
        ReleasePages {
            client: self,
            owner,
            repo,
            page: 1,
            done: false,
        }
    }

    fn fetch_page(&self, owner: &str, repo: &str, page: u32) -> Result<Vec<Release>> {
        let url = format!(
            "{}/repos/{owner}/{repo}/releases?per_page={}&page={page}",
            self.api_base, self.per_page
        );
        tracing::debug!("fetching {url}");
        let mut req = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let resp = req.send()?;
        if !resp.status().is_success() {
            return Err(BinupError::Api {
                url,
                status: resp.status(),
            });
        }
        Ok(resp.json()?)
    }

    /// Download `url` into `dest_dir`, returning the file path. The filename
    /// is prefixed with a digest of the URL so concurrent runs cannot
    /// clobber each other.
    pub fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir)?;
        let filename = download_filename(url);
        let dest = dest_dir.join(&filename);
        let mut req = self.http.get(url);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let mut resp = req
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|source| BinupError::DownloadFailed {
                url: url.to_string(),
                source,
            })?;
        let pb = match resp.content_length() {
            Some(len) => ProgressBar::new(len).with_style(
                ProgressStyle::with_template("{bar:30.cyan/blue} {bytes}/{total_bytes} {msg}")
                    .unwrap(),
            ),
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(filename);
        let mut out = pb.wrap_write(fs::File::create(&dest)?);
        resp.copy_to(&mut out)
            .map_err(|source| BinupError::DownloadFailed {
                url: url.to_string(),
                source,
            })?;
        pb.finish_and_clear();
        Ok(dest)
    }
}

fn download_filename(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    let base = url.split('/').last().unwrap_or("asset");
    format!("{}-{base}", &digest[..12])
}

pub struct ReleasePages<'a> {
    client: &'a ReleaseClient,
    owner: &'a str,
    repo: &'a str,
    page: u32,
    done: bool,
}

impl Iterator for ReleasePages<'_> {
    type Item = Result<Vec<Release>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let page = match self.client.fetch_page(self.owner, self.repo, self.page) {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        if page.is_empty() {
            self.done = true;
            return None;
        }
        // A short page is the last one; stopping here saves the extra
        // empty-page round trip.
        if (page.len() as u32) < self.client.per_page {
            self.done = true;
        }
        self.page += 1;
        Some(Ok(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn page_query(per_page: &str, page: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("per_page".into(), per_page.into()),
            Matcher::UrlEncoded("page".into(), page.into()),
        ])
    }

    fn release_json(tag: &str) -> serde_json::Value {
        serde_json::json!({
            "tag_name": tag,
            "assets": [{
                "name": format!("tool-{tag}-x86_64-unknown-linux-musl.tar.gz"),
                "browser_download_url": format!("https://example.invalid/{tag}"),
            }],
        })
    }

    #[test]
    fn short_page_ends_iteration() {
        let mut server = mockito::Server::new();
        let page1 = server
            .mock("GET", "/repos/o/r/releases")
            .match_query(page_query("2", "1"))
            .with_body(
                serde_json::json!([release_json("v2.0.0"), release_json("v1.9.0")]).to_string(),
            )
            .create();
        let page2 = server
            .mock("GET", "/repos/o/r/releases")
            .match_query(page_query("2", "2"))
            .with_body(serde_json::json!([release_json("v1.8.0")]).to_string())
            .create();

        let mut client = ReleaseClient::new(None).unwrap().with_api_base(&server.url());
        client.per_page = 2;
        let pages: Vec<_> = client
            .releases("o", "r")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0][0].tag_name, "v2.0.0");
        assert_eq!(pages[1][0].tag_name, "v1.8.0");
        page1.assert();
        page2.assert();
    }

    #[test]
    fn empty_listing_yields_no_pages() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/o/empty/releases")
            .match_query(Matcher::Any)
            .with_body("[]")
            .create();

        let client = ReleaseClient::new(None).unwrap().with_api_base(&server.url());
        assert_eq!(client.releases("o", "empty").count(), 0);
    }

    #[test]
    fn api_failure_surfaces_status() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/o/missing/releases")
            .match_query(Matcher::Any)
            .with_status(404)
            .create();

        let client = ReleaseClient::new(None).unwrap().with_api_base(&server.url());
        let err = client
            .releases("o", "missing")
            .next()
            .unwrap()
            .unwrap_err();
        match err {
            BinupError::Api { status, .. } => assert_eq!(status.as_u16(), 404),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn token_is_sent_as_bearer() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/o/r/releases")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer t0ken")
            .with_body("[]")
            .create();

        let client = ReleaseClient::new(Some("t0ken".to_string()))
            .unwrap()
            .with_api_base(&server.url());
        let _ = client.releases("o", "r").count();
        mock.assert();
    }

    #[test]
    fn download_writes_unique_file() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/dl/tool.tar.gz")
            .with_body("payload")
            .create();

        let tmp = tempfile::tempdir().unwrap();
        let client = ReleaseClient::new(None).unwrap();
        let url = format!("{}/dl/tool.tar.gz", server.url());
        let path = client.download(&url, tmp.path()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("-tool.tar.gz"));
        assert_ne!(name, "tool.tar.gz");
    }

    #[test]
    fn download_failure_names_url() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/dl/gone").with_status(500).create();

        let tmp = tempfile::tempdir().unwrap();
        let client = ReleaseClient::new(None).unwrap();
        let url = format!("{}/dl/gone", server.url());
        let err = client.download(&url, tmp.path()).unwrap_err();
        match err {
            BinupError::DownloadFailed { url: u, .. } => assert_eq!(u, url),
            other => panic!("unexpected error: {other}"),
        }
    }
}
