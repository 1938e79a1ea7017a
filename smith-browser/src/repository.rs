//! Source repository crawler
//!
//! Walks a hosted repository's directory tree and collects the raw text of
//! every file with a wanted extension:
//! - explicit frontier (breadth-first) plus a visited-path set
//! - hard caps on directories listed and files fetched
//! - file fetches within one directory run concurrently, results keep listing order

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use smith_core::Document;

use crate::{create_http_client, HttpConfig, HttpError};

static REPOSITORY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?(?:[?#].*)?$")
        .unwrap()
});

/// First path segments that are site sections, not repository owners
const RESERVED_OWNERS: &[&str] = &[
    "about", "collections", "explore", "features", "login", "marketplace", "notifications",
    "orgs", "pricing", "search", "settings", "sponsors", "topics", "trending",
];

/// A repository identified from a page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    /// Canonical repository URL
    pub url: String,
}

impl RepositoryRef {
    /// Recognize a two-segment `owner/repo` URL on the code-hosting domain
    pub fn parse(url: &str) -> Option<Self> {
        let caps = REPOSITORY_REGEX.captures(url.trim())?;
        let owner = caps.get(1)?.as_str();
        let name = caps.get(2)?.as_str();

        if RESERVED_OWNERS.contains(&owner.to_ascii_lowercase().as_str()) {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            url: format!("https://github.com/{}/{}", owner, name),
        })
    }
}

/// Kind of a directory listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    /// Path from the repository root
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl RepoEntry {
    pub fn file(path: &str) -> Self {
        Self::new(path, EntryKind::File)
    }

    pub fn dir(path: &str) -> Self {
        Self::new(path, EntryKind::Dir)
    }

    fn new(path: &str, kind: EntryKind) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind,
        }
    }
}

/// Where directory listings and raw file contents come from
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// List one directory (`""` is the root)
    async fn list_dir(&self, repo: &RepositoryRef, path: &str) -> Result<Vec<RepoEntry>, HttpError>;

    /// Raw text of one file
    async fn fetch_raw(&self, repo: &RepositoryRef, path: &str) -> Result<String, HttpError>;
}

/// GitHub contents API plus the raw-content host
pub struct GithubSource {
    client: Client,
    token: Option<String>,
    api_base: String,
    raw_base: String,
}

impl GithubSource {
    pub fn new(config: &HttpConfig, token: Option<String>) -> Result<Self, HttpError> {
        Ok(Self {
            client: create_http_client(config)?,
            token,
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
        })
    }

    /// Use a `GITHUB_TOKEN` from the environment when present
    pub fn from_env(config: &HttpConfig) -> Result<Self, HttpError> {
        Self::new(config, std::env::var("GITHUB_TOKEN").ok())
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response, HttpError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", accept)
            .header("User-Agent", "blacksmith-scout/0.1");

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl RepositorySource for GithubSource {
    async fn list_dir(&self, repo: &RepositoryRef, path: &str) -> Result<Vec<RepoEntry>, HttpError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            repo.owner,
            repo.name,
            encode_path(path)
        );

        let response = self.get(&url, "application/vnd.github.v3+json").await?;

        response
            .json::<Vec<RepoEntry>>()
            .await
            .map_err(|e| HttpError::Decode {
                url,
                reason: e.to_string(),
            })
    }

    async fn fetch_raw(&self, repo: &RepositoryRef, path: &str) -> Result<String, HttpError> {
        let url = format!(
            "{}/{}/{}/HEAD/{}",
            self.raw_base,
            repo.owner,
            repo.name,
            encode_path(path)
        );

        let response = self.get(&url, "text/plain").await?;
        Ok(response.text().await?)
    }
}

/// Bounds on a single repository walk
#[derive(Debug, Clone)]
pub struct CrawlLimits {
    /// Directories listed at most
    pub max_dirs: usize,
    /// Files fetched at most
    pub max_files: usize,
    /// Concurrent raw-file fetches
    pub max_concurrent: usize,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_dirs: 50,
            max_files: 40,
            max_concurrent: 4,
        }
    }
}

/// What a repository walk collected
#[derive(Debug, Clone, Default)]
pub struct RepositoryWalk {
    /// Directories listed, in visiting order
    pub visited_dirs: Vec<String>,
    /// (path, contents) of matched files, in discovery order
    pub files: Vec<(String, String)>,
    /// A cap stopped the walk early
    pub truncated: bool,
}

impl RepositoryWalk {
    /// Blank-line-joined file bodies titled with the repository URL
    pub fn into_document(self, page_url: &str, repo: &RepositoryRef) -> Option<Document> {
        if self.files.is_empty() {
            return None;
        }

        let main_text = self
            .files
            .into_iter()
            .map(|(_, body)| body)
            .collect::<Vec<_>>()
            .join("\n\n");

        Some(Document::new(page_url, &repo.url, main_text))
    }
}

/// Normalize extensions to lowercase with a leading dot
pub fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    extensions
        .into_iter()
        .filter_map(|ext| {
            let ext = ext
                .as_ref()
                .trim()
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
                .to_ascii_lowercase();
            if ext.is_empty() || ext == "." {
                return None;
            }
            Some(if ext.starts_with('.') { ext } else { format!(".{}", ext) })
        })
        .filter(|ext| seen.insert(ext.clone()))
        .collect()
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    let name = name.to_ascii_lowercase();
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// Walk a repository breadth-first, collecting files with the given extensions
pub async fn walk_repository(
    source: &dyn RepositorySource,
    repo: &RepositoryRef,
    extensions: &[String],
    limits: &CrawlLimits,
) -> RepositoryWalk {
    let mut walk = RepositoryWalk::default();
    let mut visited: HashSet<String> = HashSet::new();
    let mut frontier: VecDeque<String> = VecDeque::from([String::new()]);

    info!("Walking {} for {:?}", repo.url, extensions);

    while let Some(dir) = frontier.pop_front() {
        if visited.contains(&dir) {
            continue;
        }
        if walk.files.len() >= limits.max_files {
            warn!("File cap ({}) reached in {}", limits.max_files, repo.url);
            walk.truncated = true;
            break;
        }
        if visited.len() >= limits.max_dirs {
            warn!("Directory cap ({}) reached in {}", limits.max_dirs, repo.url);
            walk.truncated = true;
            break;
        }
        visited.insert(dir.clone());
        walk.visited_dirs.push(dir.clone());

        let entries = match source.list_dir(repo, &dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list '{}' in {}: {}", dir, repo.url, e);
                continue;
            }
        };

        let mut wanted = Vec::new();
        for entry in entries {
            match entry.kind {
                EntryKind::Dir if !visited.contains(&entry.path) => frontier.push_back(entry.path),
                EntryKind::File if has_extension(&entry.name, extensions) => {
                    if walk.files.len() + wanted.len() >= limits.max_files {
                        walk.truncated = true;
                        continue;
                    }
                    wanted.push(entry.path);
                }
                _ => {}
            }
        }

        if wanted.is_empty() {
            continue;
        }

        debug!("Fetching {} files from '{}'", wanted.len(), dir);

        let fetched: Vec<Option<(String, String)>> = stream::iter(wanted)
            .map(|path| async move {
                match source.fetch_raw(repo, &path).await {
                    Ok(body) => Some((path, body)),
                    Err(e) => {
                        warn!("Failed to fetch {}: {}", path, e);
                        None
                    }
                }
            })
            .buffered(limits.max_concurrent.max(1))
            .collect()
            .await;

        walk.files.extend(fetched.into_iter().flatten());
    }

    info!(
        "Walked {} directories in {}, collected {} files",
        walk.visited_dirs.len(),
        repo.url,
        walk.files.len()
    );

    walk
}
