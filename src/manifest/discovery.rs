//! Locating manifest files.
//!
//! Targets can be a local directory, a single manifest file, a GitHub
//! repository page, a GitHub search results page, or a direct manifest URL.
//! Failures here never abort a scan: a page or directory that cannot be read
//! simply contributes no files.

use std::path::Path;

use futures::future::join_all;
use regex::Regex;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::ManifestError;
use crate::model::{Ecosystem, ManifestFile, ManifestFiles};

const GITHUB: &str = "https://github.com";

/// Returns the ecosystem whose parser handles the file at `path`.
///
/// Only the final path segment is considered; query strings and fragments
/// are ignored.
pub fn classify_path(path: &str) -> Option<Ecosystem> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);

    if file_name.ends_with("package.json") {
        return Some(Ecosystem::Npm);
    }
    if file_name == "Gemfile" || file_name.starts_with("Gemfile.") {
        return Some(Ecosystem::Ruby);
    }
    if is_requirements_file(file_name) {
        return Some(Ecosystem::Python);
    }
    None
}

/// Matches `requirements.txt` and `requirements.<anything>.txt`.
fn is_requirements_file(file_name: &str) -> bool {
    file_name.match_indices("requirements").any(|(i, m)| {
        let rest = &file_name[i + m.len()..];
        rest == ".txt" || (rest.len() > ".txt".len() && rest.starts_with('.') && rest.ends_with(".txt"))
    })
}

/// Picks the ecosystem to scan when none was requested.
///
/// The target itself wins (a URL pointing at a Gemfile means ruby); otherwise
/// the first ecosystem, in ruby, npm, python order, that has any files.
pub fn detect_ecosystem(target: &str, files: &ManifestFiles) -> Option<Ecosystem> {
    let target = target.to_lowercase();

    if target.contains("gemfile") {
        return Some(Ecosystem::Ruby);
    }
    if target.contains("package.json") {
        return Some(Ecosystem::Npm);
    }
    if target.contains("requirements") {
        return Some(Ecosystem::Python);
    }

    [Ecosystem::Ruby, Ecosystem::Npm, Ecosystem::Python]
        .into_iter()
        .find(|ecosystem| files.has(*ecosystem))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "node_modules"
}

/// Walks a local directory (or classifies a single file) for manifests.
pub fn discover_local(root: &Path) -> ManifestFiles {
    let mut files = ManifestFiles::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let location = entry.path().display().to_string();
        if let Some(ecosystem) = classify_path(&location) {
            debug!(ecosystem = ecosystem.as_str(), file = %location, "found manifest");
            files.push(ecosystem, ManifestFile::new(location));
        }
    }

    files
}

fn hrefs(html: &str) -> Result<Vec<String>, ManifestError> {
    let re = Regex::new(r#"href\s*=\s*["']([^"']+)["']"#)?;
    Ok(re
        .captures_iter(html)
        .map(|caps| caps[1].replace("&amp;", "&"))
        .collect())
}

fn site_relative(href: &str) -> &str {
    href.strip_prefix(GITHUB).unwrap_or(href)
}

/// Converts `/owner/repo/blob/...` into the raw content URL.
fn raw_url(href: &str) -> String {
    format!("{}{}", GITHUB, site_relative(href).replacen("/blob/", "/raw/", 1))
}

/// Collects manifest links listed on a repository page.
pub fn extract_file_links(html: &str) -> Result<ManifestFiles, ManifestError> {
    let mut files = ManifestFiles::new();

    for href in hrefs(html)? {
        if !href.contains("/blob/") {
            continue;
        }
        if let Some(ecosystem) = classify_path(&href) {
            files.push(ecosystem, ManifestFile::new(raw_url(&href)));
        }
    }

    Ok(files)
}

/// Collects repository URLs from a search results page.
///
/// Both repository results (`/owner/repo`) and code results
/// (`/owner/repo/blob/...`) point at a repository.
pub fn extract_repo_links(html: &str) -> Result<Vec<String>, ManifestError> {
    let mut repos: Vec<String> = Vec::new();

    for href in hrefs(html)? {
        let path = site_relative(&href);
        let Some(rest) = path.strip_prefix('/') else {
            continue;
        };
        let segments: Vec<&str> = rest.split('/').collect();

        let repo = match segments.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Some((*owner, *name)),
            [owner, name, "blob", ..] if !owner.is_empty() && !name.is_empty() => {
                Some((*owner, *name))
            }
            _ => None,
        };

        if let Some((owner, name)) = repo {
            let url = format!("{}/{}/{}", GITHUB, owner, name);
            if !repos.contains(&url) {
                repos.push(url);
            }
        }
    }

    Ok(repos)
}

/// Returns `https://github.com/owner/repo` for any URL inside a repository.
pub fn repo_root(url: &str) -> Option<String> {
    let rest = url.strip_prefix(GITHUB)?.strip_prefix('/')?;
    let mut segments = rest.split(['/', '?', '#']);
    let owner = segments.next().filter(|s| !s.is_empty())?;
    let name = segments.next().filter(|s| !s.is_empty())?;
    Some(format!("{}/{}/{}", GITHUB, owner, name))
}

pub fn is_search_page(url: &str) -> bool {
    url.starts_with(&format!("{}/search", GITHUB))
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, ManifestError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| ManifestError::Fetch {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(ManifestError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    response.text().await.map_err(|source| ManifestError::Fetch {
        url: url.to_string(),
        source,
    })
}

async fn discover_repo(client: &reqwest::Client, repo: &str) -> ManifestFiles {
    let files = match fetch_page(client, repo).await {
        Ok(html) => extract_file_links(&html),
        Err(e) => Err(e),
    };

    files.unwrap_or_else(|e| {
        warn!("Failed to read repository {}: {}", repo, e);
        ManifestFiles::new()
    })
}

/// Finds manifests reachable from a remote target URL.
pub async fn discover_remote(client: &reqwest::Client, url: &str) -> ManifestFiles {
    if let Some(ecosystem) = classify_path(url) {
        let location = if url.contains("/blob/") {
            raw_url(url)
        } else {
            url.to_string()
        };
        let mut files = ManifestFiles::new();
        files.push(ecosystem, ManifestFile::new(location));
        return files;
    }

    let repos = if is_search_page(url) {
        let links = match fetch_page(client, url).await {
            Ok(html) => extract_repo_links(&html),
            Err(e) => Err(e),
        };
        links.unwrap_or_else(|e| {
            warn!("Failed to read search page {}: {}", url, e);
            Vec::new()
        })
    } else {
        repo_root(url).into_iter().collect()
    };

    debug!("Discovering manifests in {} repositories", repos.len());

    let pages = join_all(repos.iter().map(|repo| discover_repo(client, repo))).await;

    let mut files = ManifestFiles::new();
    for page in pages {
        files.extend(page);
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_classify_path() {
        assert_eq!(classify_path("app/package.json"), Some(Ecosystem::Npm));
        assert_eq!(classify_path("Gemfile"), Some(Ecosystem::Ruby));
        assert_eq!(classify_path("/srv/Gemfile.lock"), Some(Ecosystem::Ruby));
        assert_eq!(classify_path("requirements.txt"), Some(Ecosystem::Python));
        assert_eq!(
            classify_path("deps/requirements.dev.txt"),
            Some(Ecosystem::Python)
        );
        assert_eq!(classify_path("dev-requirements.txt"), Some(Ecosystem::Python));
        assert_eq!(classify_path("requirements-dev.txt"), None);
        assert_eq!(classify_path("Cargo.toml"), None);
        assert_eq!(classify_path("README.md"), None);
    }

    #[test]
    fn test_classify_path_ignores_query() {
        assert_eq!(
            classify_path("https://github.com/a/b/blob/main/package.json?plain=1"),
            Some(Ecosystem::Npm)
        );
    }

    #[test]
    fn test_detect_ecosystem_prefers_target() {
        let mut files = ManifestFiles::new();
        files.push(Ecosystem::Npm, ManifestFile::new("package.json"));

        assert_eq!(
            detect_ecosystem("https://github.com/a/b/blob/main/Gemfile", &files),
            Some(Ecosystem::Ruby)
        );
        assert_eq!(
            detect_ecosystem("https://github.com/a/b", &files),
            Some(Ecosystem::Npm)
        );
    }

    #[test]
    fn test_detect_ecosystem_fallback_order() {
        let mut files = ManifestFiles::new();
        files.push(Ecosystem::Python, ManifestFile::new("requirements.txt"));
        files.push(Ecosystem::Ruby, ManifestFile::new("Gemfile"));

        assert_eq!(detect_ecosystem("./repo", &files), Some(Ecosystem::Ruby));
        assert_eq!(detect_ecosystem("./repo", &ManifestFiles::new()), None);
    }

    #[test]
    fn test_extract_file_links() {
        let html = r#"
            <a href="/acme/shop/blob/main/package.json">package.json</a>
            <a href="/acme/shop/blob/main/package.json">package.json</a>
            <a href="/acme/shop/blob/main/Gemfile">Gemfile</a>
            <a href="/acme/shop/blob/main/README.md">README</a>
            <a href="/acme/shop/tree/main/src">src</a>
        "#;

        let files = extract_file_links(html).unwrap();
        assert_eq!(
            files.get(Ecosystem::Npm),
            &[ManifestFile::new(
                "https://github.com/acme/shop/raw/main/package.json"
            )]
        );
        assert_eq!(files.get(Ecosystem::Ruby).len(), 1);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_extract_repo_links() {
        let html = r#"
            <a href="/acme/shop">acme/shop</a>
            <a href="/acme/shop/blob/main/app.js">app.js</a>
            <a href="/other/tool/blob/dev/requirements.txt">requirements.txt</a>
            <a href="/search?q=x">next</a>
            <a href="/acme/shop/issues">issues</a>
        "#;

        let repos = extract_repo_links(html).unwrap();
        assert_eq!(
            repos,
            vec![
                "https://github.com/acme/shop".to_string(),
                "https://github.com/other/tool".to_string()
            ]
        );
    }

    #[test]
    fn test_repo_root() {
        assert_eq!(
            repo_root("https://github.com/acme/shop/tree/main/src"),
            Some("https://github.com/acme/shop".to_string())
        );
        assert_eq!(
            repo_root("https://github.com/acme/shop?tab=readme"),
            Some("https://github.com/acme/shop".to_string())
        );
        assert_eq!(repo_root("https://github.com/acme"), None);
        assert_eq!(repo_root("https://gitlab.com/acme/shop"), None);
    }

    #[test]
    fn test_is_search_page() {
        assert!(is_search_page("https://github.com/search?q=left-pad&type=code"));
        assert!(!is_search_page("https://github.com/acme/search"));
    }

    #[tokio::test]
    async fn test_discover_remote_direct_file() {
        let client = reqwest::Client::new();
        let files =
            discover_remote(&client, "https://github.com/acme/shop/blob/main/requirements.txt")
                .await;

        assert_eq!(
            files.get(Ecosystem::Python),
            &[ManifestFile::new(
                "https://github.com/acme/shop/raw/main/requirements.txt"
            )]
        );
    }

    #[test]
    fn test_discover_local_skips_node_modules_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), "{}").unwrap();
        fs::write(root.join("requirements.txt"), "flask").unwrap();
        fs::create_dir_all(root.join("api")).unwrap();
        fs::write(root.join("api").join("Gemfile"), "gem 'rails'").unwrap();
        fs::create_dir_all(root.join("node_modules").join("x")).unwrap();
        fs::write(root.join("node_modules").join("x").join("package.json"), "{}").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git").join("requirements.txt"), "").unwrap();

        let files = discover_local(root);

        assert_eq!(files.get(Ecosystem::Npm).len(), 1);
        assert_eq!(files.get(Ecosystem::Ruby).len(), 1);
        assert_eq!(files.get(Ecosystem::Python).len(), 1);
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_discover_local_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Gemfile");
        fs::write(&path, "gem 'rails'").unwrap();

        let files = discover_local(&path);
        assert_eq!(files.get(Ecosystem::Ruby).len(), 1);
    }
}
