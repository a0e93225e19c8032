//! Remote library fetching
//!
//! Turns a [`RemoteRef`] into a canonical local source tree that can then be
//! registered like any other unit. Failures are reported to the unit that
//! asked for the remote; nothing is retried here.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::unit::registry::manifest::{RemoteRef, UnitManifest, MANIFEST_FILE};
use crate::unit::registry::store::{LibraryUnit, Registry};
use crate::unit::traits::UnitError;

/// Fetch collaborator
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Produce a canonical local source directory for `remote`
    async fn fetch(&self, remote: &RemoteRef) -> Result<PathBuf, UnitError>;
}

/// Resolves `file://` URLs and plain paths without copying
pub struct LocalFetcher {
    base_dir: PathBuf,
}

impl LocalFetcher {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Fetcher for LocalFetcher {
    async fn fetch(&self, remote: &RemoteRef) -> Result<PathBuf, UnitError> {
        let raw = remote.url.strip_prefix("file://").unwrap_or(&remote.url);
        if let Some(rev) = &remote.revision {
            warn!("Ignoring revision {} for local remote {}", rev, remote.name);
        }

        let path = self.base_dir.join(raw);
        tokio::fs::canonicalize(&path).await.map_err(|e| {
            UnitError::FetchFailed(format!("{}: {:?}: {}", remote.name, path, e))
        })
    }
}

/// Clones remotes with `git` into a checkout directory
pub struct GitFetcher {
    checkout_dir: PathBuf,
    git: PathBuf,
}

impl GitFetcher {
    pub fn new<P: AsRef<Path>>(checkout_dir: P) -> Self {
        Self {
            checkout_dir: checkout_dir.as_ref().to_path_buf(),
            git: PathBuf::from("git"),
        }
    }

    pub fn from_config(config: &FetchConfig, base_dir: &Path) -> Self {
        Self {
            checkout_dir: base_dir.join(&config.checkout_dir),
            git: PathBuf::from(&config.git_binary),
        }
    }

    /// Directory a remote is checked out into
    pub fn checkout_path(&self, remote: &RemoteRef) -> PathBuf {
        self.checkout_dir.join(&remote.name)
    }

    async fn run_git<I, S>(&self, remote: &RemoteRef, args: I) -> Result<(), UnitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.git);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Running {:?}", command);

        let output = command.output().await.map_err(|e| {
            UnitError::FetchFailed(format!(
                "{}: failed to run {:?}: {}",
                remote.name, self.git, e
            ))
        })?;

        if !output.status.success() {
            return Err(UnitError::FetchFailed(format!(
                "{}: git exited with {}: {}",
                remote.name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for GitFetcher {
    async fn fetch(&self, remote: &RemoteRef) -> Result<PathBuf, UnitError> {
        if let Some(rev) = remote.revision.as_deref().filter(|r| r.starts_with('-')) {
            return Err(UnitError::FetchFailed(format!(
                "{}: revision {:?} looks like an option",
                remote.name, rev
            )));
        }
        let target = self.checkout_path(remote);

        if target.join(".git").exists() {
            debug!("Reusing checkout of {} at {:?}", remote.name, target);
            if remote.revision.is_some() {
                self.run_git(
                    remote,
                    [OsStr::new("-C"), target.as_os_str(), OsStr::new("fetch"), OsStr::new("--tags"), OsStr::new("origin")],
                )
                .await?;
            }
        } else {
            tokio::fs::create_dir_all(&self.checkout_dir)
                .await
                .map_err(|e| UnitError::FetchFailed(format!("{}: {}", remote.name, e)))?;
            info!("Cloning {} from {}", remote.name, remote.url);
            self.run_git(
                remote,
                [
                    OsStr::new("clone"),
                    OsStr::new("--quiet"),
                    OsStr::new("--"),
                    OsStr::new(&remote.url),
                    target.as_os_str(),
                ],
            )
            .await?;
        }

        if let Some(rev) = &remote.revision {
            self.run_git(
                remote,
                [OsStr::new("-C"), target.as_os_str(), OsStr::new("checkout"), OsStr::new("--quiet"), OsStr::new(rev)],
            )
            .await?;
        }

        tokio::fs::canonicalize(&target)
            .await
            .map_err(|e| UnitError::FetchFailed(format!("{}: {:?}: {}", remote.name, target, e)))
    }
}

/// Fetch each remote and register the resulting source tree
///
/// A fetched tree with a `unit.toml` registers its manifest's dependencies
/// and sources; otherwise it registers as a leaf. The remote's name wins over
/// the manifest's.
pub async fn fetch_remotes(
    fetcher: &dyn Fetcher,
    registry: &mut Registry,
    remotes: &[RemoteRef],
) -> Result<Vec<String>, UnitError> {
    let mut names = Vec::new();

    for remote in remotes {
        if registry.contains(&remote.name) {
            debug!("Remote {} already registered", remote.name);
            names.push(remote.name.clone());
            continue;
        }

        let dir = fetcher.fetch(remote).await?;
        let manifest_path = dir.join(MANIFEST_FILE);
        let mut unit = if manifest_path.is_file() {
            UnitManifest::from_file(&manifest_path)?.to_unit(&dir)
        } else {
            LibraryUnit::new(remote.name.clone(), &dir, Vec::<String>::new())
        };
        unit.name = remote.name.clone();

        registry.register_unit(unit)?;
        names.push(remote.name.clone());
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn remote(name: &str, url: &str) -> RemoteRef {
        RemoteRef {
            name: name.to_string(),
            url: url.to_string(),
            revision: None,
        }
    }

    #[tokio::test]
    async fn test_local_fetcher_resolves_paths() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("vendor/json")).unwrap();
        let fetcher = LocalFetcher::new(temp_dir.path());
        let expected = std::fs::canonicalize(temp_dir.path().join("vendor/json")).unwrap();

        assert_eq!(fetcher.fetch(&remote("Json", "vendor/json")).await.unwrap(), expected);

        let url = format!("file://{}", temp_dir.path().join("vendor/json").display());
        assert_eq!(fetcher.fetch(&remote("Json", &url)).await.unwrap(), expected);

        assert!(matches!(
            fetcher.fetch(&remote("Json", "vendor/missing")).await,
            Err(UnitError::FetchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_git_fetcher_surfaces_spawn_failure() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = GitFetcher::from_config(
            &FetchConfig {
                checkout_dir: "deps".to_string(),
                git_binary: "/nonexistent/git".to_string(),
            },
            temp_dir.path(),
        );
        let r = remote("Json", "https://example.invalid/json.git");
        assert_eq!(fetcher.checkout_path(&r), temp_dir.path().join("deps/Json"));

        let err = fetcher.fetch(&r).await.unwrap_err();
        assert!(matches!(err, UnitError::FetchFailed(ref msg) if msg.starts_with("Json")));
    }

    #[tokio::test]
    async fn test_git_fetcher_rejects_option_like_revision() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = GitFetcher::new(temp_dir.path().join("deps"));
        let r = RemoteRef {
            revision: Some("--upload-pack=touch /tmp/owned".to_string()),
            ..remote("Json", "https://example.invalid/json.git")
        };

        let err = fetcher.fetch(&r).await.unwrap_err();
        assert!(matches!(err, UnitError::FetchFailed(ref msg) if msg.contains("looks like an option")));
        assert!(!temp_dir.path().join("deps").exists());
    }

    #[tokio::test]
    async fn test_fetch_remotes_registers_trees() {
        let temp_dir = TempDir::new().unwrap();
        let with_manifest = temp_dir.path().join("vendor/json");
        std::fs::create_dir_all(&with_manifest).unwrap();
        std::fs::write(
            with_manifest.join(MANIFEST_FILE),
            "name = \"JsonUpstream\"\ndependencies = [\"Core\"]",
        )
        .unwrap();
        std::fs::create_dir_all(temp_dir.path().join("vendor/plain")).unwrap();

        let fetcher = LocalFetcher::new(temp_dir.path());
        let mut registry = Registry::new();
        let names = fetch_remotes(
            &fetcher,
            &mut registry,
            &[remote("Json", "vendor/json"), remote("Plain", "vendor/plain")],
        )
        .await
        .unwrap();

        assert_eq!(names, vec!["Json", "Plain"]);
        assert_eq!(registry.lookup("Json").unwrap().dependencies, vec!["Core"]);
        assert!(registry.lookup("Plain").unwrap().dependencies.is_empty());
    }
}
