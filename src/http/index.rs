//! Index page rendering.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::container::command::run_with_timeout;

pub const UNKNOWN: &str = "unknown";
const GIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitVersion {
    pub version: String,
    pub commit_time: String,
}

impl GitVersion {
    pub fn unknown() -> Self {
        Self {
            version: UNKNOWN.to_string(),
            commit_time: UNKNOWN.to_string(),
        }
    }
}

/// Supplies the version shown on the index page. Never fails; missing
/// values are `"unknown"`.
#[async_trait]
pub trait GitInfoSource: Send + Sync {
    async fn version(&self) -> GitVersion;
}

/// Reads version info with the `git` CLI.
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    async fn git(&self, args: &[&str]) -> Option<String> {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        match run_with_timeout("git", &args, Some(&self.repo), GIT_TIMEOUT).await {
            Ok(output) if output.success() => {
                let text = output.stdout.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Ok(output) => {
                tracing::debug!(args = ?args, diagnostics = %output.diagnostics(), "git query failed");
                None
            }
            Err(e) => {
                tracing::debug!(args = ?args, error = %e, "git unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl GitInfoSource for GitCli {
    async fn version(&self) -> GitVersion {
        let version = self.git(&["describe", "--tags", "--always"]).await;
        let commit_time = self
            .git(&["log", "-1", "--format=%cd", "--date=format:%y-%m-%d %H:%M"])
            .await;
        GitVersion {
            version: version.unwrap_or_else(|| UNKNOWN.to_string()),
            commit_time: commit_time.unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

/// Fixed version info.
pub struct StaticGitInfo(pub GitVersion);

#[async_trait]
impl GitInfoSource for StaticGitInfo {
    async fn version(&self) -> GitVersion {
        self.0.clone()
    }
}

#[derive(Clone)]
pub struct IndexPage {
    template: PathBuf,
    git: Arc<dyn GitInfoSource>,
}

impl IndexPage {
    pub fn new(template: impl Into<PathBuf>, git: Arc<dyn GitInfoSource>) -> Self {
        Self {
            template: template.into(),
            git,
        }
    }

    pub fn template(&self) -> &Path {
        &self.template
    }

    /// Read the template and fill in the version placeholders.
    pub async fn render(&self) -> std::io::Result<String> {
        let template = tokio::fs::read_to_string(&self.template).await?;
        Ok(fill_template(&template, &self.git.version().await))
    }
}

pub fn fill_template(template: &str, version: &GitVersion) -> String {
    template
        .replace("{{version_no}}", &version.version)
        .replace("{{version_time}}", &version.commit_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template() {
        let version = GitVersion {
            version: "v1.2".into(),
            commit_time: "24-01-02 03:04".into(),
        };
        assert_eq!(
            fill_template("<p>{{version_no}} / {{version_time}} / {{version_no}}</p>", &version),
            "<p>v1.2 / 24-01-02 03:04 / v1.2</p>"
        );
    }

    #[tokio::test]
    async fn test_git_outside_repo_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(GitCli::new(dir.path()).version().await, GitVersion::unknown());
    }

    #[tokio::test]
    async fn test_render_reads_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "version {{version_no}}").unwrap();

        let page = IndexPage::new(&path, Arc::new(StaticGitInfo(GitVersion::unknown())));
        assert_eq!(page.render().await.unwrap(), "version unknown");

        let missing = IndexPage::new(dir.path().join("nope.html"), Arc::new(StaticGitInfo(GitVersion::unknown())));
        assert!(missing.render().await.is_err());
    }
}
