//! Publishing generated pages through git.
//!
//! After a batch, the docs directory is staged, committed and pushed so the
//! static host picks up the new pages. Publishing is best-effort: a failed
//! step is reported to the caller, who logs it, and the files already written
//! stay on disk.

use crate::models::Country;
use crate::utils::truncate_for_log;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{info, instrument};

/// Commit message for a run over `country`.
pub fn commit_message(country: &Country) -> String {
    format!("Aggiunti/aggiornati viaggi in {}", country.display_code())
}

/// A git step that did not succeed.
#[derive(Debug)]
pub enum PublishError {
    /// `git` could not be started at all.
    Spawn { step: &'static str, error: String },
    /// `git` ran and exited unsuccessfully.
    Failed {
        step: &'static str,
        status: String,
        stderr: String,
    },
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Spawn { step, error } => {
                write!(f, "could not run git {step}: {error}")
            }
            PublishError::Failed {
                step,
                status,
                stderr,
            } => write!(f, "git {step} failed ({status}): {stderr}"),
        }
    }
}

impl Error for PublishError {}

/// Stages, commits and pushes `paths` in the repository at `repo_dir`.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    paths: Vec<PathBuf>,
}

impl GitPublisher {
    pub fn new(repo_dir: impl Into<PathBuf>, paths: Vec<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            paths,
        }
    }

    #[instrument(level = "info", skip(self), fields(repo = %self.repo_dir.display()))]
    pub async fn publish(&self, message: &str) -> Result<(), PublishError> {
        let mut add = vec!["add".to_string()];
        add.extend(self.paths.iter().map(|p| p.display().to_string()));
        self.git("add", &add).await?;
        self.git("commit", &["commit".to_string(), "-m".to_string(), message.to_string()])
            .await?;
        self.git("push", &["push".to_string()]).await?;
        info!("Published generated pages");
        Ok(())
    }

    async fn git(&self, step: &'static str, args: &[String]) -> Result<(), PublishError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| PublishError::Spawn {
                step,
                error: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PublishError::Failed {
                step,
                status: output.status.to_string(),
                stderr: truncate_for_log(stderr.trim(), 300),
            });
        }
        info!(step, "git step succeeded");
        Ok(())
    }
}
