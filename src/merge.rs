// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External merge tool invocation.
//!
//! Confix never reconciles file content by itself. Instead, the user supplies
//! a command template for their favorite diff/merge program, and Confix hands
//! it the local file along with its repository copy.
//!
//! # Command Templates
//!
//! A template is a plain shell command. The placeholders `{local}` and
//! `{repo}` are replaced with the local path and the repository path
//! respectively. If the template contains neither placeholder, then both
//! paths are appended in that order, e.g., `meld` becomes
//! `meld <local> <repo>`. Paths are passed to the shell as positional
//! parameters, so they never need quoting.

use std::{
    ffi::OsStr,
    path::Path,
    process::{Command, ExitStatus},
};
use tracing::{debug, instrument};

const LOCAL_PLACEHOLDER: &str = "{local}";
const REPO_PLACEHOLDER: &str = "{repo}";

/// Command template of external merge tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTool(String);

impl MergeTool {
    /// Construct new merge tool from command template.
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Command template as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Run merge tool on local file and its repository copy.
    ///
    /// Blocks until the merge tool exits. The merge tool inherits the
    /// terminal of the current process.
    ///
    /// # Errors
    ///
    /// - Return [`MergeError::Spawn`] if the shell cannot be started.
    /// - Return [`MergeError::ExternalToolFailure`] if merge tool exits with
    ///   non-zero status.
    #[instrument(skip(self), level = "debug")]
    pub fn invoke(&self, local: &Path, repo: &Path) -> Result<()> {
        let script = self.script();
        debug!("run merge tool script {script:?}");
        let status = syscall_interactive(
            "sh",
            [
                OsStr::new("-c"),
                OsStr::new(script.as_str()),
                OsStr::new("confix"),
                local.as_os_str(),
                repo.as_os_str(),
            ],
        )
        .map_err(|source| MergeError::Spawn {
            source,
            command: self.0.clone(),
        })?;

        if !status.success() {
            return Err(MergeError::ExternalToolFailure {
                command: self.0.clone(),
                status,
            });
        }

        Ok(())
    }

    fn script(&self) -> String {
        if self.0.contains(LOCAL_PLACEHOLDER) || self.0.contains(REPO_PLACEHOLDER) {
            self.0
                .replace(LOCAL_PLACEHOLDER, "\"$1\"")
                .replace(REPO_PLACEHOLDER, "\"$2\"")
        } else {
            format!("{} \"$1\" \"$2\"", self.0)
        }
    }
}

fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> std::io::Result<ExitStatus> {
    Command::new(cmd.as_ref()).args(args).spawn()?.wait()
}

/// Merge tool error types.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// No merge tool has been configured yet.
    #[error("no merge tool configured, set one with 'confix setMergeTool <command>'")]
    MergeToolNotConfigured,

    /// Merge tool exited with non-zero status.
    #[error("merge tool {command:?} failed with {status}")]
    ExternalToolFailure { command: String, status: ExitStatus },

    /// Merge tool could not be started.
    #[error("failed to run merge tool {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },
}

/// Friendly result alias :3
type Result<T, E = MergeError> = std::result::Result<T, E>;
