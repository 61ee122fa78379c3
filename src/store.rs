// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Persistent settings storage.
//!
//! Confix keeps its settings in a single per-user file that lives outside of
//! the repository. By default this file is `$XDG_CONFIG_HOME/confix/config.toml`.
//! The file is created on first write, and a missing file simply means that
//! nothing has been configured yet.
//!
//! Only the last write wins. Concurrent invocations of Confix are not
//! synchronized in any way.

use crate::{
    config::{ConfigError, ConfixConfig, RepoDir},
    fs::FileSystem,
    merge::MergeTool,
};

use std::{
    fs::{read_to_string, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Settings file manager.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    config: ConfixConfig,
}

impl SettingsStore {
    /// Open settings file at target path.
    ///
    /// Treats missing settings file as empty settings.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::ReadSettings`] if settings file cannot be read.
    /// - Return [`StoreError::Config`] if settings file cannot be parsed.
    #[instrument(skip(path), level = "debug")]
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = match read_to_string(&path) {
            Ok(data) => data.parse()?,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no settings file at {:?}, use defaults", path.display());
                ConfixConfig::default()
            }
            Err(error) => {
                return Err(StoreError::ReadSettings {
                    source: error,
                    path,
                })
            }
        };

        Ok(Self { path, config })
    }

    /// Path to settings file.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Set path to repository, and persist it.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidRepoPath`] if `repo` is not an existing
    ///   directory.
    /// - Return [`StoreError::WriteSettings`] if settings file cannot be
    ///   written.
    #[instrument(skip(self, fs, repo), level = "debug")]
    pub fn set_repo(&mut self, fs: &impl FileSystem, repo: impl AsRef<Path>) -> Result<()> {
        let repo = repo.as_ref();
        if !repo.is_absolute() || !fs.is_dir(repo) {
            return Err(StoreError::InvalidRepoPath {
                path: repo.to_path_buf(),
            });
        }

        info!("use repository {:?}", repo.display());
        self.config.settings.repo = Some(RepoDir::new(repo));
        self.save()
    }

    /// Get path to repository.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::RepoNotSet`] if repository was never set, or
    ///   the persisted path no longer exists.
    pub fn repo(&self, fs: &impl FileSystem) -> Result<PathBuf> {
        match &self.config.settings.repo {
            Some(repo) if fs.is_dir(repo.as_path()) => Ok(repo.as_path().to_path_buf()),
            Some(repo) => Err(StoreError::RepoNotSet {
                stale: Some(repo.as_path().to_path_buf()),
            }),
            None => Err(StoreError::RepoNotSet { stale: None }),
        }
    }

    /// Set merge tool command template, and persist it.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::WriteSettings`] if settings file cannot be
    ///   written.
    #[instrument(skip(self, command), level = "debug")]
    pub fn set_merge_tool(&mut self, command: impl Into<String>) -> Result<()> {
        let command = command.into();
        info!("use merge tool {command:?}");
        self.config.settings.merge_tool = Some(command);
        self.save()
    }

    /// Get merge tool, if configured.
    pub fn merge_tool(&self) -> Option<MergeTool> {
        self.config
            .settings
            .merge_tool
            .as_deref()
            .map(MergeTool::new)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            mkdirp::mkdirp(parent).map_err(|err| StoreError::WriteSettings {
                source: err,
                path: self.path.clone(),
            })?;
        }

        write(&self.path, self.config.to_string()).map_err(|err| StoreError::WriteSettings {
            source: err,
            path: self.path.clone(),
        })
    }
}

fn not_set_reason(stale: &Option<PathBuf>) -> String {
    match stale {
        Some(path) => format!("repository {:?} no longer exists", path.display()),
        None => "no repository set".into(),
    }
}

/// All possible error types for settings storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Repository was never set, or no longer exists.
    #[error("{}, set one with 'confix setRepo <path>'", not_set_reason(stale))]
    RepoNotSet { stale: Option<PathBuf> },

    /// Repository path is not an existing absolute directory.
    #[error("invalid repository path {:?}, must be an existing directory", path.display())]
    InvalidRepoPath { path: PathBuf },

    /// Settings file cannot be parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Settings file cannot be read.
    #[error("failed to read settings file at {:?}", path.display())]
    ReadSettings {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Settings file cannot be written.
    #[error("failed to write settings file at {:?}", path.display())]
    WriteSettings {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = StoreError> = std::result::Result<T, E>;
