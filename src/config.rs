// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the settings file that Confix uses to simplify the
//! process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Settings file layout.
///
/// Confix only ever persists two scalar values: the path to the repository
/// that houses tracked files, and the command template of the external merge
/// tool. Both are optional, because a fresh installation has neither.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ConfixConfig {
    /// Persisted settings.
    #[serde(default)]
    pub settings: ConfixSettings,
}

impl FromStr for ConfixConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: ConfixConfig = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on repository path field, unless
        //            it is already absolute.
        if let Some(repo) = config.settings.repo.take() {
            config.settings.repo = Some(if repo.as_path().is_absolute() {
                repo
            } else {
                RepoDir::new(
                    shellexpand::full(repo.to_string().as_str())
                        .map_err(ConfigError::ShellExpansion)?
                        .into_owned(),
                )
            });
        }

        Ok(config)
    }
}

impl Display for ConfixConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Persisted settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ConfixSettings {
    /// Repository that houses tracked files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoDir>,

    /// Command template of external merge tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_tool: Option<String>,
}

/// Path to repository directory.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RepoDir(PathBuf);

impl RepoDir {
    /// Construct new repository directory path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat repository directory as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for RepoDir {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}
