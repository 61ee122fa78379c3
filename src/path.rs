// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.
//!
//! # Repository Layout
//!
//! Confix mirrors the absolute location of every tracked file inside of the
//! repository. A file at `/home/u/.gitconfig` tracked by a repository at
//! `/home/u/.confixRepo` is stored at `/home/u/.confixRepo/home/u/.gitconfig`.
//! Thus, the repository itself is all the bookkeeping that Confix needs in
//! order to figure out where a tracked file belongs.

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR};

/// Map paths between their original location and the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Construct new path resolver for repository at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path to repository root.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Determine storage location of original absolute path inside repository.
    ///
    /// # Errors
    ///
    /// - Return [`PathError::RelativePathNotSupported`] if `path` is relative.
    pub fn to_repo_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        Ok(self.root.join(self.to_relative(path)?))
    }

    /// Determine repository-relative storage path of original absolute path.
    ///
    /// # Errors
    ///
    /// - Return [`PathError::RelativePathNotSupported`] if `path` is relative.
    pub fn to_relative(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(PathError::RelativePathNotSupported {
                path: path.to_path_buf(),
            });
        }

        Ok(path
            .components()
            .filter(|component| !matches!(component, Component::Prefix(_) | Component::RootDir))
            .collect())
    }

    /// Reconstruct original absolute path from repository layout.
    ///
    /// Accepts either a path relative to the repository root, or an absolute
    /// path that lives inside of the repository.
    ///
    /// # Errors
    ///
    /// - Return [`PathError::OutsideRepo`] if absolute `path` does not live
    ///   inside of the repository.
    pub fn to_original_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root)
                .map_err(|_| PathError::OutsideRepo {
                    path: path.to_path_buf(),
                    root: self.root.clone(),
                })?
        } else {
            path
        };

        Ok(Path::new(MAIN_SEPARATOR_STR).join(relative))
    }

    /// Check if absolute path lives inside of the repository.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().starts_with(&self.root)
    }
}

/// Make `path` absolute against `base`, and lexically normalize it.
///
/// Symbolic links are not consulted, so `..` simply drops the previous
/// component.
pub fn absolutize(base: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.as_ref().join(path)
    };

    normalize(joined)
}

/// Lexically normalize path by resolving `.` and `..` components.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => {
                // INVARIANT: Never pop past the root.
                if normal.parent().is_some() {
                    normal.pop();
                }
            }
            other => normal.push(other.as_os_str()),
        }
    }

    normal
}

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf, NoWayHome> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to settings file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/confix/config.toml`. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf, NoWayHome> {
    dirs::config_dir()
        .map(|path| path.join("confix").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to backup directory.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/confix/backup`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_backup_dir() -> Result<PathBuf, NoWayHome> {
    dirs::data_dir()
        .map(|path| path.join("confix").join("backup"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Path mapping error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Only absolute paths can be mapped into the repository.
    #[error("relative path {:?} not supported, use an absolute path", path.display())]
    RelativePathNotSupported { path: PathBuf },

    /// Path does not live inside of the repository.
    #[error("path {:?} is not inside repository {:?}", path.display(), root.display())]
    OutsideRepo { path: PathBuf, root: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
