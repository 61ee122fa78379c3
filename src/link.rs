// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tracked file management.
//!
//! A __tracked file__ is a file whose canonical copy lives inside of the
//! repository at a path that mirrors its original absolute location. The
//! original location is then replaced with a symbolic link to the repository
//! copy. A tracked file is __installed__ when that symbolic link is present.
//!
//! # Partial Failure
//!
//! Filesystem mutations are single-step and non-transactional. If adding a
//! file manages to move the original into the repository, but fails to create
//! the symbolic link back, then the original stays relocated. Confix reports
//! where the file went, and leaves the repair to the user.
//!
//! # Dangling Links
//!
//! Removing a tracked file from the repository does not touch its original
//! location. A symbolic link that still points to the removed copy is left
//! dangling, and Confix warns about it.

use crate::{
    fs::{FileKind, FileSystem, NativeFs},
    merge::{MergeError, MergeTool},
    path::{normalize, PathError, PathResolver},
    store::{SettingsStore, StoreError},
};

use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, error, info, instrument, warn};

/// Tracked file manager for one repository.
///
/// Carries every piece of configuration that tracked file operations need,
/// so nothing is read from ambient global state.
#[derive(Debug)]
pub struct Confix<F = NativeFs>
where
    F: FileSystem,
{
    pub(crate) resolver: PathResolver,
    pub(crate) fs: F,
    merge_tool: Option<MergeTool>,
    backup_dir: Option<PathBuf>,
}

impl<F> Confix<F>
where
    F: FileSystem,
{
    /// Construct new tracked file manager for repository at `repo`.
    pub fn new(repo: impl Into<PathBuf>, fs: F) -> Self {
        Self {
            resolver: PathResolver::new(repo),
            fs,
            merge_tool: None,
            backup_dir: None,
        }
    }

    /// Construct tracked file manager from persisted settings.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::RepoNotSet`] if repository is not set, or no
    ///   longer exists.
    pub fn open(store: &SettingsStore, fs: F) -> Result<Self, StoreError> {
        let repo = store.repo(&fs)?;
        Ok(Self::new(repo, fs).with_merge_tool(store.merge_tool()))
    }

    /// Use merge tool for [`Confix::merge`].
    pub fn with_merge_tool(mut self, merge_tool: Option<MergeTool>) -> Self {
        self.merge_tool = merge_tool;
        self
    }

    /// Back up repository copies to `backup_dir` before overwriting them.
    pub fn with_backup_dir(mut self, backup_dir: Option<PathBuf>) -> Self {
        self.backup_dir = backup_dir;
        self
    }

    /// Path resolver of repository.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Move file into repository, and replace it with symbolic link.
    ///
    /// The file at `path` may be a regular file or a directory. If the
    /// repository already has a copy of `path`, then `force` overwrites that
    /// copy after backing it up.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Path`] if `path` is relative.
    /// - Return [`LinkError::InsideRepo`] if `path` lives inside repository.
    /// - Return [`LinkError::ContainsRepo`] if repository lives inside `path`.
    /// - Return [`LinkError::AlreadyTracked`] if `path` already links to its
    ///   repository copy.
    /// - Return [`LinkError::SourceNotFound`] if `path` does not exist.
    /// - Return [`LinkError::UnsupportedSource`] if `path` is a symbolic link.
    /// - Return [`LinkError::DestinationExists`] if repository copy exists
    ///   and `force` is not set.
    /// - Return [`LinkError::Io`] if filesystem operations fail.
    #[instrument(skip(self), level = "debug")]
    pub fn add(&self, path: &Path, force: bool) -> Result<()> {
        let repo_path = self.resolver.to_repo_path(path)?;
        self.reject_inside_repo(path)?;

        if self.is_installed(path, &repo_path) {
            return Err(LinkError::AlreadyTracked {
                path: path.to_path_buf(),
            });
        }

        match self.fs.kind(path) {
            None => {
                return Err(LinkError::SourceNotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(FileKind::Symlink) => {
                return Err(LinkError::UnsupportedSource {
                    path: path.to_path_buf(),
                })
            }
            Some(FileKind::File | FileKind::Dir) => {}
        }

        if self.fs.kind(&repo_path).is_some() {
            if !force {
                return Err(LinkError::DestinationExists {
                    path: path.to_path_buf(),
                    repo_path,
                });
            }

            self.backup(path, &repo_path)?;
            info!("overwrite repository copy {:?}", repo_path.display());
            self.fs
                .remove(&repo_path)
                .map_err(|err| LinkError::io(err, &repo_path))?;
        }

        self.create_parent(&repo_path)?;
        info!("move {:?} to {:?}", path.display(), repo_path.display());
        self.fs
            .rename(path, &repo_path)
            .map_err(|err| LinkError::io(err, path))?;

        if let Err(err) = self.fs.symlink(&repo_path, path) {
            error!(
                "{:?} was moved to {:?}, but could not be linked back",
                path.display(),
                repo_path.display()
            );
            return Err(LinkError::io(err, path));
        }

        Ok(())
    }

    /// Create symbolic link to existing repository copy.
    ///
    /// Succeeds without change if `path` already links to its repository
    /// copy. An existing symbolic link at `path` is replaced only if `force`
    /// is set. Real files and directories are never replaced.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Path`] if `path` is relative.
    /// - Return [`LinkError::InsideRepo`] if `path` lives inside repository.
    /// - Return [`LinkError::ContainsRepo`] if repository lives inside `path`.
    /// - Return [`LinkError::RepoFileNotFound`] if repository copy is missing.
    /// - Return [`LinkError::TargetExists`] if `path` is occupied.
    /// - Return [`LinkError::Io`] if filesystem operations fail.
    #[instrument(skip(self), level = "debug")]
    pub fn link(&self, path: &Path, force: bool) -> Result<()> {
        let repo_path = self.resolver.to_repo_path(path)?;
        self.reject_inside_repo(path)?;

        if self.fs.kind(&repo_path).is_none() {
            return Err(LinkError::RepoFileNotFound {
                path: path.to_path_buf(),
                repo_path,
            });
        }

        if self.is_installed(path, &repo_path) {
            info!("{:?} is already linked", path.display());
            return Ok(());
        }

        match self.fs.kind(path) {
            None => {}
            Some(FileKind::Symlink) if force => {
                info!("replace symbolic link {:?}", path.display());
                self.fs
                    .remove(path)
                    .map_err(|err| LinkError::io(err, path))?;
            }
            Some(kind) => {
                return Err(LinkError::TargetExists {
                    path: path.to_path_buf(),
                    kind,
                })
            }
        }

        self.create_parent(path)?;
        info!("link {:?} to {:?}", path.display(), repo_path.display());
        self.fs
            .symlink(&repo_path, path)
            .map_err(|err| LinkError::io(err, path))
    }

    /// Remove symbolic link, keeping repository copy.
    ///
    /// If `restore` is set, then the repository copy is copied back to `path`
    /// so a real file takes the place of the link.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Path`] if `path` is relative.
    /// - Return [`LinkError::NotALink`] if `path` is not a symbolic link.
    /// - Return [`LinkError::LinkTargetMismatch`] if `path` links somewhere
    ///   other than its repository copy.
    /// - Return [`LinkError::RepoFileNotFound`] if `restore` is set, but the
    ///   repository copy is missing.
    /// - Return [`LinkError::Io`] if filesystem operations fail.
    #[instrument(skip(self), level = "debug")]
    pub fn unlink(&self, path: &Path, restore: bool) -> Result<()> {
        let repo_path = self.resolver.to_repo_path(path)?;
        if self.fs.kind(path) != Some(FileKind::Symlink) {
            return Err(LinkError::NotALink {
                path: path.to_path_buf(),
            });
        }

        let target = self
            .fs
            .read_link(path)
            .map_err(|err| LinkError::io(err, path))?;
        if !self.points_to(path, &target, &repo_path) {
            return Err(LinkError::LinkTargetMismatch {
                path: path.to_path_buf(),
                target,
                repo_path,
            });
        }

        if restore && !self.fs.exists(&repo_path) {
            return Err(LinkError::RepoFileNotFound {
                path: path.to_path_buf(),
                repo_path,
            });
        }

        info!("unlink {:?}", path.display());
        self.fs
            .remove(path)
            .map_err(|err| LinkError::io(err, path))?;

        if restore {
            info!("restore {:?} from {:?}", path.display(), repo_path.display());
            self.fs
                .copy(&repo_path, path)
                .map_err(|err| LinkError::io(err, path))?;
        }

        Ok(())
    }

    /// Delete repository copy of tracked file.
    ///
    /// Accepts either the original path of the tracked file, or its path
    /// inside of the repository. A symbolic link still pointing at the
    /// deleted copy is left dangling.
    ///
    /// A directory copy is only removed when the original path links to it,
    /// i.e., the directory was added as a whole. Parent directories that
    /// merely mirror the layout of tracked files are left alone.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Path`] if `path` is relative.
    /// - Return [`LinkError::RepoRoot`] if `path` maps to repository root.
    /// - Return [`LinkError::RepoFileNotFound`] if repository copy is missing.
    /// - Return [`LinkError::UntrackedDirectory`] if repository copy is a
    ///   directory that the original path does not link to.
    /// - Return [`LinkError::Io`] if filesystem operations fail.
    #[instrument(skip(self), level = "debug")]
    pub fn rm(&self, path: &Path) -> Result<()> {
        let (path, repo_path) = if self.resolver.contains(path) {
            (self.resolver.to_original_path(path)?, path.to_path_buf())
        } else {
            (path.to_path_buf(), self.resolver.to_repo_path(path)?)
        };

        // INVARIANT: The repository itself is never a tracked entry.
        if repo_path == self.resolver.root() {
            return Err(LinkError::RepoRoot { path });
        }

        match self.fs.kind(&repo_path) {
            None => return Err(LinkError::RepoFileNotFound { path, repo_path }),
            Some(FileKind::Dir) if !self.links_to(&path, &repo_path) => {
                return Err(LinkError::UntrackedDirectory { path, repo_path })
            }
            Some(_) => {}
        }

        let linked = self.is_installed(&path, &repo_path);
        info!("remove {:?}", repo_path.display());
        self.fs
            .remove(&repo_path)
            .map_err(|err| LinkError::io(err, &repo_path))?;

        if linked {
            warn!(
                "{:?} still links to removed {:?}, leaving it dangling",
                path.display(),
                repo_path.display()
            );
        }

        Ok(())
    }

    /// Run configured merge tool on file and its repository copy.
    ///
    /// Performs no file mutation by itself.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Path`] if `path` is relative.
    /// - Return [`LinkError::SourceNotFound`] if `path` does not exist.
    /// - Return [`LinkError::RepoFileNotFound`] if repository copy is missing.
    /// - Return [`LinkError::Merge`] if merge tool is not configured, or
    ///   fails.
    #[instrument(skip(self), level = "debug")]
    pub fn merge(&self, path: &Path) -> Result<()> {
        let repo_path = self.resolver.to_repo_path(path)?;
        if !self.fs.exists(path) {
            return Err(LinkError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }

        if !self.fs.exists(&repo_path) {
            return Err(LinkError::RepoFileNotFound {
                path: path.to_path_buf(),
                repo_path,
            });
        }

        let tool = self
            .merge_tool
            .as_ref()
            .ok_or(MergeError::MergeToolNotConfigured)?;
        if self.is_installed(path, &repo_path) {
            warn!("{:?} links to its repository copy already", path.display());
        }

        info!("merge {:?} with {:?}", path.display(), repo_path.display());
        Ok(tool.invoke(path, &repo_path)?)
    }

    /// Check if `path` resolves to its repository copy at `repo_path`.
    pub(crate) fn is_installed(&self, path: &Path, repo_path: &Path) -> bool {
        match (
            self.fs.canonicalize(path),
            self.fs.canonicalize(repo_path),
        ) {
            (Ok(local), Ok(stored)) => local == stored,
            _ => false,
        }
    }

    fn points_to(&self, path: &Path, target: &Path, repo_path: &Path) -> bool {
        let target = match path.parent() {
            Some(parent) => normalize(parent.join(target)),
            None => normalize(target),
        };

        target == repo_path || self.is_installed(path, repo_path)
    }

    fn links_to(&self, path: &Path, repo_path: &Path) -> bool {
        self.fs.kind(path) == Some(FileKind::Symlink)
            && self
                .fs
                .read_link(path)
                .is_ok_and(|target| self.points_to(path, &target, repo_path))
    }

    fn reject_inside_repo(&self, path: &Path) -> Result<()> {
        if self.resolver.contains(path) {
            return Err(LinkError::InsideRepo {
                path: path.to_path_buf(),
                root: self.resolver.root().to_path_buf(),
            });
        }

        if self.resolver.root().starts_with(path) {
            return Err(LinkError::ContainsRepo {
                path: path.to_path_buf(),
                root: self.resolver.root().to_path_buf(),
            });
        }

        Ok(())
    }

    fn create_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|err| LinkError::io(err, parent))?;
        }

        Ok(())
    }

    fn backup(&self, path: &Path, repo_path: &Path) -> Result<()> {
        let Some(backup_dir) = &self.backup_dir else {
            debug!("no backup directory, skip backup of {:?}", repo_path.display());
            return Ok(());
        };

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let mut name = backup_dir
            .join(self.resolver.to_relative(path)?)
            .into_os_string();
        name.push(format!(".{stamp}"));

        // INVARIANT: Never overwrite an earlier backup taken in the same second.
        let mut backup = PathBuf::from(&name);
        let mut attempt = 0;
        while self.fs.kind(&backup).is_some() {
            attempt += 1;
            let mut numbered = name.clone();
            numbered.push(format!(".{attempt}"));
            backup = PathBuf::from(numbered);
        }

        self.create_parent(&backup)?;
        info!("back up {:?} to {:?}", repo_path.display(), backup.display());
        self.fs
            .copy(repo_path, &backup)
            .map_err(|err| LinkError::io(err, &backup))
    }
}

fn occupied_reason(kind: &FileKind) -> &'static str {
    match kind {
        FileKind::File => "file, refusing to replace it",
        FileKind::Dir => "directory, refusing to replace it",
        FileKind::Symlink => "symbolic link (use --force to replace it)",
    }
}

/// Tracked file error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Path cannot be mapped into repository.
    #[error(transparent)]
    Path(#[from] PathError),

    /// File to add does not exist.
    #[error("{:?} does not exist", path.display())]
    SourceNotFound { path: PathBuf },

    /// File to add is not a regular file or directory.
    #[error("{:?} is a symbolic link, only files and directories can be added", path.display())]
    UnsupportedSource { path: PathBuf },

    /// Path already lives inside of repository.
    #[error("{:?} is inside repository {:?}", path.display(), root.display())]
    InsideRepo { path: PathBuf, root: PathBuf },

    /// Path is an ancestor of repository.
    #[error("{:?} contains repository {:?}", path.display(), root.display())]
    ContainsRepo { path: PathBuf, root: PathBuf },

    /// Path maps to repository root instead of a tracked file.
    #[error("{:?} maps to repository root, refusing to remove it", path.display())]
    RepoRoot { path: PathBuf },

    /// Repository copy is a directory that was not added as a whole.
    #[error(
        "{:?} is a directory that {:?} does not link to, refusing to remove it",
        repo_path.display(),
        path.display()
    )]
    UntrackedDirectory { path: PathBuf, repo_path: PathBuf },

    /// File already links to its repository copy.
    #[error("{:?} is already tracked and linked", path.display())]
    AlreadyTracked { path: PathBuf },

    /// Repository already has a different copy of the file.
    #[error(
        "a different version of {:?} already exists at {:?} (use --force to overwrite it, or merge)",
        path.display(),
        repo_path.display()
    )]
    DestinationExists { path: PathBuf, repo_path: PathBuf },

    /// Repository copy of the file does not exist.
    #[error("{:?} is not in repository, expected {:?}", path.display(), repo_path.display())]
    RepoFileNotFound { path: PathBuf, repo_path: PathBuf },

    /// Link location is occupied.
    #[error("{:?} already exists as a {}", path.display(), occupied_reason(kind))]
    TargetExists { path: PathBuf, kind: FileKind },

    /// Path is not a symbolic link.
    #[error("{:?} is not a symbolic link", path.display())]
    NotALink { path: PathBuf },

    /// Symbolic link points somewhere other than the repository copy.
    #[error(
        "{:?} links to {:?} instead of {:?}",
        path.display(),
        target.display(),
        repo_path.display()
    )]
    LinkTargetMismatch {
        path: PathBuf,
        target: PathBuf,
        repo_path: PathBuf,
    },

    /// Merge tool is not configured, or fails.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Filesystem operation fails.
    #[error("filesystem operation failed on {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl LinkError {
    fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}

/// Friendly result alias :3
type Result<T, E = LinkError> = std::result::Result<T, E>;
