// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Filesystem access.
//!
//! Every filesystem call Confix makes goes through the [`FileSystem`] trait.
//! The native implementation talks to the real disk, while tests swap in an
//! in-memory fake so tracked file logic can be exercised in isolation.

#[cfg(test)]
pub(crate) mod memory;

use ignore::WalkBuilder;
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Kind of filesystem entry, without following symbolic links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

/// Layer of indirection for filesystem access.
pub trait FileSystem {
    /// Kind of entry at path without following symbolic links, if any.
    fn kind(&self, path: &Path) -> Option<FileKind>;

    /// Check if path exists, following symbolic links.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory, following symbolic links.
    fn is_dir(&self, path: &Path) -> bool;

    /// Read target of symbolic link.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Resolve path to its canonical form.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Create directory along with all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Move file or directory to new location.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create symbolic link at `link` that points to `target`.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Remove file, symbolic link, or directory tree.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Copy file or directory tree.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// List every non-directory entry below `root`, skipping `.git`.
    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Filesystem access through the standard library.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFs;

impl FileSystem for NativeFs {
    fn kind(&self, path: &Path) -> Option<FileKind> {
        let metadata = fs::symlink_metadata(path).ok()?;
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            Some(FileKind::Symlink)
        } else if file_type.is_dir() {
            Some(FileKind::Dir)
        } else {
            Some(FileKind::File)
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        mkdirp::mkdirp(path).map(|_| ())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Err(error) if error.kind() == ErrorKind::CrossesDevices => {
                debug!(
                    "{:?} and {:?} on different devices, copy instead",
                    from.display(),
                    to.display()
                );
                self.copy(from, to)?;
                self.remove(from)
            }
            result => result,
        }
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        match self.kind(path) {
            Some(FileKind::Dir) => fs::remove_dir_all(path),
            Some(_) => fs::remove_file(path),
            None => Err(io::Error::new(
                ErrorKind::NotFound,
                format!("{:?} does not exist", path.display()),
            )),
        }
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        if from.is_dir() {
            copy_dir_recursive(from, to)
        } else {
            fs::copy(from, to).map(|_| ())
        }
    }

    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_some_and(|file_type| !file_type.is_dir()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}

// Symbolic links inside of the source tree are recreated, not followed.
fn copy_dir_recursive(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            copy_symlink(&src, &dst)?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src, &dst)?;
        } else {
            fs::copy(&src, &dst)?;
        }
    }

    // INVARIANT: Apply directory permissions last, so read-only directories
    //            can still be filled.
    fs::set_permissions(to, fs::metadata(from)?.permissions())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(windows)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    if from.is_dir() {
        std::os::windows::fs::symlink_dir(target, to)
    } else {
        std::os::windows::fs::symlink_file(target, to)
    }
}
