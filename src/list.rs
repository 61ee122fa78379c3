// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tracked file listing.

use crate::{
    fs::FileSystem,
    link::{Confix, LinkError},
};

use std::{path::PathBuf, vec::IntoIter};
use tracing::instrument;

/// Tracked file found in repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Original absolute path.
    pub original: PathBuf,

    /// Path relative to repository root.
    pub relative: PathBuf,

    /// Original path resolves to repository copy.
    pub installed: bool,
}

/// Lazy sequence of tracked files, sorted by repository-relative path.
///
/// The repository is scanned up front, but installation status is only
/// determined as each entry is pulled.
#[derive(Debug)]
pub struct TrackedFiles<'confix, F>
where
    F: FileSystem,
{
    confix: &'confix Confix<F>,
    entries: IntoIter<PathBuf>,
}

impl<F> Iterator for TrackedFiles<'_, F>
where
    F: FileSystem,
{
    type Item = TrackedFile;

    fn next(&mut self) -> Option<Self::Item> {
        let relative = self.entries.next()?;
        let root = self.confix.resolver.root();
        let repo_path = root.join(&relative);

        // INVARIANT: Every entry came from the repository, so mapping back always works.
        let original = self.confix.resolver.to_original_path(&relative).ok()?;
        let installed = self.confix.is_installed(&original, &repo_path);

        Some(TrackedFile {
            original,
            relative,
            installed,
        })
    }
}

impl<F> Confix<F>
where
    F: FileSystem,
{
    /// List tracked files of repository.
    ///
    /// Every call rescans the repository, so the listing can be restarted at
    /// any time.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Io`] if repository cannot be scanned.
    #[instrument(skip(self), level = "debug")]
    pub fn list(&self) -> Result<TrackedFiles<'_, F>, LinkError> {
        let root = self.resolver.root();
        let mut entries = self
            .fs
            .walk_files(root)
            .map_err(|source| LinkError::Io {
                source,
                path: root.to_path_buf(),
            })?
            .into_iter()
            .filter_map(|path| path.strip_prefix(root).ok().map(PathBuf::from))
            .collect::<Vec<_>>();
        entries.sort();

        Ok(TrackedFiles {
            confix: self,
            entries: entries.into_iter(),
        })
    }
}
