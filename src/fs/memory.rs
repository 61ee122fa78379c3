// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    fs::{FileKind, FileSystem},
    path::normalize,
};

use std::{
    cell::RefCell,
    collections::BTreeMap,
    io::{self, ErrorKind},
    path::{Component, Path, PathBuf},
};

const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    File(String),
    Dir,
    Symlink(PathBuf),
}

/// In-memory filesystem for tests.
///
/// Paths are expected to be absolute. Mutating operations do not resolve
/// symbolic links in parent components.
#[derive(Debug)]
pub(crate) struct MemoryFs {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            nodes: RefCell::new(nodes),
        }
    }
}

impl MemoryFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.insert_parents(path.as_ref());
        self.nodes
            .borrow_mut()
            .insert(path.as_ref().to_path_buf(), Node::Dir);
        self
    }

    pub(crate) fn with_file(self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.insert_parents(path.as_ref());
        self.nodes
            .borrow_mut()
            .insert(path.as_ref().to_path_buf(), Node::File(contents.into()));
        self
    }

    pub(crate) fn with_symlink(self, target: impl AsRef<Path>, link: impl AsRef<Path>) -> Self {
        self.insert_parents(link.as_ref());
        self.nodes.borrow_mut().insert(
            link.as_ref().to_path_buf(),
            Node::Symlink(target.as_ref().to_path_buf()),
        );
        self
    }

    /// Read file contents, following symbolic links.
    pub(crate) fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        let resolved = self.resolve(path.as_ref()).ok()?;
        match self.nodes.borrow().get(&resolved) {
            Some(Node::File(contents)) => Some(contents.clone()),
            _ => None,
        }
    }

    pub(crate) fn node(&self, path: impl AsRef<Path>) -> Option<Node> {
        self.nodes.borrow().get(path.as_ref()).cloned()
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<PathBuf, Node> {
        self.nodes.borrow().clone()
    }

    fn insert_parents(&self, path: &Path) {
        let mut nodes = self.nodes.borrow_mut();
        for ancestor in path.ancestors().skip(1) {
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let nodes = self.nodes.borrow();
        let mut current = PathBuf::new();
        let mut hops = 0;

        for component in path.components() {
            match component {
                Component::ParentDir => {
                    current.pop();
                    continue;
                }
                Component::CurDir => continue,
                other => current.push(other.as_os_str()),
            }

            loop {
                match nodes.get(&current) {
                    Some(Node::Symlink(target)) => {
                        hops += 1;
                        if hops > MAX_LINK_HOPS {
                            return Err(io::Error::other("too many levels of symbolic links"));
                        }

                        current = match current.parent() {
                            Some(parent) => normalize(parent.join(target)),
                            None => normalize(target),
                        };
                    }
                    Some(_) => break,
                    None => return Err(not_found(&current)),
                }
            }
        }

        Ok(current)
    }

    fn require_parent_dir(&self, path: &Path) -> io::Result<()> {
        let parent = path.parent().ok_or_else(|| not_found(path))?;
        match self.nodes.borrow().get(parent) {
            Some(Node::Dir) => Ok(()),
            _ => Err(not_found(parent)),
        }
    }

    fn subtree(&self, path: &Path) -> Vec<(PathBuf, Node)> {
        self.nodes
            .borrow()
            .iter()
            .filter(|(key, _)| key.starts_with(path))
            .map(|(key, node)| (key.clone(), node.clone()))
            .collect()
    }
}

impl FileSystem for MemoryFs {
    fn kind(&self, path: &Path) -> Option<FileKind> {
        match self.nodes.borrow().get(path)? {
            Node::File(_) => Some(FileKind::File),
            Node::Dir => Some(FileKind::Dir),
            Node::Symlink(_) => Some(FileKind::Symlink),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve(path)
            .is_ok_and(|resolved| self.nodes.borrow().get(&resolved) == Some(&Node::Dir))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.nodes.borrow().get(path) {
            Some(Node::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(ErrorKind::InvalidInput, "not a symlink")),
            None => Err(not_found(path)),
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.resolve(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.insert_parents(path);
        self.nodes
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_insert(Node::Dir);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.kind(from).is_none() {
            return Err(not_found(from));
        }
        if to != from && to.starts_with(from) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("cannot move {:?} into itself", from.display()),
            ));
        }
        self.require_parent_dir(to)?;

        let moved = self.subtree(from);
        let mut nodes = self.nodes.borrow_mut();
        for (key, node) in moved {
            nodes.remove(&key);
            nodes.insert(rebase(&key, from, to)?, node);
        }

        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        if self.kind(link).is_some() {
            return Err(io::Error::new(ErrorKind::AlreadyExists, "link exists"));
        }
        self.require_parent_dir(link)?;
        self.nodes
            .borrow_mut()
            .insert(link.to_path_buf(), Node::Symlink(target.to_path_buf()));
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if self.kind(path).is_none() {
            return Err(not_found(path));
        }

        let doomed = self.subtree(path);
        let mut nodes = self.nodes.borrow_mut();
        for (key, _) in doomed {
            nodes.remove(&key);
        }

        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let source = self.resolve(from)?;
        self.require_parent_dir(to)?;

        let copied = self.subtree(&source);
        let mut nodes = self.nodes.borrow_mut();
        for (key, node) in copied {
            nodes.insert(rebase(&key, &source, to)?, node);
        }

        Ok(())
    }

    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.is_dir(root) {
            return Err(not_found(root));
        }

        Ok(self
            .nodes
            .borrow()
            .iter()
            .filter(|(key, node)| {
                key.starts_with(root)
                    && **node != Node::Dir
                    && !key
                        .strip_prefix(root)
                        .is_ok_and(|rest| rest.components().any(|c| c.as_os_str() == ".git"))
            })
            .map(|(key, _)| key.clone())
            .collect())
    }
}

fn rebase(key: &Path, from: &Path, to: &Path) -> io::Result<PathBuf> {
    let suffix = key.strip_prefix(from).map_err(io::Error::other)?;
    if suffix.as_os_str().is_empty() {
        Ok(to.to_path_buf())
    } else {
        Ok(to.join(suffix))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        ErrorKind::NotFound,
        format!("{:?} does not exist", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_through_symlinked_directory() {
        let fs = MemoryFs::new()
            .with_file("/repo/home/u/.config/nvim/init.lua", "vim.o.number = true")
            .with_symlink("/repo/home/u/.config/nvim", "/home/u/.config/nvim");

        let result = fs.canonicalize(Path::new("/home/u/.config/nvim/init.lua"));
        assert_eq!(
            result.ok(),
            Some(PathBuf::from("/repo/home/u/.config/nvim/init.lua"))
        );
        assert_eq!(
            fs.read("/home/u/.config/nvim/init.lua"),
            Some("vim.o.number = true".into())
        );
    }

    #[test]
    fn dangling_symlink_does_not_exist() {
        let fs = MemoryFs::new().with_symlink("/repo/gone", "/home/u/.gitconfig");
        assert!(!fs.exists(Path::new("/home/u/.gitconfig")));
        assert_eq!(fs.kind(Path::new("/home/u/.gitconfig")), Some(FileKind::Symlink));
    }

    #[test]
    fn rename_moves_whole_subtree() -> anyhow::Result<()> {
        let fs = MemoryFs::new()
            .with_file("/home/u/.config/nvim/init.lua", "")
            .with_dir("/repo");
        fs.rename(Path::new("/home/u/.config/nvim"), Path::new("/repo/nvim"))?;

        assert_eq!(fs.node("/home/u/.config/nvim"), None);
        assert_eq!(fs.node("/repo/nvim"), Some(Node::Dir));
        assert_eq!(fs.node("/repo/nvim/init.lua"), Some(Node::File("".into())));

        Ok(())
    }

    #[test]
    fn rename_into_own_subtree_fails() {
        let fs = MemoryFs::new().with_file("/home/u/.confixRepo/home/u/.gitconfig", "");
        let before = fs.snapshot();

        let result = fs.rename(
            Path::new("/home/u"),
            Path::new("/home/u/.confixRepo/home/u"),
        );
        assert_eq!(result.map_err(|err| err.kind()), Err(ErrorKind::InvalidInput));
        assert_eq!(fs.snapshot(), before);
    }
}
