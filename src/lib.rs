// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile management through relocation and symbolic links.
//!
//! Confix moves dotfiles into a designated __repository__ directory, and
//! replaces the originals with symbolic links to the moved copies. The
//! repository can then be versioned or synced however the user likes, and
//! linked back into place on any other machine.

pub mod config;
pub mod fs;
pub mod link;
pub mod list;
pub mod merge;
pub mod path;
pub mod store;

pub use link::{Confix, LinkError};
pub use list::{TrackedFile, TrackedFiles};
pub use store::{SettingsStore, StoreError};
