// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use confix::{
    fs::NativeFs,
    path::{absolutize, default_backup_dir, default_config_path},
    store::SettingsStore,
    Confix,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::Pattern;
use std::{
    env::current_dir,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "confix [options] <confix-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to settings file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let mut store = SettingsStore::open(match self.config {
            Some(path) => absolutize(current_dir()?, path),
            None => default_config_path()?,
        })?;

        match self.command {
            Command::Info => run_info(&store),
            Command::Ls(opts) => run_ls(&store, opts),
            Command::SetRepo(opts) => run_set_repo(&mut store, opts),
            Command::Add(opts) => run_add(&store, opts),
            Command::Rm(opts) => run_rm(&store, opts),
            Command::SetMergeTool(opts) => run_set_merge_tool(&mut store, opts),
            Command::Link(opts) => run_link(&store, opts),
            Command::Unlink(opts) => run_unlink(&store, opts),
            Command::Merge(opts) => run_merge(&store, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show path to current repository.
    #[command(override_usage = "confix info")]
    Info,

    /// List tracked files, marking installed ones with '+'.
    #[command(override_usage = "confix ls [options] [<pattern>]")]
    Ls(LsOptions),

    /// Set path to repository.
    #[command(name = "setRepo", alias = "set-repo", override_usage = "confix setRepo <path>")]
    SetRepo(SetRepoOptions),

    /// Move file into repository, and replace it with a symbolic link.
    #[command(override_usage = "confix add [options] <path>")]
    Add(AddOptions),

    /// Delete repository copy of tracked file.
    #[command(override_usage = "confix rm <path>")]
    Rm(RmOptions),

    /// Set command used to merge a file with its repository copy.
    #[command(
        name = "setMergeTool",
        alias = "set-merge-tool",
        override_usage = "confix setMergeTool <command>"
    )]
    SetMergeTool(SetMergeToolOptions),

    /// Link file to its existing repository copy.
    #[command(override_usage = "confix link [options] <path>")]
    Link(LinkOptions),

    /// Remove symbolic link, keeping repository copy.
    #[command(override_usage = "confix unlink [options] <path>")]
    Unlink(UnlinkOptions),

    /// Open file and its repository copy in merge tool.
    #[command(override_usage = "confix merge <path>")]
    Merge(MergeOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LsOptions {
    /// Only list tracked files whose original path matches glob pattern.
    #[arg(value_name = "pattern")]
    pub pattern: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SetRepoOptions {
    /// Path to repository directory.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddOptions {
    /// File or directory to add.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,

    /// Overwrite repository copy if it already exists.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RmOptions {
    /// Original path, or path inside repository, of tracked file.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SetMergeToolOptions {
    /// Merge tool command, optionally using {local} and {repo} placeholders.
    #[arg(required = true, value_name = "command")]
    pub command: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LinkOptions {
    /// Path to link.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,

    /// Replace symbolic link that already exists at path.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UnlinkOptions {
    /// Path to unlink.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,

    /// Copy repository copy back in place of the link.
    #[arg(short, long)]
    pub restore: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MergeOptions {
    /// Path to merge with its repository copy.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn resolve(path: impl AsRef<Path>) -> Result<PathBuf> {
    let cwd = current_dir().context("cannot determine current directory")?;
    let path = shellexpand::tilde(path.as_ref().to_string_lossy().as_ref()).into_owned();
    Ok(absolutize(cwd, path))
}

fn open(store: &SettingsStore) -> Result<Confix> {
    let backup_dir = match default_backup_dir() {
        Ok(path) => Some(path),
        Err(err) => {
            warn!("{err}, backups disabled");
            None
        }
    };

    Ok(Confix::open(store, NativeFs)?.with_backup_dir(backup_dir))
}

fn run_info(store: &SettingsStore) -> Result<()> {
    let repo = store.repo(&NativeFs)?;
    println!("{}", repo.display());

    Ok(())
}

fn run_ls(store: &SettingsStore, opts: LsOptions) -> Result<()> {
    let confix = match Confix::open(store, NativeFs) {
        Ok(confix) => confix,
        Err(err) => {
            warn!("{err}");
            return Ok(());
        }
    };
    let pattern = match opts.pattern.as_deref().map(Pattern::new).transpose() {
        Ok(pattern) => pattern,
        Err(err) => {
            warn!("invalid glob pattern: {err}");
            return Ok(());
        }
    };
    let entries = match confix.list() {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot list repository: {err}");
            return Ok(());
        }
    };

    for entry in entries {
        if pattern
            .as_ref()
            .is_some_and(|pattern| !pattern.matches_path(&entry.original))
        {
            continue;
        }

        let marker = if entry.installed { '+' } else { ' ' };
        println!("{marker} {}", entry.relative.display());
    }

    Ok(())
}

fn run_set_repo(store: &mut SettingsStore, opts: SetRepoOptions) -> Result<()> {
    store.set_repo(&NativeFs, resolve(opts.path)?)?;

    Ok(())
}

fn run_add(store: &SettingsStore, opts: AddOptions) -> Result<()> {
    open(store)?.add(&resolve(opts.path)?, opts.force)?;

    Ok(())
}

fn run_rm(store: &SettingsStore, opts: RmOptions) -> Result<()> {
    open(store)?.rm(&resolve(opts.path)?)?;

    Ok(())
}

fn run_set_merge_tool(store: &mut SettingsStore, opts: SetMergeToolOptions) -> Result<()> {
    store.set_merge_tool(opts.command)?;

    Ok(())
}

fn run_link(store: &SettingsStore, opts: LinkOptions) -> Result<()> {
    open(store)?.link(&resolve(opts.path)?, opts.force)?;

    Ok(())
}

fn run_unlink(store: &SettingsStore, opts: UnlinkOptions) -> Result<()> {
    open(store)?.unlink(&resolve(opts.path)?, opts.restore)?;

    Ok(())
}

fn run_merge(store: &SettingsStore, opts: MergeOptions) -> Result<()> {
    open(store)?.merge(&resolve(opts.path)?)?;

    Ok(())
}
