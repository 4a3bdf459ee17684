//! moviefs binary.
//!
//! Populates the catalog and serves it as a faceted read-only filesystem.
//!
//! Usage:
//!   moviefs init
//!   moviefs add /srv/movies/drama/inception.mkv --info inception.json
//!   moviefs ls /actor/Guy\ Pearce
//!   moviefs cat /title/Memento/info
//!   moviefs mount ~/movies        # requires --features fuse

mod config;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use moviefs_catalog::{Catalog, CatalogDb, ItemMetadata};
use moviefs_kernel::{FacetTable, FileType, VfsOps};

use config::MovieFsConfig;

/// Faceted read-only filesystem over a movie catalog.
#[derive(Parser, Debug)]
#[command(name = "moviefs")]
#[command(about = "Browse a movie library by title, actor, director, genre, year and runtime")]
struct Args {
    /// Config file (default: ~/.config/moviefs/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog database, overrides the config file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Root of the real media library, overrides the config file
    #[arg(long, global = true)]
    path_base: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the catalog database
    Init,
    /// Add a media file to the catalog
    Add {
        /// Media file below the library root
        media: PathBuf,
        /// Metadata document (JSON) describing the file
        #[arg(long)]
        info: PathBuf,
    },
    /// List a directory of the virtual filesystem
    Ls {
        #[arg(default_value = "/")]
        path: PathBuf,
    },
    /// Show attributes of a virtual path
    Stat { path: PathBuf },
    /// Print a symlink target
    Readlink { path: PathBuf },
    /// Print file contents
    Cat { path: PathBuf },
    /// Mount the filesystem
    Mount { mountpoint: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries command output; logs go to stderr
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = MovieFsConfig::load(args.config.as_deref())?
        .with_overrides(args.database.as_deref(), args.path_base.as_deref());
    tracing::debug!(
        database = %config.database.display(),
        path_base = %config.path_base.display(),
        "configuration"
    );

    match args.command {
        Command::Init => cmd_init(&config),
        Command::Add { media, info } => cmd_add(&config, &media, &info),
        Command::Ls { path } => cmd_ls(&open_fs(&config)?, &path).await,
        Command::Stat { path } => cmd_stat(&open_fs(&config)?, &path).await,
        Command::Readlink { path } => {
            let target = open_fs(&config)?.readlink(&path).await?;
            println!("{}", target.display());
            Ok(())
        }
        Command::Cat { path } => {
            let content = open_fs(&config)?.read_all(&path).await?;
            std::io::stdout().write_all(&content)?;
            Ok(())
        }
        Command::Mount { mountpoint } => cmd_mount(open_fs(&config)?, mountpoint).await,
    }
}

fn open_catalog(config: &MovieFsConfig) -> Result<CatalogDb> {
    if let Some(dir) = config.database.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    CatalogDb::open(&config.database)
        .with_context(|| format!("failed to open catalog {}", config.database.display()))
}

/// Build the filesystem over an existing catalog.
fn open_fs(config: &MovieFsConfig) -> Result<FacetTable> {
    if !config.database.exists() {
        bail!(
            "no catalog at {} (run `moviefs init` first)",
            config.database.display()
        );
    }
    let catalog: Arc<dyn Catalog> = Arc::new(open_catalog(config)?);
    let fs = FacetTable::with_facets(catalog, &config.fs_options(), &config.facet_names())?;
    Ok(fs)
}

fn cmd_init(config: &MovieFsConfig) -> Result<()> {
    let db = open_catalog(config)?;
    println!(
        "catalog at {} ({} items)",
        config.database.display(),
        db.item_count()?
    );
    Ok(())
}

/// Path of `media` relative to `base`, both resolved on disk.
fn library_relative(base: &Path, media: &Path) -> Result<String> {
    let base = base
        .canonicalize()
        .with_context(|| format!("library root {} not found", base.display()))?;
    let media = media
        .canonicalize()
        .with_context(|| format!("media file {} not found", media.display()))?;
    let relative = media.strip_prefix(&base).with_context(|| {
        format!(
            "{} is not inside the library root {}",
            media.display(),
            base.display()
        )
    })?;
    match relative.to_str() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        Some(_) => bail!("{} is the library root itself", media.display()),
        None => bail!("{} is not valid UTF-8", relative.display()),
    }
}

fn cmd_add(config: &MovieFsConfig, media: &Path, info: &Path) -> Result<()> {
    let relative = library_relative(&config.path_base, media)?;
    let meta = ItemMetadata::from_file(info)
        .with_context(|| format!("failed to load metadata {}", info.display()))?;
    let db = open_catalog(config)?;
    let item = db.add_item(&relative, &meta)?;
    println!("{}\t{}\t{}", item.id, item.name, item.path);
    Ok(())
}

fn kind_suffix(kind: FileType) -> &'static str {
    match kind {
        FileType::Directory => "/",
        FileType::Symlink => "@",
        FileType::File => "",
    }
}

async fn cmd_ls(fs: &FacetTable, path: &Path) -> Result<()> {
    for entry in fs.readdir(path).await? {
        println!("{}{}", entry.name, kind_suffix(entry.kind));
    }
    Ok(())
}

async fn cmd_stat(fs: &FacetTable, path: &Path) -> Result<()> {
    let attr = fs.getattr(path).await?;
    let kind = match attr.kind {
        FileType::Directory => "directory",
        FileType::Symlink => "symbolic link",
        FileType::File => "regular file",
    };
    println!("  File: {}", path.display());
    println!("  Size: {:<10} {}", attr.size, kind);
    println!("Access: {:04o}  Links: {}", attr.perm, attr.nlink);
    Ok(())
}

#[cfg(feature = "fuse")]
async fn cmd_mount(fs: FacetTable, mountpoint: PathBuf) -> Result<()> {
    use moviefs_kernel::fuse::{MovieFuse, mount};

    let fuse = MovieFuse::new(Arc::new(fs))?;
    // mount2 blocks until unmounted, and its callbacks block on this runtime
    tokio::task::spawn_blocking(move || mount(fuse, &mountpoint))
        .await
        .context("mount thread panicked")??;
    Ok(())
}

#[cfg(not(feature = "fuse"))]
async fn cmd_mount(_fs: FacetTable, mountpoint: PathBuf) -> Result<()> {
    bail!(
        "cannot mount {}: moviefs was built without FUSE support (rebuild with --features fuse)",
        mountpoint.display()
    )
}
