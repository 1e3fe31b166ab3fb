use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use qbit_janitor::api::create_api_client;
use qbit_janitor::query::{sort_records, SortColumn};
use qbit_janitor::{CliArgs, Config, DirectoryRecord, FileFilter, FileRecord, Janitor, Metrics, QbitClient};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "qbit-janitor")]
#[command(about = "Find hardlinked, duplicate and orphaned torrent downloads and clean them up")]
struct Cli {
    #[arg(short, long, global = true, help = "Increase verbosity")]
    verbose: bool,

    #[arg(long, global = true, help = "Config file (.toml or .json)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "qBittorrent WebUI URL")]
    api_url: Option<String>,

    #[arg(long, global = true)]
    username: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    #[arg(long = "root", global = true, help = "Scan root, repeatable")]
    roots: Vec<PathBuf>,

    #[arg(long, global = true, help = "Directory holding snapshot files")]
    cache_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Skip partial hashing")]
    no_hash: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List scanned files below a directory
    Files {
        path: PathBuf,
        #[arg(long)]
        hardlink: Option<bool>,
        #[arg(long)]
        in_qbit: Option<bool>,
        #[arg(long)]
        folder_in_qbit: Option<bool>,
        #[arg(long)]
        hash_duplicate: Option<bool>,
        #[arg(long, help = "Rescan and refetch the manifest")]
        clear: bool,
        #[arg(long, help = "path, size, folder, inode or hash")]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
    },
    /// List directories below a directory with their recursive sizes
    Dirs {
        path: PathBuf,
        #[arg(long)]
        clear: bool,
    },
    /// List directories with no entries
    Empty { path: PathBuf },
    /// List directories below a size threshold
    Small {
        path: PathBuf,
        #[arg(long, help = "Threshold in bytes")]
        threshold: Option<u64>,
    },
    /// List torrents known to the download client
    Torrents {
        #[arg(long)]
        clear: bool,
    },
    /// List every file path managed by the download client
    TorrentFiles {
        #[arg(long)]
        clear: bool,
    },
    /// Delete one file
    DeleteFile { path: PathBuf },
    /// Delete one folder recursively
    DeleteFolder { path: PathBuf },
    /// Delete several files or folders, continuing past failures
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

impl Cli {
    fn config_args(&self) -> CliArgs {
        CliArgs {
            api_url: self.api_url.clone(),
            config_file: self.config.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            roots: self.roots.clone(),
            cache_dir: self.cache_dir.clone(),
            no_hash: self.no_hash,
        }
    }
}

#[derive(Serialize)]
struct BatchFailure {
    path: PathBuf,
    error: String,
}

#[derive(Serialize)]
struct BatchReport {
    deleted: Vec<PathBuf>,
    errors: Vec<BatchFailure>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_with_cli(&cli.config_args()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        config
            .logging
            .level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!(config = ?config, "Configuration loaded");

    let metrics = Arc::new(Metrics::new());
    let janitor = Janitor::from_config(&config, Arc::clone(&metrics))
        .context("Failed to create download client")?;

    let outcome = run(cli.command, &config, &janitor).await;
    metrics.log_full_summary();
    outcome
}

async fn run(command: Command, config: &Config, janitor: &Janitor<QbitClient>) -> Result<()> {
    match command {
        Command::Files {
            path,
            hardlink,
            in_qbit,
            folder_in_qbit,
            hash_duplicate,
            clear,
            sort,
            desc,
        } => {
            let filter = FileFilter {
                hardlink,
                in_qbit,
                folder_in_qbit,
                hash_duplicate,
            };
            let mut files = janitor.get_files_in_directory(&path, &filter, clear).await?;
            if let Some(column) = sort {
                sort_records(&mut files, SortColumn::parse(&column)?, desc);
            }
            tracing::info!(
                files = files.len(),
                total_gb = files.iter().map(FileRecord::size_gb).sum::<f64>(),
                "Listed files"
            );
            print_json(&files)
        }
        Command::Dirs { path, clear } => {
            let dirs = janitor.get_directories_in_directory(&path, clear).await?;
            tracing::info!(
                dirs = dirs.len(),
                largest_gb = dirs.iter().map(DirectoryRecord::size_gb).fold(0.0, f64::max),
                "Listed directories"
            );
            print_json(&dirs)
        }
        Command::Empty { path } => print_json(&janitor.get_empty_folders(&path).await?),
        Command::Small { path, threshold } => {
            let small = janitor.get_small_folders(&path, threshold).await?;
            for dir in &small {
                tracing::debug!(path = %dir.path.display(), size_mb = dir.size_mb(), "Small folder");
            }
            print_json(&small)
        }
        Command::Torrents { clear } => {
            let client = create_api_client(&config.api, None)?;
            if !client.health_check().await? {
                tracing::warn!(url = %config.api.url, "Download client did not answer the version check");
            }
            let torrents = janitor.get_torrents(clear).await?;
            for torrent in &torrents {
                tracing::debug!(
                    name = %torrent.name,
                    progress = torrent.percent(),
                    size_gb = torrent.total_size_gb(),
                    "Torrent"
                );
            }
            print_json(&torrents)
        }
        Command::TorrentFiles { clear } => print_json(&janitor.get_torrent_files(clear).await?),
        Command::DeleteFile { path } => {
            janitor
                .delete_file(&path)
                .await
                .with_context(|| format!("Failed to delete {}", path.display()))?;
            print_json(&BatchReport {
                deleted: vec![path],
                errors: Vec::new(),
            })
        }
        Command::DeleteFolder { path } => {
            janitor
                .delete_folder(&path)
                .await
                .with_context(|| format!("Failed to delete {}", path.display()))?;
            print_json(&BatchReport {
                deleted: vec![path],
                errors: Vec::new(),
            })
        }
        Command::Delete { paths } => {
            let result = janitor.delete_multiple(&paths).await;
            let complete = result.is_complete();
            let failed = result.errors.len();
            print_json(&BatchReport {
                deleted: result.deleted,
                errors: result
                    .errors
                    .into_iter()
                    .map(|f| BatchFailure {
                        path: f.path,
                        error: f.error.to_string(),
                    })
                    .collect(),
            })?;
            if !complete {
                bail!("{} of {} deletions failed", failed, paths.len());
            }
            Ok(())
        }
    }
}
