//! CLI Tooling
//!
//! Command-line interface over one store file. Every command opens the store,
//! runs one operation and renders its result as text or JSON.

use super::format::{
    child_stats, format_info_text, format_listing_text, format_stat_text, format_tree, kind_label,
    to_json,
};
use crate::concurrency::LockRegistry;
use crate::config::SqlFsConfig;
use crate::error::FsError;
use crate::fs::SqlFs;
use crate::logging::LoggingConfig;
use crate::payload::SimpleFileData;
use crate::store::schema::InfoField;
use crate::tree::path::{segments, strip_absolute, SEPARATOR};
use crate::tree::{Directory, FsNode, Node};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// SqlFs CLI - a directory tree stored in a single SQLite file
#[derive(Parser, Debug)]
#[command(name = "sqlfs")]
#[command(about = "Hierarchical file system stored in a single SQLite database")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store file (default: $XDG_DATA_HOME/sqlfs/default.db)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,
}

impl Cli {
    /// Logging config with command-line overrides applied.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        config
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create the store if needed and show its info
    Init,
    /// Show one info entry, or all well-known entries
    Info { name: Option<String> },
    /// Set an info entry
    SetInfo { name: String, value: String },
    /// Create a directory
    Mkdir {
        path: String,
        /// Create missing parents; existing directories are not an error
        #[arg(long, short)]
        parents: bool,
    },
    /// Create an empty file if it does not exist
    Touch { path: String },
    /// Replace a file's content, creating the file if needed
    Write {
        path: String,
        /// Store this text
        #[arg(long, conflicts_with = "from")]
        text: Option<String>,
        /// Store the bytes of a host file
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Print a file's content
    Cat { path: String },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the tree below a directory
    Tree {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show node metadata
    Stat {
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Move a node into another directory
    Mv { src: String, dest: String },
    /// Rename a node in place
    Rename { path: String, new_name: String },
    /// Delete a node (directories recursively)
    Rm { path: String },
}

/// CLI context: an open store plus the configuration it was opened with
pub struct CliContext {
    fs: SqlFs,
    config: SqlFsConfig,
}

impl CliContext {
    pub fn new(store: &Path, config: SqlFsConfig) -> Result<Self, FsError> {
        let registry = LockRegistry::shared();
        let fs = SqlFs::open_with(
            store,
            &registry,
            &SimpleFileData::new(),
            config.store.clone(),
        )?;
        Ok(Self { fs, config })
    }

    pub fn fs(&self) -> &SqlFs {
        &self.fs
    }

    pub fn config(&self) -> &SqlFsConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String, FsError> {
        info!(command = ?command, "executing command");
        match command {
            Commands::Init => self.handle_init(),
            Commands::Info { name } => self.handle_info(name.as_deref()),
            Commands::SetInfo { name, value } => {
                self.fs.set_info(name, value)?;
                Ok(format!("Set {} = {}", name, value))
            }
            Commands::Mkdir { path, parents } => self.handle_mkdir(path, *parents),
            Commands::Touch { path } => self.handle_touch(path),
            Commands::Write { path, text, from } => {
                self.handle_write(path, text.as_deref(), from.as_deref())
            }
            Commands::Cat { path } => self.handle_cat(path),
            Commands::Ls { path, format } => self.handle_ls(path, format),
            Commands::Tree { path } => format_tree(&self.fs.resolve_dir(path)?),
            Commands::Stat { path, format } => {
                let stat = self.fs.resolve(path)?.stat()?;
                if format == "json" {
                    to_json(&stat)
                } else {
                    Ok(format_stat_text(&stat))
                }
            }
            Commands::Mv { src, dest } => {
                let node = self.fs.resolve(src)?;
                node.move_to_path(dest)?;
                Ok(format!("Moved {} to {}", src, dest))
            }
            Commands::Rename { path, new_name } => {
                let node = self.fs.resolve(path)?;
                node.rename(new_name)?;
                Ok(format!("Renamed {} to {}", path, new_name.trim()))
            }
            Commands::Rm { path } => {
                let node = self.fs.resolve(path)?;
                node.delete()?;
                Ok(format!("Removed {} {}", kind_label(node.kind()), path))
            }
        }
    }

    fn handle_init(&self) -> Result<String, FsError> {
        let location = self
            .fs
            .location()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| self.fs.lock_key().to_string());
        let headline = if self.fs.is_newly_created() {
            format!("Initialized store at {}", location)
        } else {
            format!("Store at {} already initialized", location)
        };
        Ok(format!("{}\n{}", headline, self.handle_info(None)?))
    }

    fn handle_info(&self, name: Option<&str>) -> Result<String, FsError> {
        match name {
            Some(name) => Ok(self
                .fs
                .get_info(name)?
                .unwrap_or_else(|| format!("{} is not set", name))),
            None => {
                let entries = InfoField::ALL
                    .iter()
                    .map(|field| Ok((field.as_str().to_string(), self.fs.info(*field)?)))
                    .collect::<Result<Vec<_>, FsError>>()?;
                Ok(format_info_text(&entries))
            }
        }
    }

    fn handle_mkdir(&self, path: &str, parents: bool) -> Result<String, FsError> {
        if !parents {
            let (parent, name) = split_parent(path)?;
            self.fs.resolve_dir(parent)?.add_dir(name)?;
            return Ok(format!("Created directory {}", path));
        }

        self.fs.atomically(|fs| {
            let mut current: Directory<'_> = fs.root()?;
            for segment in segments(strip_absolute(path)?) {
                current = match current.get_child(segment) {
                    Ok(Node::Dir(dir)) => dir,
                    Ok(Node::File(_)) => return Err(FsError::NotDirInPath(segment.to_string())),
                    Err(err) if err.is_not_found() => current.add_dir(segment)?,
                    Err(err) => return Err(err),
                };
            }
            Ok(format!("Created directory {}", path))
        })
    }

    fn handle_touch(&self, path: &str) -> Result<String, FsError> {
        match self.fs.resolve(path) {
            Ok(Node::File(_)) => Ok(format!("{} exists", path)),
            Ok(Node::Dir(_)) => Err(FsError::NameAlreadyExists(path.to_string())),
            Err(err) if err.is_not_found() => {
                let (parent, name) = split_parent(path)?;
                self.fs.resolve_dir(parent)?.add_file(name)?;
                Ok(format!("Created file {}", path))
            }
            Err(err) => Err(err),
        }
    }

    fn handle_write(
        &self,
        path: &str,
        text: Option<&str>,
        from: Option<&Path>,
    ) -> Result<String, FsError> {
        let data = match (text, from) {
            (_, Some(host)) => SimpleFileData::from_bytes(std::fs::read(host)?),
            (Some(text), None) => SimpleFileData::from_text(text),
            (None, None) => SimpleFileData::from_text(""),
        };

        self.fs.atomically(|fs| {
            let file = match fs.resolve(path) {
                Ok(Node::File(file)) => file,
                Ok(Node::Dir(_)) => return Err(FsError::NameAlreadyExists(path.to_string())),
                Err(err) if err.is_not_found() => {
                    let (parent, name) = split_parent(path)?;
                    fs.resolve_dir(parent)?.add_file(name)?
                }
                Err(err) => return Err(err),
            };
            file.write_payload(&data)?;
            Ok(format!("Wrote {} bytes to {}", file.size()?, path))
        })
    }

    fn handle_cat(&self, path: &str) -> Result<String, FsError> {
        let file = self.fs.resolve_file(path)?;
        if !file.has_payload()? {
            return Ok(String::new());
        }
        let mut data = SimpleFileData::new();
        file.read_payload(&mut data)?;
        Ok(match (data.text(), data.binary()) {
            (Some(text), _) => text.to_string(),
            (None, Some(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
            (None, None) => String::new(),
        })
    }

    fn handle_ls(&self, path: &str, format: &str) -> Result<String, FsError> {
        let entries = match self.fs.resolve(path)? {
            Node::Dir(dir) => child_stats(&dir)?,
            node @ Node::File(_) => vec![node.stat()?],
        };
        if format == "json" {
            to_json(&entries)
        } else {
            Ok(format_listing_text(&entries))
        }
    }
}

/// Split an absolute path into its parent directory path and final name.
fn split_parent(path: &str) -> Result<(&str, &str), FsError> {
    let relative = strip_absolute(path)?;
    if relative.is_empty() {
        return Err(FsError::InvalidName(path.to_string()));
    }
    let start = path.len() - path.trim_start_matches(SEPARATOR).len();
    let trimmed = &path[..start + relative.len()];
    match trimmed.rsplit_once(SEPARATOR) {
        Some(("", name)) => Ok(("/", name)),
        Some((parent, name)) => Ok((parent, name)),
        None => Err(FsError::MustUseAbsolutePath(path.to_string())),
    }
}
