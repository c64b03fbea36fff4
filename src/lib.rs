//! SqlFs: a hierarchical file system stored in a relational database
//!
//! Directories and files are rows of one node table; file content lives in a
//! payload table whose layout is defined by a [`payload::FileDataCodec`].
//! Every structural change runs under a per-location lock inside one
//! transaction, so concurrent handles on the same store never observe a
//! half-applied move or delete.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod payload;
pub mod store;
pub mod time;
pub mod tooling;
pub mod tree;
pub mod types;

pub use concurrency::LockRegistry;
pub use error::{ErrorKind, FsError};
pub use fs::SqlFs;
pub use payload::{FileDataCodec, SimpleFileData};
pub use tree::{Directory, File, FsNode, Node, NodeStat};
pub use types::{FsId, NodeKind};
