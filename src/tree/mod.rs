//! Directory tree over the node table
//!
//! Nodes are lightweight handles (store reference plus row id). Every read
//! goes to the store; nothing about a node is cached in memory.

pub mod dir;
pub mod file;
pub mod node;
pub mod path;
pub mod relation;

pub use dir::Directory;
pub use file::File;
pub use node::{FsNode, Node, NodeHandle, NodeStat};
pub use path::NameCase;
