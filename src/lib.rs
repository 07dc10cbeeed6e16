//! # searchfs
//!
//! Storage-agnostic file search and config resolution.
//!
//! ## Core Components
//!
//! - [`storage`]: Storage capability interface and the local filesystem backend
//! - [`search`]: Bounded, lazy breadth-first file search
//! - [`loader`]: Recursive config loading with proxy documents and cycle detection
//! - [`feature`]: The search-fs run: search a root and publish one record per file
//! - [`config`]: Layered application configuration
//! - [`error`]: Library error type
//! - [`logging`]: Subscriber setup for the binary
//! - [`types`]: Shared data types
//!
//! ## Example
//!
//! ```ignore
//! use searchfs::search::search_files;
//! use searchfs::storage::LocalFilesManager;
//! use searchfs::types::SearchOptions;
//!
//! let manager = LocalFilesManager::default();
//! for hit in search_files(&manager, "data", &SearchOptions::default()) {
//!     let hit = hit?;
//!     println!("{} {}/{}", hit.depth, hit.path, hit.filename);
//! }
//! ```

pub mod config;
pub mod error;
pub mod feature;
pub mod loader;
pub mod logging;
pub mod search;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;
