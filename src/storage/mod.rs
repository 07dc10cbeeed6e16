//! Storage capability interface.
//!
//! A [`FilesManager`] is a stateless dispatcher for one storage system. It
//! hands out [`FileHandle`]s and [`FolderHandle`]s on demand; handles are
//! immutable views of a path and query the backend afresh on every call, so
//! two calls may observe concurrent external changes.
//!
//! Algorithms in this crate (search, config loading) only ever talk to these
//! traits. New backends are added as new implementations.

pub mod local;
pub mod path;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};
use crate::types::{Existence, Location, MetaData};

pub use local::{LocalFile, LocalFilesManager, LocalFolder};

/// Default advisory chunk size for streaming writes (10 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// A storage backend.
pub trait FilesManager: Send + Sync {
    /// Splits a path into `(directory, basename, extension)` without touching storage.
    fn path_split(&self, path: &str) -> (String, String, String) {
        path::split(path)
    }

    /// Splits a path into `(root, relative path)`.
    ///
    /// Backends with containers (buckets, sites) split the container name off;
    /// backends without a root concept return `("", path)`.
    fn path_split_root(&self, path: &str) -> (String, String);

    /// Joins parts into one normalized path; no parts yield `"."`.
    fn path_join(&self, parts: &[&str]) -> String {
        path::join(parts)
    }

    /// Segments leading from `root` to `path`; empty if `path` is not under `root`.
    fn path_rel(&self, root: &str, path: &str) -> Vec<String> {
        path::rel(root, path)
    }

    /// A handle to the file at `path`. Existence is not checked.
    fn get_file(&self, path: &str) -> Box<dyn FileHandle>;

    /// A handle to the folder at `path`. Existence is not checked.
    fn get_folder(&self, path: &str) -> Box<dyn FolderHandle>;

    /// Ensures the folder exists, creating intermediate folders as needed.
    fn create_folder(&self, path: &str) -> Result<Box<dyn FolderHandle>>;

    /// Ensures the parent folder exists, then writes `contents` to `path`,
    /// overwriting any existing file. `chunk_size` is an advisory batching hint.
    fn create_file(&self, contents: &[u8], path: &str, chunk_size: usize) -> Result<Box<dyn FileHandle>>;
}

/// One file-type object in a backend.
pub trait FileHandle: Send + Sync {
    /// Whether the file exists. Never fails.
    fn exists(&self) -> Existence;

    fn path(&self) -> &str;

    /// The folder containing the file.
    fn directory(&self) -> String {
        path::split(self.path()).0
    }

    /// Name including extension.
    fn filename(&self) -> String {
        path::file_name(self.path())
    }

    /// Name excluding extension.
    fn basename(&self) -> String {
        path::split(self.path()).1
    }

    /// Extension including the leading dot, or empty.
    fn ext(&self) -> String {
        path::split(self.path()).2
    }

    fn size(&self) -> Result<u64>;

    /// Owner name, best effort.
    fn author(&self) -> Option<String>;

    /// Owner id, best effort.
    fn author_id(&self) -> Option<u32>;

    fn date_created(&self) -> Result<Option<DateTime<FixedOffset>>>;

    fn date_modified(&self) -> Result<Option<DateTime<FixedOffset>>>;

    /// All metadata bundled.
    fn meta_data(&self) -> Result<MetaData> {
        Ok(MetaData {
            filename: self.filename(),
            basename: self.basename(),
            ext: self.ext(),
            size: self.size()?,
            author: self.author(),
            author_id: self.author_id(),
            time_created: self.date_created()?,
            time_updated: self.date_modified()?,
        })
    }

    fn read_bytes(&self) -> Result<Vec<u8>>;

    /// Deletes the file. `true` if it is gone afterwards, including when it
    /// never existed.
    fn delete_self(&self) -> bool;
}

/// A directory-like container in a backend.
pub trait FolderHandle: Send + Sync {
    /// Whether the folder exists. Never fails.
    fn exists(&self) -> Existence;

    fn path(&self) -> &str;

    /// The final path component.
    fn name(&self) -> String {
        path::file_name(self.path())
    }

    fn get_file(&self, name: &str) -> Box<dyn FileHandle>;

    /// Names of the direct file-type children.
    fn filenames(&self) -> Result<Vec<String>>;

    fn files(&self) -> Result<Vec<Box<dyn FileHandle>>>;

    fn get_subfolder(&self, name: &str) -> Box<dyn FolderHandle>;

    /// Paths of the direct folder-type children.
    fn subfolder_paths(&self) -> Result<Vec<String>>;

    fn subfolders(&self) -> Result<Vec<Box<dyn FolderHandle>>>;

    /// Whether a file of the same name is a direct child of this folder.
    fn has_file(&self, file: &dyn FileHandle) -> Result<bool> {
        let name = file.filename();
        Ok(self.filenames()?.iter().any(|n| *n == name))
    }

    fn files_meta_data(&self) -> Result<Vec<MetaData>> {
        self.files()?.iter().map(|f| f.meta_data()).collect()
    }

    /// Total size in bytes of every file below this folder.
    fn size(&self) -> Result<u64>;

    /// Creates or overwrites the child file `name`.
    fn write_bytes(&self, contents: &[u8], name: &str, chunk_size: usize) -> Result<Box<dyn FileHandle>>;

    /// Creates the subfolder `name` unless it already exists.
    fn add_subfolder(&self, name: &str) -> Result<Box<dyn FolderHandle>>;

    /// Deletes every direct child; child folders are deleted recursively.
    /// `false` if any deletion failed, in which case partial state remains.
    fn clear_folder(&self) -> bool;

    /// Clears then removes the folder. `true` when absent afterwards.
    fn delete_self(&self) -> bool;
}

/// Backends keyed by their system location.
pub type Managers = HashMap<Location, Arc<dyn FilesManager>>;

/// Obtains the backend for a system location.
pub fn get_files_manager(location: Location, tz: Option<FixedOffset>) -> Result<Arc<dyn FilesManager>> {
    match location {
        Location::Os => Ok(Arc::new(LocalFilesManager::new(tz))),
        Location::Sharepoint | Location::BlobStorage => Err(Error::UnsupportedBackend(location)),
    }
}

/// The backends available to this process. Only the local OS backend today.
pub fn default_managers(tz: Option<FixedOffset>) -> Result<Managers> {
    let mut managers = Managers::new();
    managers.insert(Location::Os, get_files_manager(Location::Os, tz)?);
    Ok(managers)
}
