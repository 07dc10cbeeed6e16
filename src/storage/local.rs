//! Storage backend over the local filesystem.

use std::fs;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{path, FileHandle, FilesManager, FolderHandle};
use crate::error::{Error, IoResultExt, Result};
use crate::types::Existence;

/// Files manager for the local operating system.
///
/// Every timestamp it exposes is shifted into `tz` (UTC when unset).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesManager {
    tz: Option<FixedOffset>,
}

impl LocalFilesManager {
    pub fn new(tz: Option<FixedOffset>) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Option<FixedOffset> {
        self.tz
    }
}

impl FilesManager for LocalFilesManager {
    fn path_split_root(&self, path: &str) -> (String, String) {
        // No distinct root concept on a local filesystem.
        (String::new(), path.to_string())
    }

    fn get_file(&self, path: &str) -> Box<dyn FileHandle> {
        Box::new(LocalFile::new(path, self.tz))
    }

    fn get_folder(&self, path: &str) -> Box<dyn FolderHandle> {
        Box::new(LocalFolder::new(path, self.tz))
    }

    fn create_folder(&self, path: &str) -> Result<Box<dyn FolderHandle>> {
        let folder = LocalFolder::new(path, self.tz);
        fs::create_dir_all(&folder.path).with_path(&folder.path)?;
        debug!("Ensured folder {}", folder.path);
        Ok(Box::new(folder))
    }

    fn create_file(&self, contents: &[u8], path: &str, chunk_size: usize) -> Result<Box<dyn FileHandle>> {
        let (directory, basename, ext) = path::split(path);
        let folder = self.create_folder(&directory)?;
        folder.write_bytes(contents, &format!("{}{}", basename, ext), chunk_size)
    }
}

/// A file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: String,
    tz: Option<FixedOffset>,
}

impl LocalFile {
    pub fn new(path: &str, tz: Option<FixedOffset>) -> Self {
        Self { path: path::normalize(path), tz }
    }

    fn metadata(&self) -> Result<fs::Metadata> {
        fs::metadata(&self.path).with_path(&self.path)
    }
}

impl FileHandle for LocalFile {
    fn exists(&self) -> Existence {
        existence(&self.path)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn size(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    #[cfg(unix)]
    fn author(&self) -> Option<String> {
        let uid = self.author_id()?;
        nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid))
            .ok()
            .flatten()
            .map(|user| user.name)
    }

    #[cfg(not(unix))]
    fn author(&self) -> Option<String> {
        None
    }

    #[cfg(unix)]
    fn author_id(&self) -> Option<u32> {
        fs::metadata(&self.path).ok().map(|m| m.uid())
    }

    #[cfg(not(unix))]
    fn author_id(&self) -> Option<u32> {
        None
    }

    fn date_created(&self) -> Result<Option<DateTime<FixedOffset>>> {
        let meta = self.metadata()?;
        let tz = offset_or_utc(self.tz);
        if let Ok(t) = meta.created() {
            return Ok(Some(to_datetime(t, tz)));
        }
        Ok(change_time(&meta).map(|t| t.with_timezone(&tz)))
    }

    fn date_modified(&self) -> Result<Option<DateTime<FixedOffset>>> {
        let meta = self.metadata()?;
        let t = meta.modified().with_path(&self.path)?;
        Ok(Some(to_datetime(t, offset_or_utc(self.tz))))
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).with_path(&self.path)
    }

    fn delete_self(&self) -> bool {
        // A dangling link still occupies its path, so check the link itself.
        if link_existence(&self.path).is_absent() {
            return true;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to delete file {}: {}", self.path, e);
                return false;
            }
        }
        link_existence(&self.path).is_absent()
    }
}

/// A folder on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFolder {
    path: String,
    tz: Option<FixedOffset>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Folder,
}

impl LocalFolder {
    pub fn new(path: &str, tz: Option<FixedOffset>) -> Self {
        Self { path: path::normalize(path), tz }
    }

    fn child_path(&self, name: &str) -> String {
        path::join(&[self.path.as_str(), name])
    }

    /// One flat directory read, keeping children of the requested kind.
    /// Symlinks are classified by their target; dangling links are skipped.
    fn list_children(&self, kind: EntryKind) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path).with_path(&self.path)? {
            let entry = entry.with_path(&self.path)?;
            let child = entry.path();
            let file_type = entry.file_type().with_path(&child.to_string_lossy())?;
            let (is_file, is_dir) = if file_type.is_symlink() {
                match fs::metadata(&child) {
                    Ok(m) => (m.is_file(), m.is_dir()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(Error::io(child.to_string_lossy(), e)),
                }
            } else {
                (file_type.is_file(), file_type.is_dir())
            };
            let wanted = match kind {
                EntryKind::File => is_file,
                EntryKind::Folder => is_dir,
            };
            if wanted {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        // read_dir order is unspecified; keep sibling order stable
        names.sort();
        Ok(names)
    }

    /// Links in this folder whose target no longer exists. Listings skip
    /// them, so clearing removes them separately.
    fn dangling_links(&self) -> Result<Vec<String>> {
        let mut links = Vec::new();
        for entry in fs::read_dir(&self.path).with_path(&self.path)? {
            let entry = entry.with_path(&self.path)?;
            let child = entry.path();
            let file_type = entry.file_type().with_path(&child.to_string_lossy())?;
            if file_type.is_symlink() && existence(&child.to_string_lossy()).is_absent() {
                links.push(self.child_path(&entry.file_name().to_string_lossy()));
            }
        }
        Ok(links)
    }

    fn is_symlink(&self) -> bool {
        fs::symlink_metadata(&self.path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }
}

impl FolderHandle for LocalFolder {
    fn exists(&self) -> Existence {
        existence(&self.path)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn get_file(&self, name: &str) -> Box<dyn FileHandle> {
        Box::new(LocalFile::new(&self.child_path(name), self.tz))
    }

    fn filenames(&self) -> Result<Vec<String>> {
        self.list_children(EntryKind::File)
    }

    fn files(&self) -> Result<Vec<Box<dyn FileHandle>>> {
        Ok(self
            .filenames()?
            .iter()
            .map(|name| self.get_file(name))
            .collect())
    }

    fn get_subfolder(&self, name: &str) -> Box<dyn FolderHandle> {
        Box::new(LocalFolder::new(&self.child_path(name), self.tz))
    }

    fn subfolder_paths(&self) -> Result<Vec<String>> {
        Ok(self
            .list_children(EntryKind::Folder)?
            .iter()
            .map(|name| self.child_path(name))
            .collect())
    }

    fn subfolders(&self) -> Result<Vec<Box<dyn FolderHandle>>> {
        Ok(self
            .subfolder_paths()?
            .iter()
            .map(|p| Box::new(LocalFolder::new(p, self.tz)) as Box<dyn FolderHandle>)
            .collect())
    }

    fn size(&self) -> Result<u64> {
        let mut total: u64 = 0;
        // Follow links like the listings do, so linked files count.
        for entry in WalkDir::new(&self.path).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() > 0 && is_not_found(&e) => continue,
                Err(e) => return Err(walk_error(&self.path, e)),
            };
            if entry.file_type().is_file() {
                let meta = entry.metadata().map_err(|e| walk_error(&self.path, e))?;
                total = total.saturating_add(meta.len());
            }
        }
        Ok(total)
    }

    fn write_bytes(&self, contents: &[u8], name: &str, chunk_size: usize) -> Result<Box<dyn FileHandle>> {
        fs::create_dir_all(&self.path).with_path(&self.path)?;
        let target = self.child_path(name);
        let mut file = fs::File::create(&target).with_path(&target)?;
        for chunk in contents.chunks(chunk_size.max(1)) {
            file.write_all(chunk).with_path(&target)?;
        }
        file.flush().with_path(&target)?;
        debug!("Wrote {} bytes to {}", contents.len(), target);
        Ok(Box::new(LocalFile::new(&target, self.tz)))
    }

    fn add_subfolder(&self, name: &str) -> Result<Box<dyn FolderHandle>> {
        let target = self.child_path(name);
        fs::create_dir_all(&target).with_path(&target)?;
        Ok(Box::new(LocalFolder::new(&target, self.tz)))
    }

    fn clear_folder(&self) -> bool {
        let listing = self
            .files()
            .and_then(|files| Ok((files, self.subfolders()?, self.dangling_links()?)));
        let (files, subfolders, dangling) = match listing {
            Ok(children) => children,
            Err(e) => {
                if self.exists().is_absent() {
                    return true;
                }
                warn!("Failed to list {} for clearing: {}", self.path, e);
                return false;
            }
        };
        // Keep going after a failure so as much as possible is removed.
        let mut success = true;
        for file in files {
            success &= file.delete_self();
        }
        for subfolder in subfolders {
            success &= subfolder.delete_self();
        }
        for link in dangling {
            success &= LocalFile::new(&link, self.tz).delete_self();
        }
        success
    }

    fn delete_self(&self) -> bool {
        if link_existence(&self.path).is_absent() {
            return true;
        }
        // A link to a folder is removed as a link, never followed.
        if self.is_symlink() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Failed to remove link {}: {}", self.path, e);
                return false;
            }
            return link_existence(&self.path).is_absent();
        }
        if !self.clear_folder() {
            warn!("Folder {} only partially cleared", self.path);
            return false;
        }
        if let Err(e) = fs::remove_dir(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove folder {}: {}", self.path, e);
                return false;
            }
        }
        self.exists().is_absent()
    }
}

fn existence(path: &str) -> Existence {
    match fs::metadata(Path::new(path)) {
        Ok(_) => Existence::Exists,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Existence::Absent,
        Err(_) => Existence::Unknown,
    }
}

/// Existence of the path itself, without following a final link.
fn link_existence(path: &str) -> Existence {
    match fs::symlink_metadata(Path::new(path)) {
        Ok(_) => Existence::Exists,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Existence::Absent,
        Err(_) => Existence::Unknown,
    }
}

fn is_not_found(e: &walkdir::Error) -> bool {
    e.io_error().map(|io| io.kind()) == Some(io::ErrorKind::NotFound)
}

fn walk_error(root: &str, e: walkdir::Error) -> Error {
    let path = e
        .path()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string());
    Error::io(path, e.into())
}

fn offset_or_utc(tz: Option<FixedOffset>) -> FixedOffset {
    tz.unwrap_or_else(|| Utc.fix())
}

fn to_datetime(t: SystemTime, tz: FixedOffset) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from(t).with_timezone(&tz)
}

#[cfg(unix)]
fn change_time(meta: &fs::Metadata) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32)
}

#[cfg(not(unix))]
fn change_time(meta: &fs::Metadata) -> Option<DateTime<Utc>> {
    meta.modified().ok().map(DateTime::<Utc>::from)
}
