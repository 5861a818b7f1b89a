use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::AppPaths;
use crate::errors::{GoNextError, Result};
use crate::hash::photo_stem;

/// A photo copied in by [`PhotoStore::stage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPhoto {
    pub path: String,
    /// False when identical content was already stored.
    pub created: bool,
}

/// App-owned directory holding copies of every photo attached to a place
/// or trip stop. Stored paths are handed to the data layer as plain strings.
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn from_paths(paths: &AppPaths) -> Self {
        Self::new(paths.photos_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_directories_exist(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Copies `source` into the photo directory and returns the stored path.
    /// Files are named by content, so importing the same picture twice
    /// yields the same path.
    pub fn copy_file_into_app_storage(&self, source: &Path) -> Result<String> {
        Ok(self.stage(source)?.path)
    }

    /// Like [`copy_file_into_app_storage`](Self::copy_file_into_app_storage),
    /// but remembers whether the file is new so a failed save can
    /// [`discard`](Self::discard) it.
    pub fn stage(&self, source: &Path) -> Result<StagedPhoto> {
        if !source.is_file() {
            return Err(GoNextError::InvalidInput(format!(
                "photo {} is not a readable file",
                source.display()
            )));
        }
        self.ensure_directories_exist()?;
        let data = fs::read(source)?;
        let mut name = photo_stem(&data);
        if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(&ext.to_ascii_lowercase());
        }
        let target = self.dir.join(name);
        let created = !target.exists();
        if created {
            fs::write(&target, &data)?;
        }
        debug!(source = %source.display(), target = %target.display(), created, "stored photo");
        Ok(StagedPhoto {
            path: target.to_string_lossy().into_owned(),
            created,
        })
    }

    /// Stages every source, or none: a failure removes what was already
    /// staged.
    pub fn stage_all(&self, sources: &[PathBuf]) -> Result<Vec<StagedPhoto>> {
        let mut staged = Vec::with_capacity(sources.len());
        for source in sources {
            match self.stage(source) {
                Ok(photo) => staged.push(photo),
                Err(e) => {
                    self.discard(&staged);
                    return Err(e);
                }
            }
        }
        Ok(staged)
    }

    /// Deletes the files `staged` created. Content that was stored before
    /// staging stays.
    pub fn discard(&self, staged: &[StagedPhoto]) {
        for photo in staged.iter().filter(|p| p.created) {
            if let Err(e) = fs::remove_file(&photo.path) {
                warn!(path = %photo.path, error = %e, "could not discard photo");
            }
        }
    }

    /// Number of files currently stored.
    pub fn count(&self) -> Result<usize> {
        match fs::read_dir(&self.dir) {
            Ok(entries) => {
                let mut n = 0;
                for entry in entries {
                    if entry?.file_type()?.is_file() {
                        n += 1;
                    }
                }
                Ok(n)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes every stored photo and recreates the empty directory.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.ensure_directories_exist()
    }
}
