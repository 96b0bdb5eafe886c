use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::domain::{is_plain_file_name, name_from_path, Storage, StoredFile};
use crate::error::StorageError;
use crate::token::{self, TOKEN_LEN};

const MAX_NAME_ATTEMPTS: usize = 8;

/// Stores files as `{root}/{user}/{token}_{name}`.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn checked_user_dir(&self, user: &str) -> Result<PathBuf, StorageError> {
        if !is_plain_file_name(user) {
            return Err(StorageError::InvalidFileName(user.to_owned()));
        }
        Ok(self.user_dir(user))
    }
}

impl Storage for DiskStorage {
    type Err = StorageError;

    fn user_dir(&self, user: &str) -> PathBuf {
        self.root.join(user)
    }

    fn store(
        &self,
        user: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, Self::Err> {
        let name = name_from_path(original_name);
        if !is_plain_file_name(name) {
            return Err(StorageError::InvalidFileName(original_name.to_owned()));
        }

        let dir = self.checked_user_dir(user)?;
        fs::create_dir_all(&dir)?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = format!("{}_{name}", token::generate(TOKEN_LEN));
            let path = dir.join(&file_name);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::warn!("token collision on {file_name}, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = file.write_all(data).and_then(|()| file.flush()) {
                drop(file);
                fs::remove_file(&path).unwrap_or_default();
                return Err(e.into());
            }

            return Ok(StoredFile {
                user: user.to_owned(),
                name: file_name,
                path,
                size: data.len() as u64,
            });
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no unique file name could be generated",
        )
        .into())
    }

    fn list(&self, user: &str) -> Result<Vec<StoredFile>, Self::Err> {
        let dir = self.checked_user_dir(user)?;
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::warn!("skipping non UTF-8 file name {:?}", entry.file_name());
                continue;
            };
            files.push(StoredFile {
                user: user.to_owned(),
                name,
                path: entry.path(),
                size: metadata.len(),
            });
        }
        Ok(files)
    }

    fn delete(&self, user: &str, file_name: &str) -> Result<(), Self::Err> {
        if !is_plain_file_name(file_name) {
            return Err(StorageError::InvalidFileName(file_name.to_owned()));
        }
        let dir = self.checked_user_dir(user)?;

        let path = dir.join(file_name);
        // links are never followed, whatever they point to
        if fs::symlink_metadata(&path)?.file_type().is_symlink() {
            return Err(StorageError::NotAFile(file_name.to_owned()));
        }

        let canonical_dir = fs::canonicalize(&dir)?;
        let canonical_file = fs::canonicalize(&path)?;
        if canonical_file.parent() != Some(canonical_dir.as_path()) {
            return Err(StorageError::OutsideUserDir(file_name.to_owned()));
        }
        if !fs::symlink_metadata(&canonical_file)?.is_file() {
            return Err(StorageError::NotAFile(file_name.to_owned()));
        }

        fs::remove_file(canonical_file)?;
        Ok(())
    }
}
