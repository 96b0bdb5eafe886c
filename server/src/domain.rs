use std::fmt::{Debug, Display};
use std::path::PathBuf;

/// A file kept in a user's directory. The directory itself is the index,
/// so nothing beyond what the file system reports is tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub user: String,
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

pub trait Storage {
    type Err: Debug + Display;

    /// Directory that holds all files of the user.
    fn user_dir(&self, user: &str) -> PathBuf;

    /// Stores data under a freshly generated `{token}_{name}` file name.
    fn store(&self, user: &str, original_name: &str, data: &[u8])
        -> Result<StoredFile, Self::Err>;

    /// Regular files of the user in directory order.
    fn list(&self, user: &str) -> Result<Vec<StoredFile>, Self::Err>;

    /// Removes a file that must live directly inside the user directory.
    fn delete(&self, user: &str, file_name: &str) -> Result<(), Self::Err>;
}

/// Last component of a client supplied path, either separator style.
#[must_use]
pub fn name_from_path(path: &str) -> &str {
    if let Some(ix) = path.rfind(&['\\', '/']) {
        &path[ix + 1..]
    } else {
        path
    }
}

/// Whether the name may be used as a single path component inside a user directory.
#[must_use]
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\', '\0'])
}
