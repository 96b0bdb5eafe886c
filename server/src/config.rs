use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_USER_ID: &str = "baf609b4-cac8-4b48-b663-e149d00edc46";

const PORT_VAR: &str = "PORT";
const UPLOAD_DIR_VAR: &str = "UPLOAD_DIR";
const BASE_URL_VAR: &str = "BASE_URL";
const USER_ID_VAR: &str = "USER_ID";

/// First path segments taken by the API itself.
const RESERVED_SEGMENTS: &[&str] = &["upload", "delete", "images", "api-docs"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT value '{0}'")]
    InvalidPort(String),

    #[error("invalid UPLOAD_DIR value '{0}'")]
    InvalidUploadDir(String),
}

/// Gateway settings.
///
/// `upload_dir` is the configured name and is used verbatim as the route
/// prefix of served files, while `upload_root` is where those files live on disk.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upload_dir: String,
    pub upload_root: PathBuf,
    pub base_url: String,
    pub user_id: String,
}

impl Config {
    /// Reads settings from the environment, loading `.env` first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match var(PORT_VAR) {
            Some(p) => p.trim().parse().map_err(|_| ConfigError::InvalidPort(p))?,
            None => DEFAULT_PORT,
        };
        let upload_dir = var(UPLOAD_DIR_VAR).unwrap_or_else(|| String::from(DEFAULT_UPLOAD_DIR));
        let base_url =
            var(BASE_URL_VAR).unwrap_or_else(|| format!("http://localhost:{port}"));
        let user_id = var(USER_ID_VAR).unwrap_or_else(|| String::from(DEFAULT_USER_ID));

        let upload_root = PathBuf::from(&upload_dir);
        Self::new(port, upload_dir, upload_root, base_url, user_id)
    }

    pub fn new(
        port: u16,
        upload_dir: impl Into<String>,
        upload_root: impl Into<PathBuf>,
        base_url: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let upload_dir = upload_dir.into();
        let prefix = upload_dir.trim_matches('/');
        let first = prefix.split('/').next().unwrap_or_default();
        if prefix.is_empty() || RESERVED_SEGMENTS.contains(&first) {
            return Err(ConfigError::InvalidUploadDir(upload_dir));
        }
        let base_url = base_url.into().trim_end_matches('/').to_owned();

        Ok(Self {
            port,
            upload_dir,
            upload_root: upload_root.into(),
            base_url,
            user_id: user_id.into(),
        })
    }

    /// Route prefix under which stored files are served, without slashes around it.
    #[must_use]
    pub fn route_prefix(&self) -> &str {
        self.upload_dir.trim_matches('/')
    }

    /// Public URL of a stored file.
    #[must_use]
    pub fn file_url(&self, user: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            self.route_prefix(),
            urlencoding::encode(user),
            urlencoding::encode(file_name)
        )
    }

    /// Creates the upload root with all its parents.
    pub fn ensure_upload_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_root)
    }
}
