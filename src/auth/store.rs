use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::Token;
use crate::error::{Result, TsheetsError};

/// Storage abstraction for a persisted OAuth token, keyed by profile.
pub trait TokenStore: Send + Sync {
    fn load(&self, profile: &str) -> Result<Option<Token>>;
    fn save(&self, profile: &str, token: &Token) -> Result<()>;
    fn clear(&self, profile: &str) -> Result<()>;
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_tsheets_dir()
    }
}

/// File-backed token store using TOML files, one per profile.
///
/// # Example
/// ```no_run
/// use tsheets::auth::{FileTokenStore, Token, TokenStore};
///
/// let store = FileTokenStore::new_default();
/// let token = Token::from_json(r#"{"access_token":"abc","expires_in":5184000}"#)?;
/// store.save("default", &token)?;
/// # Ok::<(), tsheets::error::TsheetsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_tsheets_dir(),
        }
    }

    fn token_path(&self, profile: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.toml", normalize_label(profile)))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(storage_error)?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, profile: &str) -> Result<Option<Token>> {
        let path = self.token_path(profile);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(storage_error(err)),
        };
        let file: TokenFile = toml::from_str(&raw).map_err(storage_error)?;
        Ok(Some(file.token))
    }

    fn save(&self, profile: &str, token: &Token) -> Result<()> {
        let path = self.token_path(profile);
        Self::ensure_parent(&path)?;
        let file = TokenFile {
            version: 1,
            profile: profile.to_string(),
            saved_at: Utc::now(),
            token: token.clone(),
        };
        let serialized = toml::to_string(&file).map_err(storage_error)?;
        fs::write(&path, serialized).map_err(storage_error)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(storage_error)?;
        }
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<()> {
        let path = self.token_path(profile);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_error(err)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    profile: String,
    saved_at: DateTime<Utc>,
    token: Token,
}

fn storage_error(err: impl std::fmt::Display) -> TsheetsError {
    TsheetsError::Storage(err.to_string())
}

fn default_tsheets_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".tsheets"))
        .unwrap_or_else(|| PathBuf::from(".tsheets"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
