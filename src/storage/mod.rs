pub mod disk;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("asset id must be non-empty and contain only ASCII letters, digits, '-' or '_'")]
    InvalidId,
    #[error("asset data URI has no base64 payload")]
    MalformedDataUri,
    #[error("asset base64 decode failed: {0}")]
    InvalidBase64(#[source] base64::DecodeError),
    #[error("asset not found")]
    NotFound,
    #[error("asset store filesystem error: {0}")]
    Io(#[source] io::Error),
}

// Flat id -> PNG file mapping under a single root. Concurrent saves to the
// same id are last-writer-wins; there is no per-id lock.
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn initialize(&self) -> Result<(), AssetStoreError> {
        fs::create_dir_all(self.root.as_path()).map_err(AssetStoreError::Io)
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    // Accepts raw base64 or a data:<mime>;base64,<payload> URI; overwrites
    // any existing file for the id.
    pub fn save(&self, id: &str, data: &str) -> Result<PathBuf, AssetStoreError> {
        validate_asset_id(id)?;
        let payload = if data.starts_with("data:") {
            data.split_once(',')
                .map(|(_, rest)| rest)
                .ok_or(AssetStoreError::MalformedDataUri)?
        } else {
            data
        };
        let bytes = BASE64_STANDARD
            .decode(payload.trim())
            .map_err(AssetStoreError::InvalidBase64)?;
        let path = self.path_for(id);
        fs::write(path.as_path(), bytes).map_err(AssetStoreError::Io)?;
        Ok(path)
    }

    pub fn get(&self, id: &str) -> Result<Vec<u8>, AssetStoreError> {
        validate_asset_id(id)?;
        match fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Err(AssetStoreError::NotFound),
            Err(error) => Err(AssetStoreError::Io(error)),
        }
    }

    // Absence is not an error; a repeated delete reports success.
    pub fn delete(&self, id: &str) -> Result<(), AssetStoreError> {
        validate_asset_id(id)?;
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AssetStoreError::Io(error)),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.png"))
    }
}

// Keeps a client-supplied id from escaping the asset root.
fn validate_asset_id(id: &str) -> Result<(), AssetStoreError> {
    if id.is_empty()
        || !id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(AssetStoreError::InvalidId);
    }
    Ok(())
}
