use std::path::PathBuf;

use thiserror::Error;

/// Failure while decoding a single asset
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to decode glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("model requires unsupported extension '{0}'")]
    UnsupportedExtension(String),

    #[error("model contains no triangle geometry")]
    EmptyModel,

    #[error("decode worker stopped before producing a result")]
    Cancelled,
}

/// Failure of the joined asset load, naming the asset that broke it
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("environment map '{}': {source}", path.display())]
    EnvironmentMap {
        path: PathBuf,
        #[source]
        source: AssetError,
    },

    #[error("model '{}': {source}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: AssetError,
    },
}

impl LoadError {
    /// The asset that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::EnvironmentMap { path, .. } | LoadError::Model { path, .. } => path,
        }
    }
}
