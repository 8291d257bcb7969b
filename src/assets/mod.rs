//! # Asset Loading
//!
//! Decodes the environment map and the model concurrently and reports
//! progress while doing so.

pub mod environment;
pub mod error;
pub mod loader;
pub mod model;
pub mod progress;

pub use environment::EnvironmentMap;
pub use error::{AssetError, LoadError};
pub use loader::{AssetLoader, LoadedAssets};
pub use model::load_model;
pub use progress::{LoadProgress, ProgressEvent};
