//! # Showroom Prelude
//!
//! Commonly used types in one import:
//!
//! ```rust
//! use showroom::prelude::*;
//! ```
//!
//! ```no_run
//! use showroom::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = ViewerConfig::default();
//!     config.material.bike_metalness = 0.8;
//!     showroom::run(config)
//! }
//! ```

// Application
pub use crate::app::{run, ViewerApp, ViewerEvent};
pub use crate::config::ViewerConfig;
pub use crate::render_loop::{CancellationToken, DrawTarget, RenderLoop, TickOutcome};

// Assets
pub use crate::assets::{AssetLoader, EnvironmentMap, LoadError, LoadedAssets, ProgressEvent};

// Scene and materials
pub use crate::gfx::camera::{CameraManager, OrbitCamera};
pub use crate::gfx::scene::Scene;
pub use crate::material::{apply_materials, Color, MaterialParams};

// Output
pub use crate::screenshot::{save_png, CapturedFrame, ScreenshotError};
pub use crate::viewport::Viewport;

pub use cgmath::{InnerSpace, Vector3, Zero};
