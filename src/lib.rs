// src/lib.rs
//! Showroom
//!
//! A single-model 3D viewer built on wgpu and winit: an HDR environment, a
//! ground plane, an orbiting spotlight and live material controls.

pub mod app;
pub mod assets;
pub mod config;
pub mod gfx;
pub mod material;
pub mod prelude;
pub mod render_loop;
pub mod screenshot;
pub mod ui;
pub mod viewport;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::{run, ViewerApp, ViewerEvent};
pub use config::ViewerConfig;
