// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Handles render pipelines, GPU resource management, frame rendering and
//! framebuffer readback.

pub mod pipeline_manager;
pub mod readback;
pub mod render_engine;

// Re-export main types
pub use pipeline_manager::{PipelineConfig, PipelineManager, PipelineStats};
pub use render_engine::{RenderEngine, RenderError, RenderOptions};
