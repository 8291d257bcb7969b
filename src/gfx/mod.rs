//! # Graphics Module
//!
//! Camera, scene, GPU resources and the render engine.
//!
//! - **Camera System** ([`camera`]) - Orbit camera with damping and auto-rotate
//! - **Geometry** ([`geometry`]) - Procedural ground plane and helper lines
//! - **Rendering Pipeline** ([`rendering`]) - PBR shading with a shadowed spotlight
//! - **Scene Management** ([`scene`]) - Ground, light and the loaded model
//! - **Resource Management** ([`resources`]) - Materials, textures and bind groups
//!
//! ```no_run
//! use showroom::config::ViewerConfig;
//! use showroom::gfx::scene::Scene;
//! use showroom::viewport::Viewport;
//!
//! let scene = Scene::new(&ViewerConfig::default(), Viewport::new(1280, 720));
//! assert!(scene.model().is_none());
//! ```

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
